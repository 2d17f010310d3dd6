//! Native GeoTIFF reading/writing
//!
//! Uses the `tiff` crate for basic TIFF I/O. Only the georeferencing needed
//! by the depth pipeline is handled: pixel scale, tiepoint, the GDAL
//! nodata tag and the EPSG code of the CRS (`GeographicTypeGeoKey` or
//! `ProjectedCSTypeGeoKey`). Other GeoKeys are ignored.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

const MODEL_PIXEL_SCALE: Tag = Tag::ModelPixelScaleTag;
const MODEL_TIEPOINT: Tag = Tag::ModelTiepointTag;
const GEO_KEY_DIRECTORY: Tag = Tag::GeoKeyDirectoryTag;
const GDAL_NODATA: Tag = Tag::GdalNodata;

const GT_MODEL_TYPE_KEY: u16 = 1024;
const GT_RASTER_TYPE_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;

const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;

/// Options for writing GeoTIFF files
#[derive(Debug, Clone, Default)]
pub struct GeoTiffOptions {
    /// Value written in place of `NaN` cells and declared as nodata.
    /// `None` keeps `NaN` and declares `nan`.
    pub nodata: Option<f64>,
}

/// Read a GeoTIFF file into a Raster
pub fn read_geotiff<T, P>(path: P) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    decode_geotiff(BufReader::new(file))
}

fn cast_all<S: Copy + num_traits::NumCast, T: RasterElement>(buf: &[S]) -> Vec<T> {
    buf.iter()
        .map(|&v| num_traits::cast(v).unwrap_or(T::default_nodata()))
        .collect()
}

fn decode_geotiff<T, R>(reader: R) -> Result<Raster<T>>
where
    T: RasterElement,
    R: std::io::Read + std::io::Seek,
{
    let mut decoder =
        Decoder::new(reader).map_err(|e| Error::Other(format!("TIFF decode error: {}", e)))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| Error::Other(format!("Cannot read dimensions: {}", e)))?;

    let rows = height as usize;
    let cols = width as usize;

    let result = decoder
        .read_image()
        .map_err(|e| Error::Other(format!("Cannot read image data: {}", e)))?;

    let data: Vec<T> = match result {
        DecodingResult::F32(buf) => cast_all(&buf),
        DecodingResult::F64(buf) => cast_all(&buf),
        DecodingResult::U8(buf) => cast_all(&buf),
        DecodingResult::U16(buf) => cast_all(&buf),
        DecodingResult::U32(buf) => cast_all(&buf),
        DecodingResult::I8(buf) => cast_all(&buf),
        DecodingResult::I16(buf) => cast_all(&buf),
        DecodingResult::I32(buf) => cast_all(&buf),
        _ => {
            return Err(Error::UnsupportedDataType(
                "Unsupported TIFF pixel format".to_string(),
            ));
        }
    };

    let mut raster = Raster::from_vec(data, rows, cols)?;

    if let Ok(transform) = read_geotransform(&mut decoder) {
        raster.set_transform(transform);
    }

    if let Ok(directory) = decoder.get_tag_u16_vec(GEO_KEY_DIRECTORY) {
        raster.set_crs(crs_from_geokeys(&directory));
    }

    if let Ok(text) = decoder.get_tag_ascii_string(GDAL_NODATA) {
        let text = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
        if let Ok(value) = text.parse::<f64>() {
            raster.set_nodata(num_traits::cast(value));
        }
    }

    Ok(raster)
}

/// Read GeoTransform from ModelPixelScaleTag + ModelTiepointTag
fn read_geotransform<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
) -> Result<GeoTransform> {
    let scale = decoder
        .get_tag_f64_vec(MODEL_PIXEL_SCALE)
        .map_err(|_| Error::Other("No pixel scale tag".into()))?;

    let tiepoint = decoder
        .get_tag_f64_vec(MODEL_TIEPOINT)
        .map_err(|_| Error::Other("No tiepoint tag".into()))?;

    if scale.len() >= 2 && tiepoint.len() >= 6 {
        // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
        let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
        let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
        return Ok(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]));
    }

    Err(Error::Other("Cannot determine geotransform".into()))
}

/// EPSG code held directly in the GeoKey directory, if any
fn crs_from_geokeys(directory: &[u16]) -> Option<CRS> {
    // Header: version, revision, minor revision, key count
    let count = *directory.get(3)? as usize;
    directory
        .get(4..)?
        .chunks_exact(4)
        .take(count)
        .find(|key| {
            matches!(key[0], GEOGRAPHIC_TYPE_KEY | PROJECTED_CS_TYPE_KEY)
                && key[1] == 0
                && !matches!(key[3], 0 | 32767)
        })
        .map(|key| CRS::from_epsg(key[3] as u32))
}

/// GeoKey directory for `crs`; codes that do not fit a SHORT are left out
fn geokeys_for(crs: Option<&CRS>) -> Vec<u16> {
    let mut keys = vec![[GT_RASTER_TYPE_KEY, 0, 1, RASTER_PIXEL_IS_AREA]];

    if let Some(crs) = crs
        && let Some(code) = crs.epsg().and_then(|c| u16::try_from(c).ok())
    {
        let (model, key) = if crs.is_geographic() {
            (MODEL_TYPE_GEOGRAPHIC, GEOGRAPHIC_TYPE_KEY)
        } else {
            (MODEL_TYPE_PROJECTED, PROJECTED_CS_TYPE_KEY)
        };
        keys.insert(0, [GT_MODEL_TYPE_KEY, 0, 1, model]);
        keys.push([key, 0, 1, code]);
    }

    let mut directory = vec![1, 1, 0, keys.len() as u16];
    directory.extend(keys.into_iter().flatten());
    directory
}

/// Write a Raster to a GeoTIFF file as 32-bit float
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P, options: Option<GeoTiffOptions>) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let options = options.unwrap_or_default();
    let file = File::create(path.as_ref())?;
    let mut encoder = TiffEncoder::new(BufWriter::new(file))
        .map_err(|e| Error::Other(format!("TIFF encoder error: {}", e)))?;

    let (rows, cols) = raster.shape();
    let fill = options.nodata.map_or(f32::NAN, |v| v as f32);

    let data: Vec<f32> = raster
        .data()
        .iter()
        .map(|&v| {
            if raster.is_nodata(v) {
                fill
            } else {
                num_traits::cast(v).unwrap_or(fill)
            }
        })
        .collect();

    let mut image = encoder
        .new_image::<Gray32Float>(cols as u32, rows as u32)
        .map_err(|e| Error::Other(format!("Cannot create TIFF image: {}", e)))?;

    let gt = raster.transform();

    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    image
        .encoder()
        .write_tag(MODEL_PIXEL_SCALE, &scale[..])
        .map_err(|e| Error::Other(format!("Cannot write scale tag: {}", e)))?;

    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    image
        .encoder()
        .write_tag(MODEL_TIEPOINT, &tiepoint[..])
        .map_err(|e| Error::Other(format!("Cannot write tiepoint tag: {}", e)))?;

    let geokeys = geokeys_for(raster.crs());
    image
        .encoder()
        .write_tag(GEO_KEY_DIRECTORY, &geokeys[..])
        .map_err(|e| Error::Other(format!("Cannot write geokey tag: {}", e)))?;

    let nodata_text = options.nodata.map_or_else(|| "nan".to_string(), |v| v.to_string());
    image
        .encoder()
        .write_tag(GDAL_NODATA, nodata_text.as_str())
        .map_err(|e| Error::Other(format!("Cannot write nodata tag: {}", e)))?;

    image
        .write_data(&data)
        .map_err(|e| Error::Other(format!("Cannot write image data: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geotiff_roundtrip_keeps_transform_and_nodata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("depth.tif");

        let mut raster = Raster::filled(4, 5, 1.5);
        raster.set_transform(GeoTransform::new(500_000.0, 4_100_000.0, 30.0, -30.0));
        raster.set(2, 3, f64::NAN).unwrap();
        raster.set_nodata(Some(f64::NAN));

        write_geotiff(&raster, &path, Some(GeoTiffOptions { nodata: Some(-9999.0) })).unwrap();
        let back: Raster<f64> = read_geotiff(&path).unwrap();

        assert_eq!(back.shape(), (4, 5));
        assert!(back.transform().approx_eq(raster.transform()));
        assert_eq!(back.nodata(), Some(-9999.0));
        assert_eq!(back.get(2, 3).unwrap(), -9999.0);
        assert_eq!(back.get(0, 0).unwrap(), 1.5);
        assert_eq!(back.nodata_as_nan().valid_count(), 19);
        assert!(back.crs().is_none());
    }

    #[test]
    fn test_geotiff_roundtrip_keeps_epsg() {
        let dir = tempfile::tempdir().unwrap();

        for code in [4326, 32617] {
            let path = dir.path().join(format!("dem_{code}.tif"));
            let mut raster = Raster::filled(3, 3, 2.0);
            raster.set_transform(GeoTransform::new(-80.0, 35.0, 0.001, -0.001));
            raster.set_crs(Some(CRS::from_epsg(code)));

            write_geotiff(&raster, &path, None).unwrap();
            let back: Raster<f64> = read_geotiff(&path).unwrap();

            let crs = back.crs().expect("CRS decoded from GeoKeys");
            assert_eq!(crs.epsg(), Some(code));
            assert_eq!(crs.is_geographic(), code == 4326);
        }
    }

    #[test]
    fn test_geokey_directory_layout() {
        assert_eq!(
            geokeys_for(Some(&CRS::from_epsg(4326))),
            vec![1, 1, 0, 3, 1024, 0, 1, 2, 1025, 0, 1, 1, 2048, 0, 1, 4326]
        );
        assert_eq!(geokeys_for(None), vec![1, 1, 0, 1, 1025, 0, 1, 1]);
        assert!(crs_from_geokeys(&[1, 1, 0, 1, 1025, 0, 1, 1]).is_none());
        assert!(crs_from_geokeys(&[1, 1]).is_none());
    }
}
