//! Grid specification shared by co-registered rasters

use super::GeoTransform;
use crate::crs::CRS;
use crate::error::{Error, Result};

/// Shape and georeferencing of a raster grid, without its data.
///
/// Every raster produced by the depth pipeline carries the DEM's grid spec.
#[derive(Debug, Clone, PartialEq)]
pub struct GridSpec {
    pub rows: usize,
    pub cols: usize,
    pub transform: GeoTransform,
    pub crs: Option<CRS>,
}

impl GridSpec {
    pub fn new(rows: usize, cols: usize, transform: GeoTransform, crs: Option<CRS>) -> Self {
        Self {
            rows,
            cols,
            transform,
            crs,
        }
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Geographic bounds (min_x, min_y, max_x, max_y)
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.transform.bounds(self.cols, self.rows)
    }

    /// Fail with an alignment error unless `other` describes the same grid.
    ///
    /// A CRS missing on either side is not treated as a mismatch.
    pub fn ensure_aligned(&self, other: &GridSpec) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(Error::SizeMismatch {
                er: self.rows,
                ec: self.cols,
                ar: other.rows,
                ac: other.cols,
            });
        }
        if !self.transform.approx_eq(&other.transform) {
            return Err(Error::Misaligned(format!(
                "transform {:?} differs from {:?}",
                other.transform, self.transform
            )));
        }
        if let (Some(a), Some(b)) = (&self.crs, &other.crs)
            && !a.is_equivalent(b)
        {
            return Err(Error::Misaligned(format!("CRS {} differs from {}", b, a)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn spec() -> GridSpec {
        GridSpec::new(10, 20, GeoTransform::new(0.0, 10.0, 1.0, -1.0), Some(CRS::from_epsg(32617)))
    }

    #[test]
    fn test_aligned() {
        assert!(spec().ensure_aligned(&spec()).is_ok());

        let mut no_crs = spec();
        no_crs.crs = None;
        assert!(spec().ensure_aligned(&no_crs).is_ok());
    }

    #[test]
    fn test_misaligned() {
        let mut shifted = spec();
        shifted.transform.origin_x = 0.5;
        let err = spec().ensure_aligned(&shifted).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Alignment);

        let mut resized = spec();
        resized.cols = 21;
        assert_eq!(spec().ensure_aligned(&resized).unwrap_err().kind(), ErrorKind::Alignment);

        let mut other_crs = spec();
        other_crs.crs = Some(CRS::wgs84());
        assert_eq!(spec().ensure_aligned(&other_crs).unwrap_err().kind(), ErrorKind::Alignment);
    }
}
