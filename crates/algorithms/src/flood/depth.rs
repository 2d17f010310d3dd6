//! Depth compositing: grown water surface minus terrain, inside the flood
//! footprint only.

use fwdet_core::raster::Raster;
use fwdet_core::Result;
use ndarray::Zip;

/// `max(0, grown − dem)` where the footprint is set, `NaN` elsewhere and
/// wherever either surface is undefined.
///
/// All three rasters must share one grid.
pub fn composite_depth(
    grown: &Raster<f64>,
    dem: &Raster<f64>,
    footprint: &Raster<u8>,
) -> Result<Raster<f64>> {
    dem.ensure_aligned(grown)?;
    dem.ensure_aligned(footprint)?;

    let (rows, cols) = dem.shape();
    let mut output = dem.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() = Zip::from(grown.data())
        .and(dem.data())
        .and(footprint.data())
        .map_collect(|&water, &ground, &inside| {
            if inside == 0 {
                f64::NAN
            } else {
                // NaN in either input propagates through the subtraction
                let d = water - ground;
                if d < 0.0 { 0.0 } else { d }
            }
        });

    Ok(output)
}
