//! Slope calculation from DEMs
//!
//! Calculates the rate of change of elevation using the Horn (1981) method,
//! which uses a 3x3 neighborhood to compute partial derivatives.
//! Geographic DEMs use ground cell sizes that vary with latitude.

use crate::maybe_rayon::*;
use crate::terrain::spheroidal::{cell_dimensions, SpheroidalParams};
use fwdet_core::raster::Raster;
use fwdet_core::{Algorithm, Error, Result};

/// Units for slope output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlopeUnits {
    /// Degrees (0-90)
    Degrees,
    /// Percent rise (100 × rise / run)
    #[default]
    Percent,
    /// Radians (0-π/2)
    Radians,
}

/// Parameters for slope calculation
#[derive(Debug, Clone)]
pub struct SlopeParams {
    /// Output units
    pub units: SlopeUnits,
    /// Elevation multiplier, e.g. for vertical units differing from the
    /// horizontal ones (default 1.0)
    pub z_factor: f64,
    /// Treat the grid as lon/lat degrees and derive cell sizes in meters.
    /// `None` decides from the DEM's CRS.
    pub geographic: Option<bool>,
}

impl Default for SlopeParams {
    fn default() -> Self {
        Self {
            units: SlopeUnits::Percent,
            z_factor: 1.0,
            geographic: None,
        }
    }
}

/// Slope algorithm
#[derive(Debug, Clone, Default)]
pub struct Slope;

impl Algorithm for Slope {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = SlopeParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Slope"
    }

    fn description(&self) -> &'static str {
        "Calculate slope (rate of change of elevation) from a DEM using Horn's method"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        slope(&input, params)
    }
}

/// Calculate slope from a DEM
///
/// Uses Horn's (1981) method with a 3x3 neighborhood:
/// ```text
/// a b c
/// d e f
/// g h i
/// ```
///
/// dz/dx = ((c + 2f + i) - (a + 2d + g)) / (8 * dx)
/// dz/dy = ((g + 2h + i) - (a + 2b + c)) / (8 * dy)
/// slope = atan(sqrt(dz/dx² + dz/dy²))
///
/// Edge cells and cells with a nodata neighbour are `NaN`.
///
/// # Arguments
/// * `dem` - Input DEM raster, nodata as `NaN`
/// * `params` - Slope calculation parameters
///
/// # Returns
/// Raster with slope values in the specified units
pub fn slope(dem: &Raster<f64>, params: SlopeParams) -> Result<Raster<f64>> {
    if !(params.z_factor > 0.0 && params.z_factor.is_finite()) {
        return Err(Error::invalid_parameter(
            "z_factor",
            params.z_factor,
            "must be a positive finite number",
        ));
    }

    let (rows, cols) = dem.shape();
    let tf = *dem.transform();
    let geographic = params
        .geographic
        .unwrap_or_else(|| dem.crs().is_some_and(|crs| crs.is_geographic()));
    let (d_lon, d_lat) = tf.cell_extents();
    let spheroid = SpheroidalParams::default();

    // Process rows in parallel
    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];

            // Skip edges (need full 3x3 neighborhood)
            if row == 0 || row + 1 >= rows || cols < 3 {
                return row_data;
            }

            let (dx, dy) = if geographic {
                let (_, lat) = tf.pixel_to_geo(0, row);
                let dims = cell_dimensions(lat, d_lon, d_lat, &spheroid);
                (dims.dx, dims.dy)
            } else {
                (d_lon, d_lat)
            };
            let eight_dx = 8.0 * dx;
            let eight_dy = 8.0 * dy;

            for col in 1..cols - 1 {
                let e = unsafe { dem.get_unchecked(row, col) };
                if e.is_nan() {
                    continue;
                }

                // Get 3x3 neighborhood
                let a = unsafe { dem.get_unchecked(row - 1, col - 1) };
                let b = unsafe { dem.get_unchecked(row - 1, col) };
                let c = unsafe { dem.get_unchecked(row - 1, col + 1) };
                let d = unsafe { dem.get_unchecked(row, col - 1) };
                let f = unsafe { dem.get_unchecked(row, col + 1) };
                let g = unsafe { dem.get_unchecked(row + 1, col - 1) };
                let h = unsafe { dem.get_unchecked(row + 1, col) };
                let i = unsafe { dem.get_unchecked(row + 1, col + 1) };

                // Check for nodata in neighborhood
                if [a, b, c, d, f, g, h, i].iter().any(|v| v.is_nan()) {
                    continue;
                }

                // Horn's method
                let dz_dx = ((c + 2.0 * f + i) - (a + 2.0 * d + g)) / eight_dx;
                let dz_dy = ((g + 2.0 * h + i) - (a + 2.0 * b + c)) / eight_dy;
                let rise = params.z_factor * (dz_dx * dz_dx + dz_dy * dz_dy).sqrt();

                row_data[col] = match params.units {
                    SlopeUnits::Degrees => rise.atan().to_degrees(),
                    SlopeUnits::Percent => rise * 100.0,
                    SlopeUnits::Radians => rise.atan(),
                };
            }

            row_data
        })
        .collect();

    dem.with_data(output_data, Some(f64::NAN))
}
