//! Boundary elevation extraction
//!
//! Turns the rasterized flood outline into a set of trusted shoreline
//! elevations: sample the DEM under the outline, smooth the samples along
//! the shoreline, then drop cells next to open water (ocean artifact) and
//! cells on steep terrain. Each step can only remove cells.

use crate::statistics::{focal_statistics_within, FocalParams, FocalStatistic};
use crate::terrain::{slope, SlopeParams, SlopeUnits};
use fwdet_core::raster::{Neighborhood, Raster};
use fwdet_core::{Error, Result};
use ndarray::{Array2, Zip};
use tracing::debug;

/// Parameters for boundary extraction
#[derive(Debug, Clone)]
pub struct BoundaryParams {
    /// Number of smoothing passes (0 disables smoothing)
    pub num_iterations: usize,
    /// Side of the square smoothing window in cells (odd, ≥ 3)
    pub smoothing_window: usize,
    /// Drop boundary cells whose neighbourhood touches elevation ≤ 0
    pub ocean_filter: bool,
    /// Radius in cells of the circular ocean-filter window
    pub ocean_filter_radius: usize,
    /// Drop boundary cells steeper than this percent slope (0 disables)
    pub slope_threshold: f64,
    /// Round surviving elevations to this many decimal places
    pub precision: Option<u32>,
}

impl Default for BoundaryParams {
    fn default() -> Self {
        Self {
            num_iterations: 10,
            smoothing_window: 5,
            ocean_filter: true,
            ocean_filter_radius: 2,
            slope_threshold: 0.0,
            precision: Some(4),
        }
    }
}

impl BoundaryParams {
    /// Reject illegal values before any raster work
    pub fn validate(&self) -> Result<()> {
        if self.smoothing_window < 3 || self.smoothing_window % 2 == 0 {
            return Err(Error::invalid_parameter(
                "smoothing_window",
                self.smoothing_window,
                "must be an odd number of cells, at least 3",
            ));
        }
        if !(self.slope_threshold >= 0.0 && self.slope_threshold.is_finite()) {
            return Err(Error::invalid_parameter(
                "slope_threshold",
                self.slope_threshold,
                "must be a finite percent slope ≥ 0",
            ));
        }
        if let Some(p) = self.precision
            && p > 15
        {
            return Err(Error::invalid_parameter(
                "boundary_precision",
                p,
                "at most 15 decimal places",
            ));
        }
        Ok(())
    }
}

/// Number of defined boundary cells after each step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoundaryCounts {
    /// Cells on the line raster
    pub line: usize,
    /// Line cells with a defined DEM value
    pub sampled: usize,
    /// After smoothing
    pub smoothed: usize,
    /// After ocean-artifact removal
    pub after_ocean: usize,
    /// After slope filtering
    pub after_slope: usize,
}

/// Intermediate and final boundary rasters
#[derive(Debug, Clone)]
pub struct BoundaryExtraction {
    /// DEM sampled under the line raster
    pub sampled: Raster<f64>,
    /// Sampled values after smoothing
    pub smoothed: Raster<f64>,
    /// Surviving boundary elevations; `NaN` elsewhere
    pub boundary: Raster<f64>,
    pub counts: BoundaryCounts,
}

/// Extract boundary elevations from a DEM and a line raster.
///
/// # Arguments
/// * `dem` - Elevation raster, nodata as `NaN`
/// * `line` - Line raster from [`crate::vector::rasterize_boundary`]
///   (0 = not on the outline), aligned with `dem`
/// * `params` - Extraction parameters
///
/// An empty result is not an error; the caller decides how to report it.
pub fn extract_boundary(
    dem: &Raster<f64>,
    line: &Raster<u32>,
    params: &BoundaryParams,
) -> Result<BoundaryExtraction> {
    params.validate()?;
    dem.ensure_aligned(line)?;

    // Sample
    let on_line = line.data().mapv(|l| l != 0);
    let sampled = dem.masked(&on_line)?;
    let mut counts = BoundaryCounts {
        line: count(&on_line),
        sampled: sampled.valid_count(),
        ..BoundaryCounts::default()
    };

    // Smooth, re-masked to the sampled cells on every pass
    let sampled_mask = sampled.valid_mask();
    let mut smoothed = sampled.clone();
    for _ in 0..params.num_iterations {
        smoothed = focal_statistics_within(
            &smoothed,
            FocalParams {
                window: Neighborhood::square_of_size(params.smoothing_window),
                statistic: FocalStatistic::Mean,
            },
            &sampled_mask,
        )?;
    }
    counts.smoothed = smoothed.valid_count();

    // Ocean artifact: local minimum of the raw DEM at or below sea level
    let mut keep = smoothed.valid_mask();
    if params.ocean_filter {
        let local_min = focal_statistics_within(
            dem,
            FocalParams {
                window: Neighborhood::Circle(params.ocean_filter_radius),
                statistic: FocalStatistic::Min,
            },
            &keep,
        )?;
        Zip::from(&mut keep)
            .and(local_min.data())
            .for_each(|k, &m| *k = *k && m > 0.0);
    }
    counts.after_ocean = count(&keep);

    // Steep terrain; undefined slope keeps the cell
    if params.slope_threshold > 0.0 {
        let slope_pct = slope(
            dem,
            SlopeParams {
                units: SlopeUnits::Percent,
                ..SlopeParams::default()
            },
        )?;
        let threshold = params.slope_threshold;
        Zip::from(&mut keep)
            .and(slope_pct.data())
            .for_each(|k, &s| *k = *k && !(s > threshold));
    }
    counts.after_slope = count(&keep);

    let mut boundary = smoothed.masked(&keep)?;
    if let Some(decimals) = params.precision {
        let scale = 10f64.powi(decimals as i32);
        boundary
            .data_mut()
            .mapv_inplace(|v| (v * scale).round() / scale);
    }

    debug!(
        line = counts.line,
        sampled = counts.sampled,
        smoothed = counts.smoothed,
        after_ocean = counts.after_ocean,
        after_slope = counts.after_slope,
        "boundary cells per step"
    );

    Ok(BoundaryExtraction {
        sampled,
        smoothed,
        boundary,
        counts,
    })
}

fn count(mask: &Array2<bool>) -> usize {
    mask.iter().filter(|&&k| k).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use fwdet_core::GeoTransform;

    fn grid<T: fwdet_core::RasterElement>(rows: usize, cols: usize, v: T) -> Raster<T> {
        let mut r = Raster::filled(rows, cols, v);
        r.set_transform(GeoTransform::new(0.0, rows as f64, 1.0, -1.0));
        r
    }

    /// Line raster marking column `col`
    fn column_line(rows: usize, cols: usize, col: usize) -> Raster<u32> {
        let mut line = grid(rows, cols, 0u32);
        line.set_nodata(Some(0));
        for row in 0..rows {
            line.set(row, col, 1).unwrap();
        }
        line
    }

    #[test]
    fn test_sampling_picks_line_cells() {
        let mut dem = grid(5, 5, 3.0);
        dem.set(2, 2, f64::NAN).unwrap();
        let line = column_line(5, 5, 2);
        let params = BoundaryParams { num_iterations: 0, ..BoundaryParams::default() };

        let out = extract_boundary(&dem, &line, &params).unwrap();
        assert_eq!(out.counts.line, 5);
        assert_eq!(out.counts.sampled, 4);
        assert!(out.sampled.get(2, 2).unwrap().is_nan());
        assert!(out.sampled.get(0, 0).unwrap().is_nan());
        assert_eq!(out.sampled.get(0, 2).unwrap(), 3.0);
    }

    #[test]
    fn test_zero_iterations_is_identity() {
        let mut dem = grid(6, 6, 0.0);
        for row in 0..6 {
            for col in 0..6 {
                dem.set(row, col, 10.0 + (row * 7 + col) as f64).unwrap();
            }
        }
        let line = column_line(6, 6, 3);
        let params = BoundaryParams { num_iterations: 0, ..BoundaryParams::default() };

        let out = extract_boundary(&dem, &line, &params).unwrap();
        for row in 0..6 {
            assert_eq!(out.smoothed.get(row, 3).unwrap(), out.sampled.get(row, 3).unwrap());
        }
    }

    #[test]
    fn test_smoothing_stays_on_sampled_cells() {
        let mut dem = grid(7, 7, 0.0);
        for row in 0..7 {
            for col in 0..7 {
                dem.set(row, col, 1.0 + row as f64).unwrap();
            }
        }
        let line = column_line(7, 7, 3);
        let params = BoundaryParams { ocean_filter: false, ..BoundaryParams::default() };

        let out = extract_boundary(&dem, &line, &params).unwrap();
        assert_eq!(out.counts.smoothed, 7);
        assert!(out.smoothed.get(3, 2).unwrap().is_nan());
        // Symmetric window around the centre of a linear profile keeps its value
        assert_relative_eq!(out.smoothed.get(3, 3).unwrap(), 4.0, epsilon = 1e-9);
        // The top cell is pulled towards its neighbours
        assert!(out.smoothed.get(0, 3).unwrap() > 1.0);
    }

    #[test]
    fn test_ocean_filter_removes_low_neighbourhoods() {
        let mut dem = grid(7, 7, 5.0);
        for row in 0..7 {
            dem.set(row, 0, -1.0).unwrap();
        }
        let line = column_line(7, 7, 2);
        let out = extract_boundary(&dem, &line, &BoundaryParams::default()).unwrap();
        // Column 0 lies within radius 2 of column 2
        assert_eq!(out.counts.smoothed, 7);
        assert_eq!(out.counts.after_ocean, 0);

        let line = column_line(7, 7, 3);
        let out = extract_boundary(&dem, &line, &BoundaryParams::default()).unwrap();
        assert_eq!(out.counts.after_ocean, 7);
    }

    #[test]
    fn test_slope_filter_drops_steep_cells() {
        let mut dem = grid(7, 7, 0.0);
        for row in 0..7 {
            for col in 0..7 {
                // 50 % slope left of column 3, flat to the right
                let z = if col <= 3 { 10.0 + 0.5 * (3 - col) as f64 } else { 10.0 };
                dem.set(row, col, z).unwrap();
            }
        }
        let mut line = grid(7, 7, 0u32);
        for row in 0..7 {
            line.set(row, 1, 1).unwrap();
            line.set(row, 5, 1).unwrap();
        }
        let params = BoundaryParams {
            num_iterations: 0,
            slope_threshold: 10.0,
            ..BoundaryParams::default()
        };
        let out = extract_boundary(&dem, &line, &params).unwrap();

        // Interior steep cells go, edge rows (undefined slope) stay
        assert!(out.boundary.get(3, 1).unwrap().is_nan());
        assert!(!out.boundary.get(0, 1).unwrap().is_nan());
        assert!(!out.boundary.get(3, 5).unwrap().is_nan());
        assert_eq!(out.counts.after_slope, 2 + 7);
        assert!(out.counts.after_slope <= out.counts.after_ocean);
    }

    #[test]
    fn test_precision_rounding() {
        let dem = grid(5, 5, 3.141_592_65);
        let line = column_line(5, 5, 2);
        let params = BoundaryParams { num_iterations: 0, ..BoundaryParams::default() };
        let out = extract_boundary(&dem, &line, &params).unwrap();
        assert_eq!(out.boundary.get(2, 2).unwrap(), 3.1416);

        let params = BoundaryParams { precision: None, ..params };
        let out = extract_boundary(&dem, &line, &params).unwrap();
        assert_eq!(out.boundary.get(2, 2).unwrap(), 3.141_592_65);
    }

    #[test]
    fn test_params_validation() {
        let bad_window = BoundaryParams { smoothing_window: 4, ..BoundaryParams::default() };
        assert!(bad_window.validate().is_err());
        let bad_slope = BoundaryParams { slope_threshold: -1.0, ..BoundaryParams::default() };
        assert!(bad_slope.validate().is_err());
        assert!(BoundaryParams::default().validate().is_ok());
    }

    #[test]
    fn test_misaligned_line_rejected() {
        let dem = grid(5, 5, 1.0);
        let line = column_line(4, 5, 1);
        let err = extract_boundary(&dem, &line, &BoundaryParams::default()).unwrap_err();
        assert_eq!(err.kind(), fwdet_core::ErrorKind::Alignment);
    }
}
