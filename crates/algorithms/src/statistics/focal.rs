//! Focal (moving window) statistics
//!
//! Computes a statistic over the valid (non-NaN) cells of a window centred
//! on each cell. Nodata cells are skipped, not propagated, so a cell whose
//! window holds at least one valid value always gets a result.

use crate::maybe_rayon::*;
use ndarray::Array2;
use fwdet_core::raster::{Neighborhood, Raster};
use fwdet_core::{Error, Result};

/// Available focal statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocalStatistic {
    /// Arithmetic mean
    Mean,
    /// Minimum value
    Min,
    /// Maximum value
    Max,
}

/// Parameters for focal statistics
#[derive(Debug, Clone)]
pub struct FocalParams {
    /// Window shape and radius
    pub window: Neighborhood,
    /// Statistic to compute
    pub statistic: FocalStatistic,
}

impl Default for FocalParams {
    fn default() -> Self {
        Self {
            window: Neighborhood::Square(1),
            statistic: FocalStatistic::Mean,
        }
    }
}

/// Compute focal statistics on a raster
///
/// A radius of 0 is a single-cell window and returns the input values.
///
/// # Arguments
/// * `raster` - Input raster, nodata as `NaN`
/// * `params` - Window and statistic
///
/// # Returns
/// Raster with the computed statistic at each cell; `NaN` where the window
/// holds no valid value
pub fn focal_statistics(raster: &Raster<f64>, params: FocalParams) -> Result<Raster<f64>> {
    focal_impl(raster, &params, None)
}

/// Compute focal statistics only at cells where `mask` is true.
///
/// Other cells are `NaN`. Used when the cells of interest are a thin subset
/// of the grid, such as a rasterized shoreline.
pub fn focal_statistics_within(
    raster: &Raster<f64>,
    params: FocalParams,
    mask: &Array2<bool>,
) -> Result<Raster<f64>> {
    if mask.dim() != raster.shape() {
        let (ar, ac) = mask.dim();
        return Err(Error::SizeMismatch {
            er: raster.rows(),
            ec: raster.cols(),
            ar,
            ac,
        });
    }
    focal_impl(raster, &params, Some(mask))
}

fn focal_impl(
    raster: &Raster<f64>,
    params: &FocalParams,
    mask: Option<&Array2<bool>>,
) -> Result<Raster<f64>> {
    let (rows, cols) = raster.shape();
    let offsets = params.window.offsets();
    let statistic = params.statistic;

    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];

            for (col, out) in row_data.iter_mut().enumerate() {
                if let Some(mask) = mask
                    && !mask[(row, col)]
                {
                    continue;
                }

                let mut acc = Accumulator::new(statistic);

                for &(dr, dc) in &offsets {
                    let nr = row as isize + dr;
                    let nc = col as isize + dc;

                    if nr >= 0 && nc >= 0 && (nr as usize) < rows && (nc as usize) < cols {
                        let v = unsafe { raster.get_unchecked(nr as usize, nc as usize) };
                        if !v.is_nan() {
                            acc.push(v);
                        }
                    }
                }

                *out = acc.finish();
            }

            row_data
        })
        .collect();

    raster.with_data(output_data, Some(f64::NAN))
}

/// Running statistic over one window, accumulated in offset order
struct Accumulator {
    statistic: FocalStatistic,
    value: f64,
    count: usize,
}

impl Accumulator {
    fn new(statistic: FocalStatistic) -> Self {
        let value = match statistic {
            FocalStatistic::Mean => 0.0,
            FocalStatistic::Min => f64::INFINITY,
            FocalStatistic::Max => f64::NEG_INFINITY,
        };
        Self {
            statistic,
            value,
            count: 0,
        }
    }

    fn push(&mut self, v: f64) {
        self.value = match self.statistic {
            FocalStatistic::Mean => self.value + v,
            FocalStatistic::Min => self.value.min(v),
            FocalStatistic::Max => self.value.max(v),
        };
        self.count += 1;
    }

    fn finish(self) -> f64 {
        match (self.count, self.statistic) {
            (0, _) => f64::NAN,
            (n, FocalStatistic::Mean) => self.value / n as f64,
            _ => self.value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fwdet_core::GeoTransform;

    fn uniform_raster(size: usize, value: f64) -> Raster<f64> {
        let mut r = Raster::filled(size, size, value);
        r.set_transform(GeoTransform::new(0.0, size as f64, 1.0, -1.0));
        r
    }

    fn gradient_raster(size: usize) -> Raster<f64> {
        let mut r = Raster::new(size, size);
        r.set_transform(GeoTransform::new(0.0, size as f64, 1.0, -1.0));
        for row in 0..size {
            for col in 0..size {
                r.set(row, col, (row * size + col) as f64).unwrap();
            }
        }
        r
    }

    #[test]
    fn test_focal_mean_uniform() {
        let r = uniform_raster(10, 5.0);
        let result = focal_statistics(&r, FocalParams {
            window: Neighborhood::Square(2),
            statistic: FocalStatistic::Mean,
        }).unwrap();
        let v = result.get(5, 5).unwrap();
        assert!((v - 5.0).abs() < 1e-10, "Mean of uniform should be 5.0, got {}", v);
        // Edge windows are truncated, not padded
        assert!((result.get(0, 0).unwrap() - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_focal_min_max() {
        let r = gradient_raster(10);
        let min_result = focal_statistics(&r, FocalParams {
            window: Neighborhood::Square(1),
            statistic: FocalStatistic::Min,
        }).unwrap();
        let max_result = focal_statistics(&r, FocalParams {
            window: Neighborhood::Square(1),
            statistic: FocalStatistic::Max,
        }).unwrap();

        // Cell (5,5) = 55, neighbors span (4,4)=44 to (6,6)=66
        assert!((min_result.get(5, 5).unwrap() - 44.0).abs() < 1e-10);
        assert!((max_result.get(5, 5).unwrap() - 66.0).abs() < 1e-10);
    }

    #[test]
    fn test_focal_circular_excludes_corners() {
        let r = gradient_raster(10);
        let result = focal_statistics(&r, FocalParams {
            window: Neighborhood::Circle(2),
            statistic: FocalStatistic::Min,
        }).unwrap();
        // Circle r=2 around (5,5): corner (3,3)=33 is excluded, (3,5)=35 and (4,4)=44 are in
        let v = result.get(5, 5).unwrap();
        assert!((v - 35.0).abs() < 1e-10, "Circular min should be 35, got {}", v);
    }

    #[test]
    fn test_focal_skips_nodata() {
        let mut r = uniform_raster(5, f64::NAN);
        r.set(2, 2, 7.0).unwrap();
        r.set(2, 3, 9.0).unwrap();
        let result = focal_statistics(&r, FocalParams {
            window: Neighborhood::Square(1),
            statistic: FocalStatistic::Mean,
        }).unwrap();
        assert!((result.get(2, 2).unwrap() - 8.0).abs() < 1e-10);
        assert!((result.get(1, 1).unwrap() - 7.0).abs() < 1e-10);
        assert!(result.get(0, 0).unwrap().is_nan());
    }

    #[test]
    fn test_focal_radius_zero_is_identity() {
        let r = gradient_raster(6);
        let result = focal_statistics(&r, FocalParams {
            window: Neighborhood::Square(0),
            statistic: FocalStatistic::Mean,
        }).unwrap();
        assert_eq!(result.data(), r.data());
    }

    #[test]
    fn test_focal_within_mask() {
        let r = gradient_raster(5);
        let mut mask = Array2::from_elem((5, 5), false);
        mask[(2, 2)] = true;
        let result = focal_statistics_within(&r, FocalParams::default(), &mask).unwrap();
        assert!((result.get(2, 2).unwrap() - 12.0).abs() < 1e-10);
        assert_eq!(result.valid_count(), 1);

        let wrong = Array2::from_elem((4, 4), true);
        assert!(focal_statistics_within(&r, FocalParams::default(), &wrong).is_err());
    }
}
