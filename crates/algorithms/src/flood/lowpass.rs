//! Low-pass filtering of the raw depth raster
//!
//! A weighted window average (box or Gaussian) that ignores nodata cells
//! and renormalises the weights over the defined neighbours. The result is
//! re-masked against the raw depth: wet cells take the filtered value, dry
//! cells stay 0 and cells outside the footprint stay nodata.

use crate::maybe_rayon::*;
use fwdet_core::raster::Raster;
use fwdet_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Filter kernel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LowPassKernel {
    /// Uniform weights over the window
    Mean,
    /// Weights `exp(-d² / 2σ²)` with `d` in cells
    Gaussian { sigma: f64 },
}

impl Default for LowPassKernel {
    fn default() -> Self {
        LowPassKernel::Gaussian { sigma: 1.0 }
    }
}

/// Parameters for the depth low-pass filter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LowPassParams {
    pub kernel: LowPassKernel,
    /// Half-width of the square window in cells (0 = no filtering)
    pub radius: usize,
}

impl Default for LowPassParams {
    fn default() -> Self {
        Self {
            kernel: LowPassKernel::default(),
            radius: 3,
        }
    }
}

impl LowPassParams {
    pub fn validate(&self) -> Result<()> {
        if let LowPassKernel::Gaussian { sigma } = self.kernel
            && !(sigma > 0.0 && sigma.is_finite())
        {
            return Err(Error::invalid_parameter(
                "low_pass.sigma",
                sigma,
                "must be a positive finite number",
            ));
        }
        Ok(())
    }

    /// Row-major `(d_row, d_col, weight)` triples of the window
    fn weights(&self) -> Vec<(isize, isize, f64)> {
        let r = self.radius as isize;
        let mut weights = Vec::with_capacity((2 * self.radius + 1).pow(2));
        for dr in -r..=r {
            for dc in -r..=r {
                let w = match self.kernel {
                    LowPassKernel::Mean => 1.0,
                    LowPassKernel::Gaussian { sigma } => {
                        let d2 = (dr * dr + dc * dc) as f64;
                        (-d2 / (2.0 * sigma * sigma)).exp()
                    }
                };
                weights.push((dr, dc, w));
            }
        }
        weights
    }
}

/// Low-pass filter a depth raster.
///
/// # Arguments
/// * `depth` - Raw depth, `NaN` outside the footprint
/// * `params` - Kernel and radius
///
/// # Returns
/// Filtered depth with the same defined cells as the input
pub fn low_pass(depth: &Raster<f64>, params: &LowPassParams) -> Result<Raster<f64>> {
    params.validate()?;

    let (rows, cols) = depth.shape();
    let weights = params.weights();

    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];

            for (col, out) in row_data.iter_mut().enumerate() {
                let raw = unsafe { depth.get_unchecked(row, col) };
                if raw.is_nan() || raw <= 0.0 {
                    *out = raw;
                    continue;
                }

                let mut weighted_sum = 0.0;
                let mut weight_total = 0.0;

                for &(dr, dc, w) in &weights {
                    let nr = row as isize + dr;
                    let nc = col as isize + dc;

                    if nr < 0 || nc < 0 || nr as usize >= rows || nc as usize >= cols {
                        continue;
                    }

                    let v = unsafe { depth.get_unchecked(nr as usize, nc as usize) };
                    if !v.is_nan() {
                        weighted_sum += v * w;
                        weight_total += w;
                    }
                }

                *out = weighted_sum / weight_total;
            }

            row_data
        })
        .collect();

    depth.with_data(output_data, Some(f64::NAN))
}
