//! Domain-wide growing of boundary elevations
//!
//! Every cell takes the value (label) of its nearest seed. "Nearest" is
//! measured by a [`DistanceMetric`]; the propagation is a multi-source
//! Dijkstra wavefront over the 8-connected grid in which every cell carries
//! the seed it was reached from.
//!
//! Ties are broken on `(distance, seed index)` compared lexicographically,
//! the seed index being the row-major index of the seed cell. The lower
//! index wins, so the result does not depend on scheduling.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::terrain::haversine_distance;
use fwdet_core::raster::{Raster, D8_OFFSETS};
use fwdet_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How distance to a seed is measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Planar distance between cell centres in map units
    #[default]
    Euclidean,
    /// Great-circle distance between cell centres in meters; the grid must
    /// be in a geographic CRS
    Geodesic,
    /// Accumulated traversal cost over a cost surface
    CostWeighted,
}

impl std::str::FromStr for DistanceMetric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "euclidean" => Ok(Self::Euclidean),
            "geodesic" => Ok(Self::Geodesic),
            "cost_weighted" | "cost" => Ok(Self::CostWeighted),
            other => Err(Error::invalid_parameter(
                "distance_metric",
                other,
                "expected euclidean, geodesic or cost_weighted",
            )),
        }
    }
}

/// Result of nearest-seed allocation
#[derive(Debug, Clone)]
pub struct Allocation {
    /// Label of the nearest seed at every reachable cell
    pub labels: Raster<f64>,
    /// Distance (or accumulated cost) to that seed
    pub distance: Raster<f64>,
}

/// Wavefront entry, ordered as a min-heap on `(distance, seed, cell)`
#[derive(Debug, Clone, Copy, PartialEq)]
struct State {
    distance: f64,
    seed: usize,
    cell: usize,
}

impl Eq for State {}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap
        other
            .distance
            .total_cmp(&self.distance)
            .then_with(|| other.seed.cmp(&self.seed))
            .then_with(|| other.cell.cmp(&self.cell))
    }
}

/// Whether `(d, seed)` beats the current `(best_d, best_seed)`
fn improves(d: f64, seed: usize, best_d: f64, best_seed: usize) -> bool {
    d < best_d || (d == best_d && seed < best_seed)
}

/// Assign every cell the value of its nearest seed.
///
/// # Arguments
/// * `seeds` - Raster whose defined (non-`NaN`) cells are the seeds; the
///   cell value is the label
/// * `metric` - Distance definition
/// * `cost` - Cost surface, required for [`DistanceMetric::CostWeighted`]
///   and ignored otherwise. `NaN` or negative cost cells are impassable.
///
/// # Returns
/// [`Allocation`] aligned with `seeds`. With no seeds, every cell is `NaN`.
/// Cells cut off by impassable cost cells stay `NaN`.
pub fn nearest_label_propagation(
    seeds: &Raster<f64>,
    metric: DistanceMetric,
    cost: Option<&Raster<f64>>,
) -> Result<Allocation> {
    let (rows, cols) = seeds.shape();
    let n = rows * cols;

    let cost = match metric {
        DistanceMetric::CostWeighted => {
            let cost = cost.ok_or_else(|| {
                Error::invalid_parameter(
                    "cost_surface",
                    "none",
                    "required by the cost_weighted metric",
                )
            })?;
            seeds.ensure_aligned(cost)?;
            Some(cost)
        }
        DistanceMetric::Geodesic => {
            if !seeds.crs().is_some_and(|crs| crs.is_geographic()) {
                return Err(Error::invalid_parameter(
                    "distance_metric",
                    "geodesic",
                    "requires a grid in a geographic CRS",
                ));
            }
            None
        }
        DistanceMetric::Euclidean => None,
    };

    let tf = *seeds.transform();
    let (dx, dy) = tf.cell_extents();

    // Distance from cell to seed, both row-major indices
    let seed_distance = |cell: usize, seed: usize| -> f64 {
        let (r, c) = (cell / cols, cell % cols);
        let (sr, sc) = (seed / cols, seed % cols);
        match metric {
            DistanceMetric::Geodesic => {
                let (lon, lat) = tf.pixel_to_geo(c, r);
                let (slon, slat) = tf.pixel_to_geo(sc, sr);
                haversine_distance(lon, lat, slon, slat)
            }
            _ => ((c as f64 - sc as f64) * dx).hypot((r as f64 - sr as f64) * dy),
        }
    };

    let mut best_distance = vec![f64::INFINITY; n];
    let mut best_seed = vec![usize::MAX; n];
    let mut heap = BinaryHeap::new();

    for ((row, col), &v) in seeds.data().indexed_iter() {
        if v.is_nan() {
            continue;
        }
        let cell = row * cols + col;
        best_distance[cell] = 0.0;
        best_seed[cell] = cell;
        heap.push(State { distance: 0.0, seed: cell, cell });
    }
    debug!(seeds = heap.len(), ?metric, "growing boundary labels");

    while let Some(State { distance, seed, cell }) = heap.pop() {
        // Skip if a better assignment already reached this cell
        if distance != best_distance[cell] || seed != best_seed[cell] {
            continue;
        }

        let (row, col) = (cell / cols, cell % cols);
        let cost_here = match cost {
            Some(c) => {
                let v = unsafe { c.get_unchecked(row, col) };
                if v.is_nan() || v < 0.0 {
                    continue; // Impassable
                }
                v
            }
            None => 0.0,
        };

        for &(dr, dc, _) in &D8_OFFSETS {
            let nr = row as isize + dr;
            let nc = col as isize + dc;

            if nr < 0 || nc < 0 || nr as usize >= rows || nc as usize >= cols {
                continue;
            }

            let (nr, nc) = (nr as usize, nc as usize);
            let neighbor = nr * cols + nc;

            let candidate = match cost {
                Some(c) => {
                    let cost_neighbor = unsafe { c.get_unchecked(nr, nc) };
                    if cost_neighbor.is_nan() || cost_neighbor < 0.0 {
                        continue;
                    }
                    let step = (dc as f64 * dx).hypot(dr as f64 * dy);
                    distance + (cost_here + cost_neighbor) / 2.0 * step
                }
                None => seed_distance(neighbor, seed),
            };

            if improves(candidate, seed, best_distance[neighbor], best_seed[neighbor]) {
                best_distance[neighbor] = candidate;
                best_seed[neighbor] = seed;
                heap.push(State { distance: candidate, seed, cell: neighbor });
            }
        }
    }

    let labels: Vec<f64> = best_seed
        .iter()
        .map(|&s| {
            if s == usize::MAX {
                f64::NAN
            } else {
                unsafe { seeds.get_unchecked(s / cols, s % cols) }
            }
        })
        .collect();
    let distance: Vec<f64> = best_distance
        .into_iter()
        .map(|d| if d.is_finite() { d } else { f64::NAN })
        .collect();

    Ok(Allocation {
        labels: seeds.with_data(labels, Some(f64::NAN))?,
        distance: seeds.with_data(distance, Some(f64::NAN))?,
    })
}

/// Cost surface for [`DistanceMetric::CostWeighted`] derived from the DEM:
/// 1 over land, `water_cost` where the elevation is ≤ 0. Nodata cells
/// cost 1 so they do not block growth.
pub fn default_cost_surface(dem: &Raster<f64>, water_cost: f64) -> Result<Raster<f64>> {
    if !(water_cost > 0.0 && water_cost.is_finite()) {
        return Err(Error::invalid_parameter(
            "water_cost",
            water_cost,
            "must be a positive finite number",
        ));
    }

    let data: Vec<f64> = dem
        .data()
        .iter()
        .map(|&v| if v <= 0.0 { water_cost } else { 1.0 })
        .collect();
    dem.with_data(data, Some(f64::NAN))
}
