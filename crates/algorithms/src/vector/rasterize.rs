//! Polygon rasterization onto a DEM grid
//!
//! Two products are derived from a flood polygon:
//! - the *line raster*: every cell crossed by a ring, labelled with the
//!   1-based index of the polygon whose outline covers the most length in
//!   that cell (ties go to the lower index), 0 elsewhere;
//! - the *footprint*: 1 where the cell centre is inside the polygon by the
//!   even-odd rule, 0 elsewhere.
//!
//! Geometry is traced in pixel space, so rotated transforms work unchanged.

use std::collections::BTreeMap;

use crate::maybe_rayon::*;
use crate::vector::validate::validate_flood_polygon;
use fwdet_core::raster::{GeoTransform, GridSpec, Raster};
use fwdet_core::{Error, FloodPolygon, Result};
use geo::Coord;
use ndarray::Array2;

/// Rasterize the polygon outlines (exterior and holes) onto `grid`.
///
/// The polygon is validated first; invalid geometry and a CRS that
/// disagrees with the grid's are errors.
pub fn rasterize_boundary(flood: &FloodPolygon, grid: &GridSpec) -> Result<Raster<u32>> {
    check_crs(flood, grid)?;
    validate_flood_polygon(flood)?;
    trace_boundary(flood, grid)
}

/// Rasterize the polygon interior onto `grid` by cell-centre inclusion.
pub fn rasterize_footprint(flood: &FloodPolygon, grid: &GridSpec) -> Result<Raster<u8>> {
    check_crs(flood, grid)?;
    validate_flood_polygon(flood)?;
    fill_footprint(flood, grid)
}

fn check_crs(flood: &FloodPolygon, grid: &GridSpec) -> Result<()> {
    if let (Some(a), Some(b)) = (&flood.crs, &grid.crs)
        && !a.is_equivalent(b)
    {
        return Err(Error::CrsMismatch(a.identifier(), b.identifier()));
    }
    Ok(())
}

/// Line raster without validation, for callers that already validated.
pub(crate) fn trace_boundary(flood: &FloodPolygon, grid: &GridSpec) -> Result<Raster<u32>> {
    let (rows, cols) = grid.shape();
    let tf = &grid.transform;

    // (cell, polygon label) -> covered length in map units
    let mut coverage: BTreeMap<(usize, u32), f64> = BTreeMap::new();

    for (poly_idx, ring) in flood.boundary_lines() {
        let label = poly_idx as u32 + 1;
        for line in ring.lines() {
            trace_segment(tf, rows, cols, line.start, line.end, |cell, len| {
                *coverage.entry((cell, label)).or_insert(0.0) += len;
            });
        }
    }

    let mut best: BTreeMap<usize, (u32, f64)> = BTreeMap::new();
    for ((cell, label), len) in coverage {
        // Labels arrive in ascending order per cell; only a strictly longer
        // coverage displaces the current winner.
        best.entry(cell)
            .and_modify(|(l, best_len)| {
                if len > *best_len {
                    *l = label;
                    *best_len = len;
                }
            })
            .or_insert((label, len));
    }

    let mut data = Array2::<u32>::zeros((rows, cols));
    for (cell, (label, _)) in best {
        data[(cell / cols, cell % cols)] = label;
    }

    let mut output = Raster::from_grid_spec(grid, 0u32);
    output.set_nodata(Some(0));
    *output.data_mut() = data;
    Ok(output)
}

/// Walk one segment through the grid, reporting `(row-major cell, length)`
/// for every cell piece it covers. The segment is clipped to the grid
/// (Liang-Barsky) and split at every column and row line it crosses.
fn trace_segment<F>(
    tf: &GeoTransform,
    rows: usize,
    cols: usize,
    start: Coord<f64>,
    end: Coord<f64>,
    mut visit: F,
) where
    F: FnMut(usize, f64),
{
    let length = (end.x - start.x).hypot(end.y - start.y);
    if !(length > 0.0) || rows == 0 || cols == 0 {
        return;
    }

    let (x0, y0) = tf.geo_to_pixel(start.x, start.y);
    let (x1, y1) = tf.geo_to_pixel(end.x, end.y);
    let (dx, dy) = (x1 - x0, y1 - y0);

    let Some((t_in, t_out)) = clip_parameter(x0, y0, dx, dy, cols as f64, rows as f64) else {
        return;
    };

    let mut ts = vec![t_in, t_out];
    push_crossings(&mut ts, x0, dx, t_in, t_out);
    push_crossings(&mut ts, y0, dy, t_in, t_out);
    ts.sort_by(|a, b| a.total_cmp(b));
    ts.dedup();

    for pair in ts.windows(2) {
        let (ta, tb) = (pair[0], pair[1]);
        if tb <= ta {
            continue;
        }
        let tm = 0.5 * (ta + tb);
        let col = ((x0 + tm * dx).floor().max(0.0) as usize).min(cols - 1);
        let row = ((y0 + tm * dy).floor().max(0.0) as usize).min(rows - 1);
        visit(row * cols + col, (tb - ta) * length);
    }
}

/// Parameter range of `p0 + t·d`, `t ∈ [0, 1]`, inside `[0, w] × [0, h]`
fn clip_parameter(x0: f64, y0: f64, dx: f64, dy: f64, w: f64, h: f64) -> Option<(f64, f64)> {
    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;

    for (p, q) in [(-dx, x0), (dx, w - x0), (-dy, y0), (dy, h - y0)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return None;
        }
    }

    (t1 > t0).then_some((t0, t1))
}

/// Parameters where `v0 + t·dv` crosses an integer within `(t_in, t_out)`
fn push_crossings(ts: &mut Vec<f64>, v0: f64, dv: f64, t_in: f64, t_out: f64) {
    if dv == 0.0 {
        return;
    }
    let a = v0 + t_in * dv;
    let b = v0 + t_out * dv;
    let (lo, hi) = (a.min(b).ceil() as i64, a.max(b).floor() as i64);
    for k in lo..=hi {
        let t = (k as f64 - v0) / dv;
        if t > t_in && t < t_out {
            ts.push(t);
        }
    }
}

/// Footprint without validation, for callers that already validated.
pub(crate) fn fill_footprint(flood: &FloodPolygon, grid: &GridSpec) -> Result<Raster<u8>> {
    let (rows, cols) = grid.shape();
    let tf = &grid.transform;

    // Rings in pixel space, grouped per polygon
    let polygons: Vec<Vec<Vec<(f64, f64)>>> = flood
        .iter()
        .map(|polygon| {
            std::iter::once(polygon.exterior())
                .chain(polygon.interiors())
                .map(|ring| ring.coords().map(|c| tf.geo_to_pixel(c.x, c.y)).collect())
                .collect()
        })
        .collect();

    let output_data: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![0u8; cols];
            let y = row as f64 + 0.5;
            let mut crossings = Vec::new();

            for rings in &polygons {
                crossings.clear();
                for ring in rings {
                    for edge in ring.windows(2) {
                        let ((xa, ya), (xb, yb)) = (edge[0], edge[1]);
                        if (ya <= y) != (yb <= y) {
                            crossings.push(xa + (y - ya) / (yb - ya) * (xb - xa));
                        }
                    }
                }
                crossings.sort_by(|a, b| a.total_cmp(b));

                for span in crossings.chunks_exact(2) {
                    // Centres x = col + 0.5 with span[0] <= x < span[1]
                    let first = (span[0] - 0.5).ceil().max(0.0);
                    let last = (span[1] - 0.5).ceil().min(cols as f64);
                    if last <= first {
                        continue;
                    }
                    for cell in &mut row_data[first as usize..last as usize] {
                        *cell = 1;
                    }
                }
            }

            row_data
        })
        .collect();

    let mut output = Raster::from_grid_spec(grid, 0u8);
    output.set_nodata(Some(0));
    *output.data_mut() = Array2::from_shape_vec((rows, cols), output_data)
        .map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}
