//! Vector operations on the flood extent
//!
//! - Rasterize: outline (line raster) and interior (footprint) onto a grid
//! - Validate: geometric validity checks, never repairs

mod rasterize;
mod validate;

pub use rasterize::{rasterize_boundary, rasterize_footprint};
pub(crate) use rasterize::{fill_footprint, trace_boundary};
pub use validate::validate_flood_polygon;
