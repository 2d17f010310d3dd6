//! Raster data structures and operations

mod element;
mod geotransform;
mod grid;
mod grid_spec;
mod neighborhood;

pub use element::RasterElement;
pub use geotransform::GeoTransform;
pub use grid::{Raster, RasterStatistics};
pub use grid_spec::GridSpec;
pub use neighborhood::{Neighborhood, D8_OFFSETS};
