//! Terrain analysis algorithms
//!
//! - Slope: rate of change of elevation (Horn)
//! - Spheroidal: ground distances for geographic grids

mod slope;
pub mod spheroidal;

pub use slope::{slope, Slope, SlopeParams, SlopeUnits};
pub use spheroidal::{cell_dimensions, haversine_distance, CellDimensions, SpheroidalParams};
