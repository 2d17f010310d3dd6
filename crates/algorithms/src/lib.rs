//! # FwDET Algorithms
//!
//! Floodwater depth estimation and the raster primitives it is built from.
//!
//! ## Available Algorithm Categories
//!
//! - **flood**: Boundary extraction, growing, depth compositing, low-pass, pipeline
//! - **vector**: Polygon rasterization and validation
//! - **statistics**: Focal (moving window) statistics
//! - **terrain**: Slope, spheroidal distances

pub mod flood;
pub mod statistics;
pub mod terrain;
pub mod vector;

mod maybe_rayon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::flood::{
        flood_depth, flood_depth_with_progress, low_pass, nearest_label_propagation,
        DistanceMetric, FloodDepth, FloodDepthOutput, FloodDepthParams, FloodWarning,
        LowPassKernel, LowPassParams, Stage,
    };
    pub use crate::statistics::{focal_statistics, FocalParams, FocalStatistic};
    pub use crate::terrain::{slope, Slope, SlopeParams, SlopeUnits};
    pub use crate::vector::{rasterize_boundary, rasterize_footprint, validate_flood_polygon};
    pub use fwdet_core::prelude::*;
}
