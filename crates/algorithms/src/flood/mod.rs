//! Floodwater depth estimation
//!
//! Five stages turn a flood extent polygon and a DEM into a depth grid:
//! - **rasterize** the polygon outline and interior ([`crate::vector`])
//! - **boundary**: sample, smooth and filter shoreline elevations
//! - **grow**: spread boundary elevations over the grid (nearest seed)
//! - **depth**: water surface minus terrain inside the footprint
//! - **lowpass**: smooth the depth field
//!
//! [`flood_depth`] runs them in order.

pub mod boundary;
pub mod depth;
pub mod grow;
pub mod lowpass;
pub mod pipeline;

pub use boundary::{extract_boundary, BoundaryCounts, BoundaryExtraction, BoundaryParams};
pub use depth::composite_depth;
pub use grow::{default_cost_surface, nearest_label_propagation, Allocation, DistanceMetric};
pub use lowpass::{low_pass, LowPassKernel, LowPassParams};
pub use pipeline::{
    flood_depth, flood_depth_with_progress, FloodDepth, FloodDepthOutput, FloodDepthParams,
    FloodWarning, Stage,
};
