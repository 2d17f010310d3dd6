//! Statistical analysis algorithms for raster data
//!
//! - **focal**: Moving window (focal) statistics

pub mod focal;

pub use focal::{focal_statistics, focal_statistics_within, FocalParams, FocalStatistic};
