//! # FwDET Core
//!
//! Core types, traits and I/O for floodwater depth estimation.
//!
//! This crate provides:
//! - `Raster<T>`: Generic georeferenced raster grid
//! - `GeoTransform` / `GridSpec`: Georeferencing and grid alignment
//! - `CRS`: Coordinate Reference System handling
//! - `FloodPolygon`: Observed flood extent geometry
//! - Algorithm trait for a consistent API
//! - Minimal GeoTIFF and GeoJSON I/O

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;
pub mod vector;

pub use crs::CRS;
pub use error::{Error, ErrorKind, Result};
pub use raster::{GeoTransform, GridSpec, Raster, RasterElement};
pub use vector::FloodPolygon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, ErrorKind, Result};
    pub use crate::raster::{GeoTransform, GridSpec, Raster, RasterElement};
    pub use crate::vector::FloodPolygon;
    pub use crate::Algorithm;
}

/// Core trait for all algorithms in FwDET.
///
/// Algorithms are pure functions that transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
