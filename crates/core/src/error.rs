//! Error types for FwDET

use thiserror::Error;

/// Main error type for FwDET operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Raster grids are not co-registered: {0}")]
    Misaligned(String),

    #[error("CRS mismatch: {0} vs {1}")]
    CrsMismatch(String, String),

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("{0}")]
    Other(String),
}

/// Coarse classification of [`Error`] values.
///
/// `Geometry`, `Alignment` and `Config` errors are raised before any raster
/// computation starts; the caller must fix the inputs and re-invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid polygon or CRS disagreement between DEM and polygon
    Geometry,
    /// Rasters that must share a grid do not
    Alignment,
    /// Illegal parameter value
    Config,
    /// File access and decoding
    Io,
    Other,
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidGeometry(_) | Error::CrsMismatch(..) => ErrorKind::Geometry,
            Error::Misaligned(_) | Error::SizeMismatch { .. } => ErrorKind::Alignment,
            Error::InvalidParameter { .. } => ErrorKind::Config,
            Error::Io(_) | Error::Parse(_) | Error::UnsupportedDataType(_) => ErrorKind::Io,
            Error::InvalidDimensions { .. } | Error::IndexOutOfBounds { .. } | Error::Other(_) => {
                ErrorKind::Other
            }
        }
    }

    /// Shorthand for an [`Error::InvalidParameter`]
    pub fn invalid_parameter(
        name: &'static str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Error::InvalidParameter {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<geojson::Error> for Error {
    fn from(e: geojson::Error) -> Self {
        Error::Parse(e.to_string())
    }
}

/// Result type alias for FwDET operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(Error::InvalidGeometry("x".into()).kind(), ErrorKind::Geometry);
        assert_eq!(
            Error::CrsMismatch("EPSG:4326".into(), "EPSG:32617".into()).kind(),
            ErrorKind::Geometry
        );
        assert_eq!(Error::Misaligned("origin".into()).kind(), ErrorKind::Alignment);
        assert_eq!(
            Error::invalid_parameter("num_iterations", -1, "must be >= 0").kind(),
            ErrorKind::Config
        );
    }

    #[test]
    fn test_invalid_parameter_message() {
        let e = Error::invalid_parameter("smoothing_window", 4, "must be odd");
        assert_eq!(e.to_string(), "Invalid parameter: smoothing_window = 4 (must be odd)");
    }
}
