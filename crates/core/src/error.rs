//! Error types for solarsite

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for solarsite operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid polygon: {0}")]
    InvalidPolygon(String),

    #[error("Geometry error: {0}")]
    Geometry(String),

    #[error("Raster not found: {}", path.display())]
    RasterNotFound { path: PathBuf },

    #[error("Cannot parse {} as a geo-raster: {reason}", path.display())]
    RasterFormat { path: PathBuf, reason: String },

    #[error("Invalid pixel window: cols {col_min}..={col_max}, rows {row_min}..={row_max}")]
    InvalidWindow {
        col_min: i64,
        col_max: i64,
        row_min: i64,
        row_max: i64,
    },

    #[error("Polygon bounds ({min_x:.6}, {min_y:.6}) - ({max_x:.6}, {max_y:.6}) are outside the raster extent")]
    OutOfCoverage {
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
    },

    #[error("No valid data inside polygon ({candidates} candidate samples, all nodata or invalid)")]
    NoValidData { candidates: usize },

    #[error("Insufficient area: {0}")]
    InsufficientArea(String),

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },
}

impl Error {
    /// Shorthand for [`Error::InvalidParameter`]
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

/// Result type alias for solarsite operations
pub type Result<T> = std::result::Result<T, Error>;
