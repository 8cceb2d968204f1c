//! Error types for the headwall pipeline

use thiserror::Error;

/// Main error type for headwall operations
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

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Attribute column '{column}' has {got} values for {expected} polygons")]
    ColumnLengthMismatch {
        column: String,
        expected: usize,
        got: usize,
    },

    #[error("Missing field '{field}' in {path}")]
    MissingField { field: String, path: String },

    #[error("Vector I/O error: {0}")]
    Vector(String),

    #[error("Geometry error: {0}")]
    Geometry(String),

    #[error("GDAL error: {0}")]
    #[cfg(feature = "gdal")]
    Gdal(String),

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("{0}")]
    Other(String),
}

#[cfg(feature = "gdal")]
impl From<gdal::errors::GdalError> for Error {
    fn from(e: gdal::errors::GdalError) -> Self {
        Error::Gdal(e.to_string())
    }
}

/// Result type alias for headwall operations
pub type Result<T> = std::result::Result<T, Error>;
