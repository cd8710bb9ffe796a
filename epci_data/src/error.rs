//! Error types for the epci_data crate

use polars::prelude::PolarsError;
use thiserror::Error;

/// Errors raised while loading, consolidating or writing EPCI datasets
#[derive(Debug, Error)]
pub enum DataError {
    /// A raw category label has no canonical energy source
    #[error("Unmapped category label: '{0}'")]
    UnmappedCategory(String),

    /// An observation falls outside the known year range
    #[error("Year {0} is outside the known range")]
    UnknownYear(i32),

    /// A required table column is absent
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// A required GeoJSON property is absent
    #[error("Missing property: {0}")]
    MissingProperty(String),

    /// A coordinate leaf is neither a number nor an array
    #[error("Unsupported coordinate value: {0}")]
    UnsupportedLeaf(String),

    /// Input data violates the expected shape
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// The output path does not name a supported format
    #[error("Unsupported output target: {0}")]
    UnsupportedOutput(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(String),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, DataError>;

impl From<PolarsError> for DataError {
    fn from(err: PolarsError) -> Self {
        DataError::Polars(err.to_string())
    }
}
