//! Error types for the epci_forecast crate

use energy_math::MathError;
use epci_data::DataError;
use polars::prelude::PolarsError;
use thiserror::Error;

/// Custom error types for the epci_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// The merged table cannot be used for training as configured
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error related to parameter validation
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Error from the data layer
    #[error(transparent)]
    Data(#[from] DataError),

    /// Error from the regression primitives
    #[error("Math error: {0}")]
    Math(#[from] MathError),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}
