//! Error types for the stock_forecast crate

use polars::prelude::PolarsError;
use std::time::Duration;
use thiserror::Error;

/// Custom error types for the stock_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Required columns are missing, the table is empty, or values are malformed
    #[error("Invalid input: {0}")]
    InvalidInputError(String),

    /// Forecast horizon is not a positive integer
    #[error("Invalid horizon: {0}")]
    InvalidHorizonError(String),

    /// A forecaster could not produce a usable model
    #[error("Model fit error: {0}")]
    ModelFitError(String),

    /// Scoring was asked to compare sequences of different lengths
    #[error("Misaligned series: {actual} actual values vs {predicted} predictions")]
    MisalignedSeriesError { actual: usize, predicted: usize },

    /// A forecaster exceeded its fit budget
    #[error("{model} did not finish fitting within {timeout:?}")]
    FitTimeoutError { model: String, timeout: Duration },

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Configuration could not be read or understood
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),

    /// Error writing CSV output
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Error from JSON (de)serialization
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}
