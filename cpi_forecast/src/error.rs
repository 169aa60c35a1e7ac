//! Error types for the cpi_forecast crate

use forecast_math::MathError;
use polars::prelude::PolarsError;
use thiserror::Error;

/// Custom error types for the cpi_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Dates or values in the input could not be parsed
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// The input produced no observations
    #[error("Empty series: no usable observations")]
    EmptySeries,

    /// Model estimation failed (non-convergence, degenerate data)
    #[error("Model fit error: {0}")]
    ModelFit(String),

    /// History shorter than the model's minimum window
    #[error("Insufficient history for {model}: need at least {needed} observations, got {got}")]
    InsufficientHistory {
        model: String,
        needed: usize,
        got: usize,
    },

    /// A percent-change denominator was zero
    #[error("Division by zero computing percent change at forecast index {index}")]
    DivisionByZero { index: usize },

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Invalid dashboard configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error writing CSV tables
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Error reading or writing JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::MalformedInput(err.to_string())
    }
}

impl From<MathError> for ForecastError {
    fn from(err: MathError) -> Self {
        ForecastError::ModelFit(err.to_string())
    }
}

/// A forecast request that failed, tagged with what was being asked for
#[derive(Debug, Error)]
#[error("{strategy} forecast for a {horizon}-month horizon failed: {source}")]
pub struct RequestError {
    pub strategy: String,
    pub horizon: usize,
    #[source]
    pub source: ForecastError,
}
