//! Error types for the coin_pipeline crate

use thiserror::Error;

/// Errors raised while moving a series through the layers
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Upstream data is missing an expected field
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// No valid rows survived cleaning
    #[error("Empty series: no valid rows left for {0}")]
    EmptySeriesError(String),

    /// Not enough history to fit the forecasting model
    #[error(
        "Insufficient history for {asset}: need at least {required} daily points, have {available}"
    )]
    InsufficientHistoryError {
        asset: String,
        required: usize,
        available: usize,
    },

    /// A layer write failed and was rolled back
    #[error("Write error on table '{table}': {reason}")]
    WriteError { table: String, reason: String },

    /// A store read or connection failed
    #[error("Store error: {0}")]
    StoreError(String),

    /// Configuration could not be loaded or is invalid
    #[error("Config error: {0}")]
    ConfigError(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error from a numeric kernel
    #[error("Math error: {0}")]
    MathError(#[from] series_math::MathError),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, PipelineError>;

impl From<rusqlite::Error> for PipelineError {
    fn from(err: rusqlite::Error) -> Self {
        PipelineError::StoreError(err.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::ConfigError(err.to_string())
    }
}
