//! # Series Math
//!
//! Numeric kernels for daily price series.
//! This crate provides the building blocks used by the feature and
//! forecasting layers of the coin pipeline:
//!
//! - period-over-period and logarithmic returns
//! - partial-window rolling mean and population standard deviation
//! - compounded cumulative return and running drawdown
//! - Holt's linear (additive trend) exponential smoothing with parameter fitting

use thiserror::Error;

// Kernel modules
pub mod drawdown;
pub mod returns;
pub mod rolling;
pub mod smoothing;

/// Errors that can occur in series calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for series math operations
pub type Result<T> = std::result::Result<T, MathError>;
