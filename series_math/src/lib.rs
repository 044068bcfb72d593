//! # Series Math
//!
//! Numeric primitives shared by the metric forecasting crates.
//! This crate provides summary statistics over value slices and a
//! trailing rolling window used for rolling-mean and rolling-deviation
//! features.

use thiserror::Error;

pub mod rolling;
pub mod summary;

pub use rolling::RollingWindow;

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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MathError::InsufficientData("need 2 values".to_string());
        assert_eq!(
            err.to_string(),
            "Insufficient data for calculation: need 2 values"
        );
    }
}
