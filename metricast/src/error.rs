//! Error types for the metricast crate

use polars::prelude::PolarsError;
use series_math::MathError;
use thiserror::Error;

/// Custom error types for the metricast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Predict or evaluate was called before the model was fitted
    #[error("Model must be trained before prediction")]
    UntrainedModel,

    /// Not enough observations for the requested lookback
    #[error("Insufficient history: need at least {needed} observations, got {got}")]
    InsufficientHistory { needed: usize, got: usize },

    /// A zero denominator in percent change or MAPE
    #[error("Division by zero: {0}")]
    DivisionByZero(String),

    /// A negative forecast horizon supplied by a caller
    #[error("Invalid horizon: {0} days")]
    InvalidHorizon(i64),

    /// Feature vector layout differs from the one the model was trained with
    #[error("Feature schema mismatch: expected {expected:?}, got {got:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        got: Vec<String>,
    },

    /// Two inputs that must line up have different lengths
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// NaN or infinity reached a model input
    #[error("Non-finite value in feature '{feature}' at row {row}")]
    NonFiniteFeature { feature: String, row: usize },

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Error from series math
    #[error("Math error: {0}")]
    Math(#[from] MathError),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),

    /// Error writing CSV output
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Error reading or writing JSON
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}
