//! Summary statistics over value slices
//!
//! Mean and standard deviation helpers built on `statrs`. Unlike the raw
//! `statrs` functions, these never hand back NaN for short input: empty or
//! too-short slices are reported as [`MathError::InsufficientData`].

use crate::{MathError, Result};
use statrs::statistics::Statistics;

/// Arithmetic mean of the values
pub fn mean(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot compute the mean of an empty slice".to_string(),
        ));
    }

    Ok(values.iter().mean())
}

/// Sample standard deviation (N-1 denominator)
pub fn sample_std(values: &[f64]) -> Result<f64> {
    if values.len() < 2 {
        return Err(MathError::InsufficientData(format!(
            "Sample standard deviation needs at least 2 values, have {}.",
            values.len()
        )));
    }

    Ok(values.iter().std_dev())
}

/// Sample standard deviation that degrades to 0 for fewer than two values
pub fn sample_std_or_zero(values: &[f64]) -> f64 {
    sample_std(values).unwrap_or(0.0)
}

/// Population standard deviation (N denominator)
pub fn population_std(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot compute the deviation of an empty slice".to_string(),
        ));
    }

    Ok(values.iter().population_std_dev())
}

/// Z-score of every value against the whole slice (mean, sample std)
pub fn z_scores(values: &[f64]) -> Result<Vec<f64>> {
    let mean = mean(values)?;
    let std = sample_std(values)?;

    if std == 0.0 {
        return Err(MathError::CalculationError(
            "Standard deviation is zero, z-scores are undefined".to_string(),
        ));
    }

    Ok(values.iter().map(|v| (v - mean) / std).collect())
}
