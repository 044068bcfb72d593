//! Fit-quality statistics for predictions against actual values

use crate::config::ZeroDenominatorPolicy;
use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Letter grade derived from MAPE
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AccuracyGrade {
    A,
    B,
    C,
    D,
}

impl AccuracyGrade {
    /// A up to 15%, B up to 25%, C up to 35%, D beyond (or undefined)
    pub fn from_mape(mape: f64) -> Self {
        if mape <= 15.0 {
            AccuracyGrade::A
        } else if mape <= 25.0 {
            AccuracyGrade::B
        } else if mape <= 35.0 {
            AccuracyGrade::C
        } else {
            AccuracyGrade::D
        }
    }
}

impl fmt::Display for AccuracyGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            AccuracyGrade::A => "A",
            AccuracyGrade::B => "B",
            AccuracyGrade::C => "C",
            AccuracyGrade::D => "D",
        };
        write!(f, "{}", letter)
    }
}

/// Regression metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Coefficient of determination
    pub r2: f64,
    /// Mean Absolute Percentage Error, in percent
    pub mape: f64,
    /// `max(0, 1 - mape / 100)`
    pub accuracy: f64,
    /// Number of compared points
    pub n: usize,
}

impl EvaluationMetrics {
    pub fn grade(&self) -> AccuracyGrade {
        AccuracyGrade::from_mape(self.mape)
    }
}

impl fmt::Display for EvaluationMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "n:        {}", self.n)?;
        writeln!(f, "R²:       {:.4}", self.r2)?;
        writeln!(f, "RMSE:     {:.2}", self.rmse)?;
        writeln!(f, "MAE:      {:.2}", self.mae)?;
        writeln!(f, "MAPE:     {:.2}%", self.mape)?;
        write!(
            f,
            "Accuracy: {:.1}% (grade {})",
            self.accuracy * 100.0,
            self.grade()
        )
    }
}

/// Compare predictions against actual values
///
/// A zero actual value makes MAPE undefined: under
/// [`ZeroDenominatorPolicy::Fail`] this returns `DivisionByZero`; under
/// [`ZeroDenominatorPolicy::Sentinel`] MAPE becomes infinite (NaN if the
/// prediction was also exactly zero) and accuracy drops to 0.
///
/// R² of a constant target is 1 for a perfect fit and 0 otherwise.
pub fn evaluate(
    y_true: &[f64],
    y_pred: &[f64],
    policy: ZeroDenominatorPolicy,
) -> Result<EvaluationMetrics> {
    if y_true.len() != y_pred.len() {
        return Err(ForecastError::DimensionMismatch {
            expected: y_true.len(),
            got: y_pred.len(),
        });
    }
    if y_true.is_empty() {
        return Err(ForecastError::DataError(
            "Cannot evaluate an empty prediction set".to_string(),
        ));
    }

    let n = y_true.len() as f64;
    let mut abs_sum = 0.0;
    let mut sq_sum = 0.0;
    let mut pct_sum = 0.0;

    for (i, (&actual, &predicted)) in y_true.iter().zip(y_pred).enumerate() {
        let error = actual - predicted;
        abs_sum += error.abs();
        sq_sum += error * error;

        if actual == 0.0 && policy == ZeroDenominatorPolicy::Fail {
            return Err(ForecastError::DivisionByZero(format!(
                "MAPE is undefined: actual value at position {} is zero",
                i
            )));
        }
        pct_sum += (error / actual).abs();
    }

    let mean_true = y_true.iter().sum::<f64>() / n;
    let ss_tot: f64 = y_true.iter().map(|y| (y - mean_true).powi(2)).sum();
    let r2 = if ss_tot > 0.0 {
        1.0 - sq_sum / ss_tot
    } else if sq_sum == 0.0 {
        1.0
    } else {
        0.0
    };

    let mse = sq_sum / n;
    let mape = pct_sum / n * 100.0;
    if !mape.is_finite() {
        tracing::warn!(mape, "MAPE is not finite, zero actual values present");
    }

    Ok(EvaluationMetrics {
        mae: abs_sum / n,
        mse,
        rmse: mse.sqrt(),
        r2,
        mape,
        // f64::max ignores NaN
        accuracy: (1.0 - mape / 100.0).max(0.0),
        n: y_true.len(),
    })
}
