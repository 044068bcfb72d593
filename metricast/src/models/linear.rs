//! Least-squares regression, ordinary and ridge
//!
//! Both variants solve the centred normal equations
//! `(X'X + λI) β = X'y` with a Cholesky factorization; the intercept is
//! recovered from the column means and is never penalized. Ordinary least
//! squares uses a tiny λ so that rank-deficient designs (collinear lag and
//! rolling features are the norm here) settle on the minimum-norm solution.

use crate::error::{ForecastError, Result};
use crate::models::{FittedRegressor, Regressor};

/// Diagonal jitter standing in for λ = 0
const ORDINARY_JITTER: f64 = 1e-8;

/// Attempts before giving up on a factorization that is not positive definite
const MAX_JITTER_RETRIES: usize = 6;

/// Least-squares estimator with optional L2 penalty
#[derive(Debug, Clone)]
pub struct LinearRegression {
    /// Name of the model
    name: String,
    /// Penalty added to the diagonal of X'X
    alpha: f64,
}

/// Fitted least-squares coefficients
#[derive(Debug, Clone)]
pub struct FittedLinear {
    coefficients: Vec<f64>,
    intercept: f64,
}

impl LinearRegression {
    /// Ordinary least squares
    pub fn ordinary() -> Self {
        Self {
            name: "linear".to_string(),
            alpha: ORDINARY_JITTER,
        }
    }

    /// Ridge regression with penalty `alpha`
    pub fn ridge(alpha: f64) -> Result<Self> {
        if !alpha.is_finite() || alpha < 0.0 {
            return Err(ForecastError::InvalidParameter(format!(
                "Ridge alpha must be a non-negative number, got {}",
                alpha
            )));
        }

        Ok(Self {
            name: "ridge".to_string(),
            alpha: alpha.max(ORDINARY_JITTER),
        })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}

impl Regressor for LinearRegression {
    type Fitted = FittedLinear;

    fn fit(&self, x: &[Vec<f64>], y: &[f64]) -> Result<Self::Fitted> {
        let n = y.len();
        if n == 0 {
            return Err(ForecastError::InsufficientHistory { needed: 1, got: 0 });
        }
        if x.len() != n {
            return Err(ForecastError::DimensionMismatch {
                expected: n,
                got: x.len(),
            });
        }
        let k = x[0].len();

        let x_means: Vec<f64> = (0..k)
            .map(|j| x.iter().map(|row| row[j]).sum::<f64>() / n as f64)
            .collect();
        let y_mean = y.iter().sum::<f64>() / n as f64;

        // X'X and X'y on centred data
        let mut xtx = vec![vec![0.0; k]; k];
        let mut xty = vec![0.0; k];
        for (row, &target) in x.iter().zip(y) {
            if row.len() != k {
                return Err(ForecastError::DimensionMismatch {
                    expected: k,
                    got: row.len(),
                });
            }
            let centred: Vec<f64> = row.iter().zip(&x_means).map(|(v, m)| v - m).collect();
            let yc = target - y_mean;
            for i in 0..k {
                xty[i] += centred[i] * yc;
                for j in 0..=i {
                    xtx[i][j] += centred[i] * centred[j];
                }
            }
        }
        for i in 0..k {
            for j in 0..i {
                xtx[j][i] = xtx[i][j];
            }
        }

        let coefficients = solve_regularized(&xtx, &xty, self.alpha)?;
        let intercept = y_mean
            - coefficients
                .iter()
                .zip(&x_means)
                .map(|(b, m)| b * m)
                .sum::<f64>();

        Ok(FittedLinear {
            coefficients,
            intercept,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl FittedLinear {
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

impl FittedRegressor for FittedLinear {
    fn predict_row(&self, x: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(x)
                .map(|(b, v)| b * v)
                .sum::<f64>()
    }
}

/// Solve `(A + λI) x = b`, growing λ when rounding breaks positive definiteness
fn solve_regularized(a: &[Vec<f64>], b: &[f64], lambda: f64) -> Result<Vec<f64>> {
    let mut jitter = lambda;
    for attempt in 0..MAX_JITTER_RETRIES {
        let mut penalized = a.to_vec();
        for (i, row) in penalized.iter_mut().enumerate() {
            row[i] += jitter;
        }
        if let Some(solution) = solve_symmetric(&penalized, b) {
            return Ok(solution);
        }
        tracing::warn!(attempt, jitter, "normal equations not positive definite, raising jitter");
        jitter *= 100.0;
    }

    Err(ForecastError::Math(series_math::MathError::CalculationError(
        "Least-squares system is not positive definite".to_string(),
    )))
}

/// Solve symmetric positive definite system using Cholesky decomposition.
fn solve_symmetric(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    if a.len() != n {
        return None;
    }

    // A = L L'
    let mut l = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }

            if i == j {
                if sum <= 0.0 || !sum.is_finite() {
                    return None;
                }
                l[i][j] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }

    // L y = b
    let mut y = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[i][j] * y[j];
        }
        y[i] = sum / l[i][i];
    }

    // L' x = y
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in (i + 1)..n {
            sum -= l[j][i] * x[j];
        }
        x[i] = sum / l[i][i];
    }

    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ordinary_recovers_coefficients() {
        // y = 1 + 2*x1 + 3*x2
        let x = vec![
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 1.0],
            vec![2.0, 1.0],
            vec![1.0, 3.0],
        ];
        let y: Vec<f64> = x.iter().map(|r| 1.0 + 2.0 * r[0] + 3.0 * r[1]).collect();

        let fitted = LinearRegression::ordinary().fit(&x, &y).unwrap();
        assert_relative_eq!(fitted.intercept(), 1.0, epsilon = 1e-5);
        assert_relative_eq!(fitted.coefficients()[0], 2.0, epsilon = 1e-5);
        assert_relative_eq!(fitted.coefficients()[1], 3.0, epsilon = 1e-5);
        assert_relative_eq!(fitted.predict_row(&[4.0, 4.0]), 21.0, epsilon = 1e-4);
    }

    #[test]
    fn test_duplicate_columns_share_weight() {
        let x: Vec<Vec<f64>> = (0..6).map(|i| vec![i as f64, i as f64]).collect();
        let y: Vec<f64> = (0..6).map(|i| 2.0 * i as f64).collect();

        let fitted = LinearRegression::ordinary().fit(&x, &y).unwrap();
        assert_relative_eq!(fitted.coefficients()[0], 1.0, epsilon = 1e-5);
        assert_relative_eq!(fitted.coefficients()[1], 1.0, epsilon = 1e-5);
        assert_relative_eq!(fitted.predict_row(&[10.0, 10.0]), 20.0, epsilon = 1e-4);
    }

    #[test]
    fn test_ridge_shrinks_towards_mean() {
        let x: Vec<Vec<f64>> = (0..5).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..5).map(|i| 4.0 * i as f64).collect();

        let ordinary = LinearRegression::ordinary().fit(&x, &y).unwrap();
        let ridge = LinearRegression::ridge(10.0).unwrap().fit(&x, &y).unwrap();

        // Centred X'X = 10, X'y = 40
        assert_relative_eq!(ordinary.coefficients()[0], 4.0, epsilon = 1e-6);
        assert_relative_eq!(ridge.coefficients()[0], 2.0, epsilon = 1e-9);
        assert_relative_eq!(ridge.predict_row(&[2.0]), 8.0, epsilon = 1e-9);
    }

    #[test]
    fn test_invalid_alpha() {
        assert!(LinearRegression::ridge(-0.5).is_err());
        assert!(LinearRegression::ridge(f64::NAN).is_err());
    }

    #[test]
    fn test_dimension_mismatch() {
        let result = LinearRegression::ordinary().fit(&[vec![1.0]], &[1.0, 2.0]);
        assert!(matches!(result, Err(ForecastError::DimensionMismatch { .. })));
    }
}
