//! Per-feature standardization
//!
//! x_scaled = (x - mean) / std, with mean and population std learned once at
//! fit time and reused unchanged for every later transform.

use crate::error::{ForecastError, Result};

/// Learned centring and scaling parameters, one pair per feature column
#[derive(Debug, Clone, PartialEq)]
pub struct Standardizer {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl Standardizer {
    /// Learn column means and scales from row-major data
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self> {
        let first = rows.first().ok_or(ForecastError::InsufficientHistory {
            needed: 1,
            got: 0,
        })?;
        let width = first.len();
        let n = rows.len() as f64;

        let mut means = vec![0.0; width];
        for row in rows {
            if row.len() != width {
                return Err(ForecastError::DimensionMismatch {
                    expected: width,
                    got: row.len(),
                });
            }
            for (mean, x) in means.iter_mut().zip(row) {
                *mean += x;
            }
        }
        for mean in &mut means {
            *mean /= n;
        }

        let mut variances = vec![0.0; width];
        for row in rows {
            for ((var, x), mean) in variances.iter_mut().zip(row).zip(&means) {
                *var += (x - mean).powi(2);
            }
        }

        // Zero-variance columns are only centred
        let scales = variances
            .into_iter()
            .map(|var| {
                let std = (var / n).sqrt();
                if std < 1e-10 {
                    1.0
                } else {
                    std
                }
            })
            .collect();

        Ok(Self { means, scales })
    }

    /// Number of feature columns
    pub fn width(&self) -> usize {
        self.means.len()
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn scales(&self) -> &[f64] {
        &self.scales
    }

    /// Standardize one row
    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        if row.len() != self.width() {
            return Err(ForecastError::DimensionMismatch {
                expected: self.width(),
                got: row.len(),
            });
        }

        Ok(row
            .iter()
            .zip(&self.means)
            .zip(&self.scales)
            .map(|((x, mean), scale)| (x - mean) / scale)
            .collect())
    }

    /// Standardize every row
    pub fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        rows.iter().map(|row| self.transform_row(row)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_fit_transform_zero_mean_unit_variance() {
        let rows = vec![
            vec![1.0, 10.0],
            vec![2.0, 20.0],
            vec![3.0, 30.0],
            vec![4.0, 40.0],
        ];
        let scaler = Standardizer::fit(&rows).unwrap();
        let scaled = scaler.transform(&rows).unwrap();

        for j in 0..2 {
            let column: Vec<f64> = scaled.iter().map(|r| r[j]).collect();
            let mean = column.iter().sum::<f64>() / 4.0;
            let var = column.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / 4.0;
            assert_relative_eq!(mean, 0.0, epsilon = 1e-12);
            assert_relative_eq!(var, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_constant_column_is_centred_only() {
        let rows = vec![vec![5.0, 1.0], vec![5.0, 2.0]];
        let scaler = Standardizer::fit(&rows).unwrap();
        assert_eq!(scaler.scales()[0], 1.0);
        assert_eq!(scaler.transform_row(&[7.0, 1.5]).unwrap()[0], 2.0);
    }

    #[test]
    fn test_parameters_reused_on_new_rows() {
        let scaler = Standardizer::fit(&[vec![0.0], vec![2.0]]).unwrap();
        assert_eq!(scaler.transform_row(&[4.0]).unwrap(), vec![3.0]);
    }

    #[test]
    fn test_errors() {
        assert!(Standardizer::fit(&[]).is_err());
        assert!(Standardizer::fit(&[vec![1.0, 2.0], vec![1.0]]).is_err());

        let scaler = Standardizer::fit(&[vec![1.0, 2.0]]).unwrap();
        assert!(matches!(
            scaler.transform_row(&[1.0]),
            Err(ForecastError::DimensionMismatch { expected: 2, got: 1 })
        ));
    }
}
