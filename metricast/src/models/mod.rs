//! Regression backends and the fitted forecasting model
//!
//! A backend is selected once from [`BackendConfig`] and always sees
//! standardized features: [`FittedModel`] owns the [`Standardizer`] learned at
//! training time together with the feature schema, and applies both to every
//! prediction.

use crate::config::{BackendConfig, ZeroDenominatorPolicy};
use crate::data::Series;
use crate::error::{ForecastError, Result};
use crate::features::{FeatureBuilder, FeatureSchema, FeatureTable, FeatureVector};
use crate::metrics::{self, EvaluationMetrics};
use crate::scaling::Standardizer;
use std::fmt::Debug;

pub mod ensemble;
pub mod linear;

pub use ensemble::{FittedForest, RandomForest};
pub use linear::{FittedLinear, LinearRegression};

/// Regression estimator that can be fitted on a design matrix
pub trait Regressor: Debug {
    /// The type of fitted estimator produced
    type Fitted: FittedRegressor;

    /// Fit on row-major features `x` and targets `y`
    fn fit(&self, x: &[Vec<f64>], y: &[f64]) -> Result<Self::Fitted>;

    /// Get the name of the estimator
    fn name(&self) -> &str;
}

/// Fitted estimator producing point predictions
pub trait FittedRegressor: Debug {
    /// Predict one row
    fn predict_row(&self, x: &[f64]) -> f64;

    /// Predict every row
    fn predict(&self, x: &[Vec<f64>]) -> Vec<f64> {
        x.iter().map(|row| self.predict_row(row)).collect()
    }
}

/// Closed set of backends
#[derive(Debug, Clone)]
pub enum Backend {
    Linear(LinearRegression),
    Ensemble(RandomForest),
}

impl Backend {
    /// Backend described by the configuration
    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        match config {
            BackendConfig::Linear => Ok(Backend::Linear(LinearRegression::ordinary())),
            BackendConfig::Ridge { alpha } => Ok(Backend::Linear(LinearRegression::ridge(*alpha)?)),
            BackendConfig::Ensemble {
                n_trees,
                max_depth,
                min_samples_split,
                seed,
            } => Ok(Backend::Ensemble(RandomForest::new(
                *n_trees,
                *max_depth,
                *min_samples_split,
                *seed,
            )?)),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Backend::Linear(model) => model.name(),
            Backend::Ensemble(model) => model.name(),
        }
    }

    fn fit(&self, x: &[Vec<f64>], y: &[f64]) -> Result<FittedBackend> {
        match self {
            Backend::Linear(model) => model.fit(x, y).map(FittedBackend::Linear),
            Backend::Ensemble(model) => model.fit(x, y).map(FittedBackend::Ensemble),
        }
    }
}

/// Fitted counterpart of [`Backend`]
#[derive(Debug, Clone)]
pub enum FittedBackend {
    Linear(FittedLinear),
    Ensemble(FittedForest),
}

impl FittedRegressor for FittedBackend {
    fn predict_row(&self, x: &[f64]) -> f64 {
        match self {
            FittedBackend::Linear(model) => model.predict_row(x),
            FittedBackend::Ensemble(model) => model.predict_row(x),
        }
    }
}

/// Trained regression parameters plus the standardization and schema they need
#[derive(Debug, Clone)]
pub struct FittedModel {
    name: String,
    schema: FeatureSchema,
    scaler: Standardizer,
    backend: FittedBackend,
    training_rows: usize,
}

impl FittedModel {
    /// Standardize the table and fit the backend on it
    pub fn train(backend: &Backend, table: &FeatureTable) -> Result<Self> {
        if table.is_empty() {
            return Err(ForecastError::InsufficientHistory { needed: 1, got: 0 });
        }
        ensure_finite(table.schema(), table.rows())?;

        let scaler = Standardizer::fit(table.rows())?;
        let scaled = scaler.transform(table.rows())?;
        let fitted = backend.fit(&scaled, table.targets())?;

        tracing::info!(
            backend = backend.name(),
            rows = table.len(),
            features = table.schema().len(),
            "fitted regression backend"
        );

        Ok(Self {
            name: backend.name().to_string(),
            schema: table.schema(),
            scaler,
            backend: fitted,
            training_rows: table.len(),
        })
    }

    /// Name of the backend the model was fitted with
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Schema the model was trained on
    pub fn schema(&self) -> FeatureSchema {
        self.schema
    }

    /// Learned standardization parameters
    pub fn scaler(&self) -> &Standardizer {
        &self.scaler
    }

    /// Number of rows the model was trained on
    pub fn training_rows(&self) -> usize {
        self.training_rows
    }

    /// Predict a single feature vector
    pub fn predict(&self, vector: &FeatureVector) -> Result<f64> {
        self.check_schema(vector.schema())?;
        ensure_finite(self.schema, &[vector.values()])?;

        let scaled = self.scaler.transform_row(vector.values())?;
        Ok(self.backend.predict_row(&scaled))
    }

    /// Predict every row of a table
    pub fn predict_table(&self, table: &FeatureTable) -> Result<Vec<f64>> {
        self.check_schema(table.schema())?;
        ensure_finite(self.schema, table.rows())?;

        let scaled = self.scaler.transform(table.rows())?;
        Ok(self.backend.predict(&scaled))
    }

    /// In-sample metrics of this model on the feature table of `series`
    pub fn evaluate_on(
        &self,
        builder: &FeatureBuilder,
        series: &Series,
        policy: ZeroDenominatorPolicy,
    ) -> Result<EvaluationMetrics> {
        let table = builder.build_all(series)?;
        let predictions = self.predict_table(&table)?;
        metrics::evaluate(table.targets(), &predictions, policy)
    }

    fn check_schema(&self, schema: FeatureSchema) -> Result<()> {
        if schema != self.schema {
            return Err(ForecastError::SchemaMismatch {
                expected: self.schema.owned_names(),
                got: schema.owned_names(),
            });
        }
        Ok(())
    }
}

/// Reject NaN and infinite feature values
fn ensure_finite<R: AsRef<[f64]>>(schema: FeatureSchema, rows: &[R]) -> Result<()> {
    for (row_index, row) in rows.iter().enumerate() {
        if let Some(j) = row.as_ref().iter().position(|v| !v.is_finite()) {
            return Err(ForecastError::NonFiniteFeature {
                feature: schema
                    .names()
                    .get(j)
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| format!("#{}", j)),
                row: row_index,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn table(n: usize) -> FeatureTable {
        let values: Vec<f64> = (0..n).map(|i| 200.0 + 3.0 * i as f64).collect();
        let series =
            Series::from_values(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), &values).unwrap();
        FeatureBuilder::default().build_all(&series).unwrap()
    }

    #[test]
    fn test_backend_from_config() {
        let backend = Backend::from_config(&BackendConfig::default()).unwrap();
        assert_eq!(backend.name(), "ridge");
        let backend = Backend::from_config(&BackendConfig::Linear).unwrap();
        assert_eq!(backend.name(), "linear");
        let backend = Backend::from_config(&BackendConfig::ensemble(1)).unwrap();
        assert_eq!(backend.name(), "ensemble");
    }

    #[test]
    fn test_train_rejects_empty_table() {
        let backend = Backend::from_config(&BackendConfig::Linear).unwrap();
        assert!(matches!(
            FittedModel::train(&backend, &table(20)),
            Err(ForecastError::InsufficientHistory { .. })
        ));
    }

    #[test]
    fn test_schema_mismatch_fails_fast() {
        static OTHER: [&str; 2] = ["lag_1", "lag_7"];
        let backend = Backend::from_config(&BackendConfig::Linear).unwrap();
        let model = FittedModel::train(&backend, &table(45)).unwrap();

        let vector = FeatureVector::new(FeatureSchema::custom(&OTHER), vec![1.0, 2.0]).unwrap();
        assert!(matches!(
            model.predict(&vector),
            Err(ForecastError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_non_finite_feature_rejected() {
        let backend = Backend::from_config(&BackendConfig::Linear).unwrap();
        let model = FittedModel::train(&backend, &table(45)).unwrap();

        let mut values = table(45).rows()[0].clone();
        values[11] = f64::INFINITY;
        let vector = FeatureVector::new(FeatureSchema::standard(), values).unwrap();
        match model.predict(&vector) {
            Err(ForecastError::NonFiniteFeature { feature, .. }) => {
                assert_eq!(feature, "value_pct_change")
            }
            other => panic!("expected NonFiniteFeature, got {:?}", other),
        }
    }

    #[test]
    fn test_in_sample_fit_on_trend() {
        let backend = Backend::from_config(&BackendConfig::Linear).unwrap();
        let data = table(60);
        let model = FittedModel::train(&backend, &data).unwrap();
        let predictions = model.predict_table(&data).unwrap();

        for (p, y) in predictions.iter().zip(data.targets()) {
            assert!((p - y).abs() < 1e-3, "{} vs {}", p, y);
        }
        assert_eq!(model.training_rows(), 30);
    }
}
