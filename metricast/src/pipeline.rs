//! High-level train / forecast / spike interface
//!
//! [`EngagementForecaster`] owns the configuration, the feature builder and
//! the chosen backend, and holds the fitted model once [`train`] has run.
//!
//! [`train`]: EngagementForecaster::train

use crate::config::ForecastConfig;
use crate::data::Series;
use crate::error::{ForecastError, Result};
use crate::features::{FeatureBuilder, MAX_LOOKBACK};
use crate::forecaster::{ForecastPoint, IterativeForecaster};
use crate::market::{self, MarketSizing};
use crate::metrics::{self, EvaluationMetrics};
use crate::models::{Backend, FittedModel};
use crate::spikes::{self, SpikeRecord};
use crate::transform::{self, EnrichedPoint};
use crate::utils::train_test_split;
use serde::{Deserialize, Serialize};

/// Outcome of a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub backend: String,
    /// Rows left after dropping the warm-up period
    pub rows: usize,
    /// In-sample fit quality
    pub metrics: EvaluationMetrics,
}

/// Holdout evaluation of iterative forecasts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub training: TrainingReport,
    pub forecast: Vec<ForecastPoint>,
    pub actual: Vec<f64>,
    /// Forecast quality on the holdout period
    pub metrics: EvaluationMetrics,
}

/// Engagement metric forecaster
#[derive(Debug, Clone)]
pub struct EngagementForecaster {
    config: ForecastConfig,
    builder: FeatureBuilder,
    backend: Backend,
    model: Option<FittedModel>,
}

impl EngagementForecaster {
    /// Validate the configuration and select the backend
    pub fn new(config: ForecastConfig) -> Result<Self> {
        config.validate()?;
        let backend = Backend::from_config(&config.backend)?;
        let builder = FeatureBuilder::new(config.zero_denominator, config.history);

        Ok(Self {
            config,
            builder,
            backend,
            model: None,
        })
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    pub fn builder(&self) -> &FeatureBuilder {
        &self.builder
    }

    /// The fitted model, if [`train`](Self::train) has succeeded
    pub fn model(&self) -> Option<&FittedModel> {
        self.model.as_ref()
    }

    pub fn is_trained(&self) -> bool {
        self.model.is_some()
    }

    /// Fit on the full feature table of `series` and report in-sample metrics
    ///
    /// A failed run leaves any previously fitted model in place. The first
    /// [`MAX_LOOKBACK`] observations only feed lags, so at least one more is
    /// needed to produce a training row.
    pub fn train(&mut self, series: &Series) -> Result<TrainingReport> {
        if series.len() <= MAX_LOOKBACK {
            return Err(ForecastError::InsufficientHistory {
                needed: MAX_LOOKBACK + 1,
                got: series.len(),
            });
        }

        let table = self.builder.build_all(series)?;
        let model = FittedModel::train(&self.backend, &table)?;
        let metrics = model.evaluate_on(&self.builder, series, self.config.zero_denominator)?;

        let report = TrainingReport {
            backend: model.name().to_string(),
            rows: model.training_rows(),
            metrics,
        };
        tracing::info!(
            backend = %report.backend,
            rows = report.rows,
            r2 = report.metrics.r2,
            mape = report.metrics.mape,
            "training complete"
        );

        self.model = Some(model);
        Ok(report)
    }

    /// Forecast `horizon` days past the end of `series`
    pub fn predict(&self, series: &Series, horizon: usize) -> Result<Vec<ForecastPoint>> {
        let model = self.model.as_ref().ok_or(ForecastError::UntrainedModel)?;
        IterativeForecaster::new(&self.config).predict(model, &self.builder, series, horizon)
    }

    /// Forecast from a caller-supplied signed horizon
    ///
    /// A negative horizon is logged and yields an empty forecast.
    pub fn predict_days(&self, series: &Series, horizon: i64) -> Result<Vec<ForecastPoint>> {
        match usize::try_from(horizon) {
            Ok(days) => self.predict(series, days),
            Err(_) => {
                tracing::warn!(error = %ForecastError::InvalidHorizon(horizon), "returning empty forecast");
                Ok(Vec::new())
            }
        }
    }

    /// Spike detection at the configured threshold, independent of the fitted model
    pub fn detect_spikes(&self, series: &Series) -> Result<Vec<SpikeRecord>> {
        spikes::detect(series, self.config.spike_threshold)
    }

    /// Spike detection at an explicit threshold
    pub fn detect_spikes_with(&self, series: &Series, threshold: f64) -> Result<Vec<SpikeRecord>> {
        spikes::detect(series, threshold)
    }

    /// Per-row 7-day average, growth and anomaly flag at the configured threshold
    pub fn enrich(&self, series: &Series) -> Result<Vec<EnrichedPoint>> {
        transform::enrich(series, self.config.spike_threshold, self.config.zero_denominator)
    }

    /// Market penetration of the last value of `users`
    pub fn market_sizing(&self, users: &Series, tam: f64, sam: f64) -> Result<MarketSizing> {
        market::penetration(users, tam, sam, self.config.zero_denominator)
    }

    /// Train on all but the last `holdout_days` points, then forecast and score those
    pub fn backtest(&mut self, series: &Series, holdout_days: usize) -> Result<BacktestReport> {
        let (train, test) = train_test_split(series, holdout_days)?;
        let training = self.train(&train)?;
        let forecast = self.predict(&train, holdout_days)?;

        let predicted: Vec<f64> = forecast.iter().map(|p| p.predicted).collect();
        let actual = test.values().to_vec();
        let metrics = metrics::evaluate(&actual, &predicted, self.config.zero_denominator)?;

        tracing::info!(
            holdout = holdout_days,
            mape = metrics.mape,
            grade = %metrics.grade(),
            "backtest complete"
        );

        Ok(BacktestReport {
            training,
            forecast,
            actual,
            metrics,
        })
    }
}
