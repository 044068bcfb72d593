//! Recursive multi-step forecasting
//!
//! Each step featurizes the forecast date from a working copy of the
//! history, predicts, and appends the prediction to that copy, so later
//! steps see earlier predictions through their lag and rolling features.
//! Errors compound with the horizon on purpose; no step is ever revisited.

use crate::config::ForecastConfig;
use crate::data::Series;
use crate::error::Result;
use crate::features::{FeatureBuilder, MAX_LOOKBACK};
use crate::models::FittedModel;
use crate::utils::future_dates;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use series_math::summary;

/// Upper bound on the up-front allocation of a forecast
const MAX_PREALLOCATED: usize = 366;

/// One forecasted day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub predicted: f64,
    pub lower: f64,
    pub upper: f64,
    /// Heuristic score in [0, 1], decaying linearly with the horizon
    pub confidence: f64,
}

/// Drives the fitted model one day at a time
#[derive(Debug, Clone)]
pub struct IterativeForecaster {
    band_width: f64,
    confidence_start: f64,
    confidence_decay: f64,
}

impl IterativeForecaster {
    pub fn new(config: &ForecastConfig) -> Self {
        Self {
            band_width: config.band_width,
            confidence_start: config.confidence_start,
            confidence_decay: config.confidence_decay,
        }
    }

    /// Forecast `horizon` days after the last observation of `history`
    ///
    /// The whole forecast fails if any step fails; a partial sequence is
    /// never returned. A zero horizon yields an empty forecast.
    pub fn predict(
        &self,
        model: &FittedModel,
        builder: &FeatureBuilder,
        history: &Series,
        horizon: usize,
    ) -> Result<Vec<ForecastPoint>> {
        if horizon == 0 {
            return Ok(Vec::new());
        }

        let last_date = history.last_date()?;
        if history.len() < MAX_LOOKBACK {
            tracing::warn!(
                observations = history.len(),
                needed = MAX_LOOKBACK,
                policy = ?builder.history(),
                "short history, lag and rolling features fall back to the earliest value"
            );
        }

        let dates = future_dates(last_date, horizon)?;
        let mut working = history.clone();
        let mut forecast = Vec::with_capacity(horizon.min(MAX_PREALLOCATED));

        for (index, date) in dates.enumerate() {
            let step = index + 1;
            let features = builder.build_step(&working, date)?;
            let predicted = model.predict(&features)?;

            // Band from the history as it stands before this step is appended
            let spread = self.band_width * summary::sample_std_or_zero(working.values());
            let confidence = self.confidence(step, horizon);

            tracing::debug!(%date, step, predicted, spread, confidence, "forecast step");

            forecast.push(ForecastPoint {
                date,
                predicted,
                lower: predicted - spread,
                upper: predicted + spread,
                confidence,
            });
            working.push(date, predicted)?;
        }

        tracing::info!(
            backend = model.name(),
            horizon,
            first = %forecast[0].date,
            last = %forecast[horizon - 1].date,
            "forecast complete"
        );

        Ok(forecast)
    }

    /// Confidence of step `step` (1-based) out of `horizon`
    pub fn confidence(&self, step: usize, horizon: usize) -> f64 {
        self.confidence_start - (step as f64 / horizon as f64) * self.confidence_decay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use crate::models::Backend;
    use approx::assert_relative_eq;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn trained(values: &[f64]) -> (FittedModel, FeatureBuilder, Series) {
        let series = Series::from_values(start(), values).unwrap();
        let builder = FeatureBuilder::default();
        let table = builder.build_all(&series).unwrap();
        let backend = Backend::from_config(&BackendConfig::default()).unwrap();
        let model = FittedModel::train(&backend, &table).unwrap();
        (model, builder, series)
    }

    #[test]
    fn test_zero_horizon_is_empty() {
        let values: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let (model, builder, series) = trained(&values);
        let forecaster = IterativeForecaster::new(&ForecastConfig::default());
        assert!(forecaster.predict(&model, &builder, &series, 0).unwrap().is_empty());
    }

    #[test]
    fn test_horizon_past_calendar_end_fails() {
        let values: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let (model, builder, series) = trained(&values);
        let forecaster = IterativeForecaster::new(&ForecastConfig::default());

        for horizon in [usize::MAX, i64::MAX as usize, (1u64 << 34) as usize] {
            let result = forecaster.predict(&model, &builder, &series, horizon);
            assert!(matches!(result, Err(crate::error::ForecastError::DataError(_))));
        }
    }

    #[test]
    fn test_dates_follow_history() {
        let values: Vec<f64> = (0..45).map(|i| 100.0 + (i % 7) as f64).collect();
        let (model, builder, series) = trained(&values);
        let forecaster = IterativeForecaster::new(&ForecastConfig::default());
        let forecast = forecaster.predict(&model, &builder, &series, 5).unwrap();

        assert_eq!(forecast.len(), 5);
        let mut expected = series.last_date().unwrap();
        for point in &forecast {
            expected = expected.succ_opt().unwrap();
            assert_eq!(point.date, expected);
        }
    }

    #[test]
    fn test_band_uses_history_before_append() {
        let values: Vec<f64> = (0..40).map(|i| 50.0 + 2.0 * i as f64).collect();
        let (model, builder, series) = trained(&values);
        let forecaster = IterativeForecaster::new(&ForecastConfig::default());
        let forecast = forecaster.predict(&model, &builder, &series, 2).unwrap();

        let first_std = summary::sample_std(series.values()).unwrap();
        assert_relative_eq!(forecast[0].upper - forecast[0].predicted, 2.0 * first_std, epsilon = 1e-9);
        assert_relative_eq!(forecast[0].predicted - forecast[0].lower, 2.0 * first_std, epsilon = 1e-9);

        let mut extended = values.clone();
        extended.push(forecast[0].predicted);
        let second_std = summary::sample_std(&extended).unwrap();
        assert_relative_eq!(forecast[1].upper - forecast[1].predicted, 2.0 * second_std, epsilon = 1e-9);
    }

    #[test]
    fn test_confidence_schedule() {
        let forecaster = IterativeForecaster::new(&ForecastConfig::default());
        assert_relative_eq!(forecaster.confidence(1, 4), 0.90, epsilon = 1e-12);
        assert_relative_eq!(forecaster.confidence(4, 4), 0.75, epsilon = 1e-12);
        assert_relative_eq!(forecaster.confidence(1, 1), 0.75, epsilon = 1e-12);
    }
}
