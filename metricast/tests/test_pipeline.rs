use chrono::NaiveDate;
use metricast::utils::synthetic_series;
use metricast::{BackendConfig, EngagementForecaster, ForecastConfig, ForecastError};

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
}

#[test]
fn test_end_to_end() {
    let series = synthetic_series(start(), 365, 55_000.0, 10.0, 800.0, 2024).unwrap();
    let mut forecaster = EngagementForecaster::new(ForecastConfig::default()).unwrap();

    let report = forecaster.train(&series).unwrap();
    assert_eq!(report.backend, "ridge");
    assert_eq!(report.rows, 335);
    assert!(report.metrics.r2 > 0.5);

    let forecast = forecaster.predict(&series, 90).unwrap();
    assert_eq!(forecast.len(), 90);
    assert_eq!(forecast[0].date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    assert!(forecast.iter().all(|p| p.predicted.is_finite()));

    let spikes = forecaster.detect_spikes(&series).unwrap();
    assert!(spikes.iter().all(|s| s.magnitude > 2.0));
}

#[test]
fn test_untrained_model() {
    let series = synthetic_series(start(), 40, 100.0, 1.0, 1.0, 1).unwrap();
    let forecaster = EngagementForecaster::new(ForecastConfig::default()).unwrap();
    assert!(matches!(
        forecaster.predict(&series, 5),
        Err(ForecastError::UntrainedModel)
    ));
    assert!(forecaster.model().is_none());
}

#[test]
fn test_backtest_holdout() {
    let series = synthetic_series(start(), 120, 20_000.0, 15.0, 150.0, 5).unwrap();
    let mut forecaster =
        EngagementForecaster::new(ForecastConfig::with_backend(BackendConfig::Linear)).unwrap();

    let report = forecaster.backtest(&series, 14).unwrap();
    assert_eq!(report.forecast.len(), 14);
    assert_eq!(report.actual, series.values()[106..].to_vec());
    assert_eq!(report.metrics.n, 14);
    assert_eq!(report.training.rows, 76);
    assert!(report.metrics.mape.is_finite());
    assert_eq!(report.forecast[0].date, series.dates()[106]);
}

#[test]
fn test_backtest_rejects_oversized_holdout() {
    let series = synthetic_series(start(), 50, 100.0, 1.0, 1.0, 1).unwrap();
    let mut forecaster = EngagementForecaster::new(ForecastConfig::default()).unwrap();
    assert!(forecaster.backtest(&series, 50).is_err());
}
