use chrono::NaiveDate;
use metricast::config::{HistoryPolicy, ZeroDenominatorPolicy};
use metricast::features::MAX_LOOKBACK;
use metricast::models::Backend;
use metricast::{BackendConfig, FeatureBuilder, FittedModel, ForecastError, Series};
use rstest::rstest;

fn series_from(values: &[f64]) -> Series {
    Series::from_values(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(), values).unwrap()
}

fn seasonal(n: usize) -> Series {
    let values: Vec<f64> = (0..n)
        .map(|i| 5000.0 + 12.0 * i as f64 + 300.0 * ((i % 7) as f64 - 3.0))
        .collect();
    series_from(&values)
}

#[rstest]
#[case(30)]
#[case(31)]
#[case(45)]
#[case(365)]
fn test_table_length_drops_lookback(#[case] n: usize) {
    let table = FeatureBuilder::default().build_all(&seasonal(n)).unwrap();
    assert_eq!(table.len(), n - MAX_LOOKBACK);
    assert_eq!(table.targets().len(), table.len());
    assert_eq!(table.dates().len(), table.len());
}

#[test]
fn test_constant_window_has_zero_std() {
    let table = FeatureBuilder::default().build_all(&series_from(&[42.0; 50])).unwrap();
    for i in 0..table.len() {
        let row = table.vector(i).unwrap();
        assert_eq!(row.get("rolling_std_7"), Some(0.0));
        assert_eq!(row.get("value_pct_change"), Some(0.0));
    }
}

#[test]
fn test_weekend_flag_two_in_seven() {
    let table = FeatureBuilder::default().build_all(&seasonal(100)).unwrap();
    let weekend = table.schema().index_of("is_weekend").unwrap();

    for start in 0..table.len() - 7 {
        let count: f64 = table.rows()[start..start + 7]
            .iter()
            .map(|row| row[weekend])
            .sum();
        assert_eq!(count, 2.0, "window starting at row {}", start);
    }
}

#[test]
fn test_zero_followed_by_nonzero_fails_by_default() {
    let mut values = vec![10.0; 40];
    values[35] = 0.0;
    values[36] = 8.0;

    let result = FeatureBuilder::default().build_all(&series_from(&values));
    match result {
        Err(ForecastError::DivisionByZero(message)) => {
            assert!(message.contains("value_pct_change"))
        }
        other => panic!("expected DivisionByZero, got {:?}", other),
    }
}

#[test]
fn test_zero_followed_by_nonzero_sentinel_never_reaches_model() {
    let mut values = vec![10.0; 40];
    values[35] = 0.0;
    values[36] = 8.0;

    let builder = FeatureBuilder::new(ZeroDenominatorPolicy::Sentinel, HistoryPolicy::Clamp);
    let table = builder.build_all(&series_from(&values)).unwrap();

    // Row for position 36 carries the sentinel
    let row = table.vector(36 - MAX_LOOKBACK).unwrap();
    assert_eq!(row.get("value_pct_change"), Some(f64::INFINITY));
    assert_eq!(row.get("value_diff_1"), Some(8.0));

    let backend = Backend::from_config(&BackendConfig::Linear).unwrap();
    match FittedModel::train(&backend, &table) {
        Err(ForecastError::NonFiniteFeature { feature, row }) => {
            assert_eq!(feature, "value_pct_change");
            assert_eq!(row, 36 - MAX_LOOKBACK);
        }
        other => panic!("expected NonFiniteFeature, got {:?}", other),
    }
}

#[test]
fn test_step_vector_clamps_short_history() {
    let series = series_from(&[5.0, 6.0, 8.0]);
    let date = NaiveDate::from_ymd_opt(2024, 2, 4).unwrap();
    let vector = FeatureBuilder::default().build_step(&series, date).unwrap();

    assert_eq!(vector.get("lag_1"), Some(8.0));
    assert_eq!(vector.get("lag_7"), Some(5.0));
    assert_eq!(vector.get("lag_30"), Some(5.0));
    assert_eq!(vector.get("value_diff_1"), Some(2.0));

    let strict = FeatureBuilder::new(ZeroDenominatorPolicy::Fail, HistoryPolicy::Strict);
    assert!(matches!(
        strict.build_step(&series, date),
        Err(ForecastError::InsufficientHistory { needed: 30, got: 3 })
    ));
}

#[test]
fn test_feature_table_dataframe() {
    let table = FeatureBuilder::default().build_all(&seasonal(40)).unwrap();
    let df = table.to_dataframe().unwrap();
    assert_eq!(df.height(), 10);
    assert!(df.get_column_names().contains(&"rolling_mean_30"));
}
