use chrono::NaiveDate;
use metricast::aggregate::{self, Aggregation, Period};
use metricast::data::{
    write_csv, write_json, DataLoader, InMemoryWarehouse, LoggingWarehouse, MissingValues,
    WarehouseSink,
};
use metricast::{ForecastError, Series, TimePoint};
use std::io::Write;
use tempfile::NamedTempFile;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_data_loader_from_csv() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "date,dau,sessions").unwrap();
    writeln!(file, "2024-01-01,52000,150000").unwrap();
    writeln!(file, "2024-01-02,53100,151200").unwrap();
    writeln!(file, "2024-01-03,51800,149900").unwrap();

    let series = DataLoader::from_csv(file.path()).unwrap();
    assert_eq!(series.len(), 3);
    assert_eq!(series.values(), &[52000.0, 53100.0, 51800.0]);
    assert_eq!(series.last_date().unwrap(), date(2024, 1, 3));

    let sessions = DataLoader::from_csv_column(file.path(), Some("sessions")).unwrap();
    assert_eq!(sessions.values()[1], 151200.0);
}

#[test]
fn test_empty_cell_is_rejected_or_carried_forward() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "date,dau").unwrap();
    writeln!(file, "2024-01-01,52000").unwrap();
    writeln!(file, "2024-01-02,").unwrap();
    writeln!(file, "2024-01-03,51800").unwrap();

    assert!(matches!(
        DataLoader::from_csv(file.path()),
        Err(ForecastError::DataError(_))
    ));

    let series = DataLoader::from_csv_with(file.path(), None, MissingValues::ForwardFill).unwrap();
    assert_eq!(series.values(), &[52000.0, 52000.0, 51800.0]);
}

#[test]
fn test_data_loader_rejects_unordered_dates() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "date,value").unwrap();
    writeln!(file, "2024-01-02,1.0").unwrap();
    writeln!(file, "2024-01-01,2.0").unwrap();

    assert!(matches!(
        DataLoader::from_csv(file.path()),
        Err(ForecastError::DataError(_))
    ));
}

#[test]
fn test_data_loader_missing_file() {
    assert!(DataLoader::from_csv("/nonexistent/metrics.csv").is_err());
}

#[test]
fn test_series_rejects_duplicates() {
    let result = Series::from_points(vec![
        TimePoint::new(date(2024, 1, 1), 1.0),
        TimePoint::new(date(2024, 1, 1), 2.0),
    ]);
    assert!(result.is_err());
    assert!(Series::from_points(Vec::new()).is_err());
}

#[test]
fn test_warehouse_hand_off() {
    let series = Series::from_values(date(2024, 1, 1), &[1.0, 2.0, 3.0]).unwrap();
    let frame = series.to_dataframe().unwrap();

    let mut warehouse = InMemoryWarehouse::new();
    let stored = warehouse.load("daily_dau", &frame).unwrap();
    assert_eq!(warehouse.table_names(), vec!["daily_dau"]);
    assert_eq!(warehouse.table("daily_dau").unwrap().height(), 3);

    let mut dry_run = LoggingWarehouse;
    let reported = dry_run.load("daily_dau", &frame).unwrap();
    assert_eq!(reported, stored);
    assert_eq!(reported.rows, 3);
    assert_eq!(reported.columns, vec!["date".to_string(), "value".to_string()]);
    assert_eq!(
        reported.date_range,
        Some(("2024-01-01".to_string(), "2024-01-03".to_string()))
    );

    assert!(matches!(
        dry_run.load("", &frame),
        Err(ForecastError::InvalidParameter(_))
    ));
}

#[test]
fn test_rollup_load_reports_period_range() {
    let values: Vec<f64> = (0..20).map(f64::from).collect();
    let series = Series::from_values(date(2024, 1, 1), &values).unwrap();
    let rows = aggregate::aggregate(&series, Period::Week, Aggregation::Sum).unwrap();
    let frame = aggregate::to_dataframe(&rows).unwrap();

    let summary = LoggingWarehouse.load("weekly_dau", &frame).unwrap();
    assert_eq!(summary.rows, 3);
    assert_eq!(
        summary.date_range,
        Some(("2024-01-07".to_string(), "2024-01-21".to_string()))
    );
}

#[test]
fn test_export_csv_and_json() {
    let points: Vec<TimePoint> = Series::from_values(date(2024, 1, 30), &[5.0, 6.0])
        .unwrap()
        .points()
        .collect();

    let mut csv_out = Vec::new();
    write_csv(&mut csv_out, &points).unwrap();
    let text = String::from_utf8(csv_out).unwrap();
    assert_eq!(text, "date,value\n2024-01-30,5.0\n2024-01-31,6.0\n");

    let mut json_out = Vec::new();
    write_json(&mut json_out, &points).unwrap();
    let parsed: Vec<TimePoint> = serde_json::from_slice(&json_out).unwrap();
    assert_eq!(parsed, points);
}
