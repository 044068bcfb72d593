//! Daily metric series and the hand-off points around them
//!
//! A [`Series`] is an ordered run of `(date, value)` observations with
//! strictly increasing, unique dates. Ingestion ([`DataLoader`]) and the
//! warehouse hand-off ([`WarehouseSink`]) sit at the edges of the engine;
//! the core only ever sees a validated `Series`.

use crate::error::{ForecastError, Result};
use chrono::{Days, NaiveDate};
use polars::prelude::{self as pl, NamedFrom, SerReader};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Date format used for parsing and serialization
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimePoint {
    pub date: NaiveDate,
    pub value: f64,
}

impl TimePoint {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// Ordered daily series, stored column-wise
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl Series {
    /// Build a series from observations, rejecting empty or unordered input
    pub fn from_points(points: Vec<TimePoint>) -> Result<Self> {
        if points.is_empty() {
            return Err(ForecastError::DataError(
                "A series needs at least one observation".to_string(),
            ));
        }

        let mut series = Self {
            dates: Vec::with_capacity(points.len()),
            values: Vec::with_capacity(points.len()),
        };
        for point in points {
            series.push(point.date, point.value)?;
        }

        Ok(series)
    }

    /// Build a series of consecutive days starting at `start`
    pub fn from_values(start: NaiveDate, values: &[f64]) -> Result<Self> {
        let points = values
            .iter()
            .enumerate()
            .map(|(i, &value)| {
                start
                    .checked_add_days(Days::new(i as u64))
                    .map(|date| TimePoint::new(date, value))
                    .ok_or_else(|| ForecastError::DataError("Date out of range".to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        Self::from_points(points)
    }

    /// Append an observation; its date must be later than the last one
    pub fn push(&mut self, date: NaiveDate, value: f64) -> Result<()> {
        if let Some(last) = self.dates.last() {
            if date <= *last {
                return Err(ForecastError::DataError(format!(
                    "Dates must be strictly increasing: {} does not follow {}",
                    date, last
                )));
            }
        }

        self.dates.push(date);
        self.values.push(value);
        Ok(())
    }

    /// Get the length of the series
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the series is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Observation values in date order
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Observation dates in order
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Observation at `index`
    pub fn point(&self, index: usize) -> Option<TimePoint> {
        Some(TimePoint::new(*self.dates.get(index)?, *self.values.get(index)?))
    }

    /// Iterate over the observations
    pub fn points(&self) -> impl Iterator<Item = TimePoint> + '_ {
        self.dates
            .iter()
            .zip(self.values.iter())
            .map(|(&date, &value)| TimePoint::new(date, value))
    }

    /// Date of the last observation
    pub fn last_date(&self) -> Result<NaiveDate> {
        self.dates
            .last()
            .copied()
            .ok_or_else(|| ForecastError::DataError("Empty series".to_string()))
    }

    /// Get a slice of the series from start to end index
    pub fn slice(&self, start: usize, end: Option<usize>) -> Result<Self> {
        let end = end.unwrap_or(self.len());
        if start >= end || end > self.len() {
            return Err(ForecastError::DataError(format!(
                "Invalid slice {}..{} of a series with {} observations",
                start,
                end,
                self.len()
            )));
        }

        Ok(Self {
            dates: self.dates[start..end].to_vec(),
            values: self.values[start..end].to_vec(),
        })
    }

    /// Mean of the values
    pub fn mean(&self) -> Result<f64> {
        Ok(series_math::summary::mean(&self.values)?)
    }

    /// Sample standard deviation of the values
    pub fn std_dev(&self) -> Result<f64> {
        Ok(series_math::summary::sample_std(&self.values)?)
    }

    /// Convert to a two-column `date,value` data frame
    pub fn to_dataframe(&self) -> Result<pl::DataFrame> {
        let dates: Vec<String> = self
            .dates
            .iter()
            .map(|d| d.format(DATE_FORMAT).to_string())
            .collect();

        let df = pl::DataFrame::new(vec![
            pl::Series::new("date", dates),
            pl::Series::new("value", self.values.clone()),
        ])?;

        Ok(df)
    }
}

/// Treatment of empty value cells during ingestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingValues {
    /// Fail with `ForecastError::DataError`
    #[default]
    Reject,
    /// Carry the previous value forward; a gap in the first row still fails
    ForwardFill,
}

/// Data loader for daily metric series
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load a series from a CSV file, detecting the date and value columns
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Series> {
        Self::from_csv_column(path, None)
    }

    /// Load a series from a CSV file using a named value column
    pub fn from_csv_column<P: AsRef<Path>>(path: P, value_column: Option<&str>) -> Result<Series> {
        Self::from_csv_with(path, value_column, MissingValues::Reject)
    }

    /// Load a series from a CSV file with an explicit missing-value treatment
    pub fn from_csv_with<P: AsRef<Path>>(
        path: P,
        value_column: Option<&str>,
        missing: MissingValues,
    ) -> Result<Series> {
        let file = File::open(path)?;
        let df = pl::CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;

        Self::from_dataframe(&df, value_column, missing)
    }

    /// Build a series from an existing data frame
    pub fn from_dataframe(
        df: &pl::DataFrame,
        value_column: Option<&str>,
        missing: MissingValues,
    ) -> Result<Series> {
        let time_column = Self::detect_time_column(df)?;
        let value_column = match value_column {
            Some(name) => name.to_string(),
            None => Self::detect_value_column(df, &time_column)?,
        };

        let dates = Self::parse_dates(df.column(&time_column)?)?;
        let values = Self::parse_values(df.column(&value_column)?, missing)?;

        if dates.len() != values.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: dates.len(),
                got: values.len(),
            });
        }

        let points = dates
            .into_iter()
            .zip(values)
            .map(|(date, value)| TimePoint::new(date, value))
            .collect();

        Series::from_points(points)
    }

    /// Detect the time column in a DataFrame
    fn detect_time_column(df: &pl::DataFrame) -> Result<String> {
        for name in df.get_column_names() {
            let lower_name = name.to_lowercase();
            if lower_name.contains("date") || lower_name.contains("time") {
                return Ok(name.to_string());
            }
        }

        Err(ForecastError::DataError(
            "No date column found in data".to_string(),
        ))
    }

    /// First numeric column that is not the time column
    fn detect_value_column(df: &pl::DataFrame, time_column: &str) -> Result<String> {
        df.get_columns()
            .iter()
            .find(|col| col.name() != time_column && col.dtype().is_numeric())
            .map(|col| col.name().to_string())
            .ok_or_else(|| ForecastError::DataError("No numeric value column found".to_string()))
    }

    fn parse_dates(col: &pl::Series) -> Result<Vec<NaiveDate>> {
        let as_text = col.cast(&pl::DataType::Utf8)?;
        as_text
            .utf8()?
            .into_iter()
            .enumerate()
            .map(|(row, raw)| {
                let raw = raw.ok_or_else(|| {
                    ForecastError::DataError(format!("Missing date at row {}", row))
                })?;
                // Datetime columns render as "YYYY-MM-DD hh:mm:ss"
                let day = raw.get(..10).unwrap_or(raw);
                NaiveDate::parse_from_str(day, DATE_FORMAT).map_err(|e| {
                    ForecastError::DataError(format!("Bad date '{}' at row {}: {}", raw, row, e))
                })
            })
            .collect()
    }

    fn parse_values(col: &pl::Series, missing: MissingValues) -> Result<Vec<f64>> {
        let as_float = col.cast(&pl::DataType::Float64)?;
        let mut values = Vec::with_capacity(as_float.len());
        let mut filled = 0usize;

        for (row, value) in as_float.f64()?.into_iter().enumerate() {
            let value = match (value, missing, values.last()) {
                (Some(value), _, _) => value,
                (None, MissingValues::ForwardFill, Some(&previous)) => {
                    filled += 1;
                    previous
                }
                (None, _, _) => {
                    return Err(ForecastError::DataError(format!(
                        "Missing value in column '{}' at row {}",
                        col.name(),
                        row
                    )))
                }
            };
            values.push(value);
        }

        if filled > 0 {
            tracing::debug!(column = col.name(), filled, "forward-filled missing values");
        }
        Ok(values)
    }
}

/// What a warehouse load received
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadSummary {
    pub table: String,
    pub rows: usize,
    pub columns: Vec<String>,
    /// Earliest and latest value of the date column, if the table has one
    pub date_range: Option<(String, String)>,
}

impl LoadSummary {
    /// Describe `rows` as a load into `table_name`
    pub fn describe(table_name: &str, rows: &pl::DataFrame) -> Result<Self> {
        if table_name.trim().is_empty() {
            return Err(ForecastError::InvalidParameter(
                "Warehouse table name must not be empty".to_string(),
            ));
        }

        let date_column = rows.get_columns().iter().find(|col| {
            let name = col.name().to_lowercase();
            name.contains("date") || name.contains("time") || name.contains("period")
        });

        // ISO dates order the same as text
        let date_range = match date_column {
            Some(col) => {
                let text = col.cast(&pl::DataType::Utf8)?;
                let text = text.utf8()?;
                let first = text.into_iter().flatten().min().map(str::to_string);
                let last = text.into_iter().flatten().max().map(str::to_string);
                first.zip(last)
            }
            None => None,
        };

        Ok(Self {
            table: table_name.to_string(),
            rows: rows.height(),
            columns: rows
                .get_column_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
            date_range,
        })
    }
}

/// Destination for finalized tables
pub trait WarehouseSink {
    /// Load `rows` into `table_name`
    fn load(&mut self, table_name: &str, rows: &pl::DataFrame) -> Result<LoadSummary>;
}

/// Warehouse that keeps loaded tables in memory
#[derive(Debug, Default)]
pub struct InMemoryWarehouse {
    tables: BTreeMap<String, pl::DataFrame>,
}

impl InMemoryWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// A previously loaded table
    pub fn table(&self, name: &str) -> Option<&pl::DataFrame> {
        self.tables.get(name)
    }

    /// Names of all loaded tables
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }
}

impl WarehouseSink for InMemoryWarehouse {
    fn load(&mut self, table_name: &str, rows: &pl::DataFrame) -> Result<LoadSummary> {
        let summary = LoadSummary::describe(table_name, rows)?;
        self.tables.insert(table_name.to_string(), rows.clone());
        Ok(summary)
    }
}

/// Dry-run warehouse that only reports what would be loaded
#[derive(Debug, Default)]
pub struct LoggingWarehouse;

impl WarehouseSink for LoggingWarehouse {
    fn load(&mut self, table_name: &str, rows: &pl::DataFrame) -> Result<LoadSummary> {
        let summary = LoadSummary::describe(table_name, rows)?;
        tracing::info!(
            table = %summary.table,
            rows = summary.rows,
            columns = ?summary.columns,
            date_range = ?summary.date_range,
            "warehouse load (dry run)"
        );
        Ok(summary)
    }
}

/// Write serializable rows as CSV with a header line
pub fn write_csv<T: Serialize, W: Write>(writer: W, rows: &[T]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write serializable rows as a pretty-printed JSON array
pub fn write_json<T: Serialize, W: Write>(writer: W, rows: &[T]) -> Result<()> {
    serde_json::to_writer_pretty(writer, rows)?;
    Ok(())
}
