//! Calendar rollups and period-over-period growth

use crate::config::ZeroDenominatorPolicy;
use crate::data::{Series, DATE_FORMAT};
use crate::error::{ForecastError, Result};
use crate::utils::checked_ratio;
use chrono::{Datelike, Days, NaiveDate};
use polars::prelude::{self as pl, NamedFrom};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Rollup period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    /// Monday to Sunday, labelled by the Sunday
    Week,
    /// Calendar month, labelled by its last day
    Month,
}

impl Period {
    /// Label of the period containing `date`
    pub fn end_of(&self, date: NaiveDate) -> Result<NaiveDate> {
        let end = match self {
            Period::Week => {
                let to_sunday = 6 - date.weekday().num_days_from_monday();
                date.checked_add_days(Days::new(u64::from(to_sunday)))
            }
            Period::Month => {
                let (year, month) = if date.month() == 12 {
                    (date.year() + 1, 1)
                } else {
                    (date.year(), date.month() + 1)
                };
                NaiveDate::from_ymd_opt(year, month, 1).and_then(|first| first.pred_opt())
            }
        };

        end.ok_or_else(|| ForecastError::DataError(format!("No {} ends after {}", self, date)))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Week => write!(f, "week"),
            Period::Month => write!(f, "month"),
        }
    }
}

impl FromStr for Period {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "week" | "weekly" | "w" => Ok(Period::Week),
            "month" | "monthly" | "m" => Ok(Period::Month),
            _ => Err(ForecastError::InvalidParameter(format!(
                "Unknown period '{}', expected week or month",
                s
            ))),
        }
    }
}

/// How values within a period are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    Mean,
    Sum,
}

/// One rolled-up period
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregateRow {
    pub period_end: NaiveDate,
    pub value: f64,
    /// Observations that fell in the period
    pub count: usize,
}

/// Roll a daily series up to weeks or months
///
/// Periods without observations are skipped. Rows are in chronological order.
pub fn aggregate(series: &Series, period: Period, how: Aggregation) -> Result<Vec<AggregateRow>> {
    let mut rows: Vec<AggregateRow> = Vec::new();

    for point in series.points() {
        let end = period.end_of(point.date)?;
        match rows.last_mut() {
            Some(row) if row.period_end == end => {
                row.value += point.value;
                row.count += 1;
            }
            _ => rows.push(AggregateRow {
                period_end: end,
                value: point.value,
                count: 1,
            }),
        }
    }

    if how == Aggregation::Mean {
        for row in &mut rows {
            row.value /= row.count as f64;
        }
    }

    tracing::debug!(%period, ?how, periods = rows.len(), "aggregated series");
    Ok(rows)
}

/// Rows as a `period_end,value,count` data frame
pub fn to_dataframe(rows: &[AggregateRow]) -> Result<pl::DataFrame> {
    let ends: Vec<String> = rows
        .iter()
        .map(|r| r.period_end.format(DATE_FORMAT).to_string())
        .collect();
    let values: Vec<f64> = rows.iter().map(|r| r.value).collect();
    let counts: Vec<u64> = rows.iter().map(|r| r.count as u64).collect();

    let df = pl::DataFrame::new(vec![
        pl::Series::new("period_end", ends),
        pl::Series::new("value", values),
        pl::Series::new("count", counts),
    ])?;

    Ok(df)
}

/// Percent change of the last value against the value `lag` observations earlier
pub fn growth_rate(series: &Series, lag: usize, policy: ZeroDenominatorPolicy) -> Result<f64> {
    if lag == 0 {
        return Err(ForecastError::InvalidParameter(
            "Growth lag must be positive".to_string(),
        ));
    }
    let values = series.values();
    if values.len() <= lag {
        return Err(ForecastError::InsufficientHistory {
            needed: lag + 1,
            got: values.len(),
        });
    }

    let current = values[values.len() - 1];
    let base = values[values.len() - 1 - lag];
    let ratio = checked_ratio(current - base, base, policy).map_err(|_| {
        ForecastError::DivisionByZero(format!(
            "growth over {} observations: base value is zero",
            lag
        ))
    })?;

    Ok(ratio * 100.0)
}
