//! Feature construction from a single daily series
//!
//! Two paths share one fixed schema:
//!
//! - [`FeatureBuilder::build_all`] produces the aligned training table. Rows
//!   whose lag or rolling inputs would reach before the start of the series
//!   are dropped, so the first row sits at position [`MAX_LOOKBACK`].
//! - [`FeatureBuilder::build_step`] produces the vector for the day after the
//!   last observation. Lags and rolling windows end at the last known value;
//!   with short history they clamp to the earliest observation instead of
//!   failing (unless the strict history policy is configured).

use crate::config::{HistoryPolicy, ZeroDenominatorPolicy};
use crate::data::{Series, DATE_FORMAT};
use crate::error::{ForecastError, Result};
use crate::utils::checked_ratio;
use chrono::{Datelike, NaiveDate};
use polars::prelude::{self as pl, NamedFrom};
use series_math::summary;
use series_math::RollingWindow;

/// Feature names in input-vector order
pub const FEATURE_NAMES: [&str; 15] = [
    "day_of_week",
    "day_of_month",
    "month",
    "quarter",
    "lag_1",
    "lag_7",
    "lag_30",
    "rolling_mean_7",
    "rolling_std_7",
    "rolling_mean_30",
    "value_diff_1",
    "value_pct_change",
    "is_weekend",
    "is_month_start",
    "is_month_end",
];

/// Largest lookback any feature needs (`lag_30`)
pub const MAX_LOOKBACK: usize = 30;

const SHORT_WINDOW: usize = 7;
const LONG_WINDOW: usize = 30;

/// Ordered list of feature names defining the regression input layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureSchema {
    names: &'static [&'static str],
}

impl FeatureSchema {
    /// The engagement feature schema
    pub const fn standard() -> Self {
        Self {
            names: &FEATURE_NAMES,
        }
    }

    /// A schema over an arbitrary static name list
    pub const fn custom(names: &'static [&'static str]) -> Self {
        Self { names }
    }

    pub fn names(&self) -> &'static [&'static str] {
        self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Position of a feature in the input vector
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| *n == name)
    }

    pub(crate) fn owned_names(&self) -> Vec<String> {
        self.names.iter().map(|n| n.to_string()).collect()
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::standard()
    }
}

/// Feature values for one position, laid out by a schema
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    schema: FeatureSchema,
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn new(schema: FeatureSchema, values: Vec<f64>) -> Result<Self> {
        if values.len() != schema.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: schema.len(),
                got: values.len(),
            });
        }
        Ok(Self { schema, values })
    }

    pub fn schema(&self) -> FeatureSchema {
        self.schema
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Value of a named feature
    pub fn get(&self, name: &str) -> Option<f64> {
        self.schema.index_of(name).map(|i| self.values[i])
    }
}

/// Aligned training table: one feature row and one target per kept position
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    schema: FeatureSchema,
    dates: Vec<NaiveDate>,
    rows: Vec<Vec<f64>>,
    targets: Vec<f64>,
}

impl FeatureTable {
    pub fn schema(&self) -> FeatureSchema {
        self.schema
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Feature rows in schema order
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Observed value at each kept position
    pub fn targets(&self) -> &[f64] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row `index` as a feature vector
    pub fn vector(&self, index: usize) -> Option<FeatureVector> {
        self.rows.get(index).map(|values| FeatureVector {
            schema: self.schema,
            values: values.clone(),
        })
    }

    /// Convert to a data frame with `date`, one column per feature and `value`
    pub fn to_dataframe(&self) -> Result<pl::DataFrame> {
        let dates: Vec<String> = self
            .dates
            .iter()
            .map(|d| d.format(DATE_FORMAT).to_string())
            .collect();

        let mut columns = Vec::with_capacity(self.schema.len() + 2);
        columns.push(pl::Series::new("date", dates));
        for (j, name) in self.schema.names().iter().enumerate() {
            let column: Vec<f64> = self.rows.iter().map(|row| row[j]).collect();
            columns.push(pl::Series::new(name, column));
        }
        columns.push(pl::Series::new("value", self.targets.clone()));

        Ok(pl::DataFrame::new(columns)?)
    }
}

/// Derives calendar, lag, rolling and trend features from a series
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureBuilder {
    zero_denominator: ZeroDenominatorPolicy,
    history: HistoryPolicy,
}

impl FeatureBuilder {
    pub fn new(zero_denominator: ZeroDenominatorPolicy, history: HistoryPolicy) -> Self {
        Self {
            zero_denominator,
            history,
        }
    }

    pub fn schema(&self) -> FeatureSchema {
        FeatureSchema::standard()
    }

    pub fn zero_denominator(&self) -> ZeroDenominatorPolicy {
        self.zero_denominator
    }

    pub fn history(&self) -> HistoryPolicy {
        self.history
    }

    /// Full aligned table; rows before position `MAX_LOOKBACK` are dropped
    pub fn build_all(&self, series: &Series) -> Result<FeatureTable> {
        let values = series.values();
        let dates = series.dates();
        let kept = values.len().saturating_sub(MAX_LOOKBACK);

        let mut table = FeatureTable {
            schema: self.schema(),
            dates: Vec::with_capacity(kept),
            rows: Vec::with_capacity(kept),
            targets: Vec::with_capacity(kept),
        };

        let mut short = RollingWindow::new(SHORT_WINDOW)?;
        let mut long = RollingWindow::new(LONG_WINDOW)?;

        for (i, (&date, &value)) in dates.iter().zip(values).enumerate() {
            short.update(value);
            long.update(value);
            if i < MAX_LOOKBACK {
                continue;
            }

            let previous = values[i - 1];
            let row = self.assemble(
                date,
                Lags {
                    lag_1: previous,
                    lag_7: values[i - 7],
                    lag_30: values[i - 30],
                },
                Rolling {
                    mean_7: short.mean()?,
                    std_7: short.sample_std()?,
                    mean_30: long.mean()?,
                },
                value,
                previous,
            )?;

            table.dates.push(date);
            table.rows.push(row);
            table.targets.push(value);
        }

        tracing::debug!(
            observations = values.len(),
            rows = table.len(),
            "built feature table"
        );

        Ok(table)
    }

    /// Full-table row for position `index`
    pub fn build_at(&self, series: &Series, index: usize) -> Result<FeatureVector> {
        let values = series.values();
        if index >= values.len() {
            return Err(ForecastError::DataError(format!(
                "Position {} is outside a series of {} observations",
                index,
                values.len()
            )));
        }
        if index < MAX_LOOKBACK {
            return Err(ForecastError::InsufficientHistory {
                needed: MAX_LOOKBACK + 1,
                got: index + 1,
            });
        }

        let short = &values[index + 1 - SHORT_WINDOW..=index];
        let long = &values[index + 1 - LONG_WINDOW..=index];
        let row = self.assemble(
            series.dates()[index],
            Lags {
                lag_1: values[index - 1],
                lag_7: values[index - 7],
                lag_30: values[index - 30],
            },
            Rolling {
                mean_7: summary::mean(short)?,
                std_7: summary::sample_std(short)?,
                mean_30: summary::mean(long)?,
            },
            values[index],
            values[index - 1],
        )?;

        FeatureVector::new(self.schema(), row)
    }

    /// Vector for `date`, the position right after the last observation
    pub fn build_step(&self, series: &Series, date: NaiveDate) -> Result<FeatureVector> {
        let values = series.values();
        let n = values.len();
        if n == 0 {
            return Err(ForecastError::InsufficientHistory { needed: 1, got: 0 });
        }
        if self.history == HistoryPolicy::Strict && n < MAX_LOOKBACK {
            return Err(ForecastError::InsufficientHistory {
                needed: MAX_LOOKBACK,
                got: n,
            });
        }

        // Clamp to the earliest observation when history is short
        let back = |k: usize| values[n.saturating_sub(k)];
        let trailing = |w: usize| &values[n.saturating_sub(w)..];

        let last = values[n - 1];
        let previous = back(2);
        let short = trailing(SHORT_WINDOW);

        let row = self.assemble(
            date,
            Lags {
                lag_1: last,
                lag_7: back(7),
                lag_30: back(30),
            },
            Rolling {
                mean_7: summary::mean(short)?,
                std_7: summary::sample_std_or_zero(short),
                mean_30: summary::mean(trailing(LONG_WINDOW))?,
            },
            last,
            previous,
        )?;

        FeatureVector::new(self.schema(), row)
    }

    fn assemble(
        &self,
        date: NaiveDate,
        lags: Lags,
        rolling: Rolling,
        current: f64,
        previous: f64,
    ) -> Result<Vec<f64>> {
        let calendar = Calendar::of(date);
        let pct_change = checked_ratio(current - previous, previous, self.zero_denominator)
            .map_err(|_| {
                ForecastError::DivisionByZero(format!(
                    "value_pct_change for {}: previous value is zero",
                    date
                ))
            })?;

        Ok(vec![
            calendar.day_of_week,
            calendar.day_of_month,
            calendar.month,
            calendar.quarter,
            lags.lag_1,
            lags.lag_7,
            lags.lag_30,
            rolling.mean_7,
            rolling.std_7,
            rolling.mean_30,
            current - previous,
            pct_change,
            flag(calendar.day_of_week >= 5.0),
            flag(calendar.day_of_month <= 7.0),
            flag(calendar.day_of_month >= 24.0),
        ])
    }
}

struct Lags {
    lag_1: f64,
    lag_7: f64,
    lag_30: f64,
}

struct Rolling {
    mean_7: f64,
    std_7: f64,
    mean_30: f64,
}

struct Calendar {
    day_of_week: f64,
    day_of_month: f64,
    month: f64,
    quarter: f64,
}

impl Calendar {
    fn of(date: NaiveDate) -> Self {
        let month = date.month();
        Self {
            // Monday = 0
            day_of_week: f64::from(date.weekday().num_days_from_monday()),
            day_of_month: f64::from(date.day()),
            month: f64::from(month),
            quarter: f64::from((month - 1) / 3 + 1),
        }
    }
}

fn flag(condition: bool) -> f64 {
    if condition {
        1.0
    } else {
        0.0
    }
}
