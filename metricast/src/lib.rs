//! # Metricast
//!
//! Short-horizon forecasting and spike detection for daily engagement metrics
//! (daily active users, sessions, revenue).
//!
//! ## Features
//!
//! - Fifteen calendar, lag, rolling and trend features derived from a single series
//! - Linear, ridge and bagged-tree regression backends on standardized features
//! - Recursive multi-step forecasts with confidence bands and a decaying confidence score
//! - Z-score spike detection
//! - MAE, RMSE, R², MAPE and accuracy grades, including holdout backtests
//! - Weekly and monthly rollups, CSV ingestion and warehouse hand-off
//! - Row enrichment (7-day average, growth, anomaly flag) and market penetration
//!
//! ## Policies
//!
//! Edge cases are resolved by policies chosen once in [`ForecastConfig`]:
//!
//! - [`ZeroDenominatorPolicy`]: a zero previous value in `value_pct_change`
//!   (or a zero actual value in MAPE) either fails with
//!   [`ForecastError::DivisionByZero`] or yields an IEEE sentinel.
//!   Non-finite features are always rejected before they reach a model.
//! - [`HistoryPolicy`]: with fewer than 30 observations, forecast-step
//!   features either clamp to the earliest value or fail with
//!   [`ForecastError::InsufficientHistory`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use metricast::{DataLoader, EngagementForecaster, ForecastConfig};
//!
//! # fn main() -> metricast::Result<()> {
//! // Load data
//! let series = DataLoader::from_csv("dau.csv")?;
//!
//! // Train with the default ridge backend
//! let mut forecaster = EngagementForecaster::new(ForecastConfig::default())?;
//! let report = forecaster.train(&series)?;
//! println!("{}", report.metrics);
//!
//! // Forecast two weeks ahead
//! for point in forecaster.predict(&series, 14)? {
//!     println!("{} {:.0} [{:.0}, {:.0}]", point.date, point.predicted, point.lower, point.upper);
//! }
//!
//! // Flag unusual days
//! let spikes = forecaster.detect_spikes(&series)?;
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod config;
pub mod data;
pub mod error;
pub mod features;
pub mod forecaster;
pub mod market;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod scaling;
pub mod spikes;
pub mod transform;
pub mod utils;

// Re-export commonly used types
pub use crate::aggregate::{aggregate, AggregateRow, Aggregation, Period};
pub use crate::config::{BackendConfig, ForecastConfig, HistoryPolicy, ZeroDenominatorPolicy};
pub use crate::data::{
    DataLoader, InMemoryWarehouse, LoadSummary, LoggingWarehouse, MissingValues, Series, TimePoint,
    WarehouseSink,
};
pub use crate::error::{ForecastError, Result};
pub use crate::features::{FeatureBuilder, FeatureSchema, FeatureTable, FeatureVector};
pub use crate::forecaster::{ForecastPoint, IterativeForecaster};
pub use crate::market::MarketSizing;
pub use crate::metrics::{evaluate, AccuracyGrade, EvaluationMetrics};
pub use crate::models::{Backend, FittedModel};
pub use crate::pipeline::{BacktestReport, EngagementForecaster, TrainingReport};
pub use crate::spikes::SpikeRecord;
pub use crate::transform::EnrichedPoint;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
