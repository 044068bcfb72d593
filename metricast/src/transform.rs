//! Row-level enrichment of a daily series
//!
//! Adds the columns an analytics table carries next to the raw metric:
//! a trailing 7-day average, day-over-day growth in percent, the z-score
//! against the whole series and an anomaly flag.

use crate::config::ZeroDenominatorPolicy;
use crate::data::Series;
use crate::error::Result;
use crate::spikes;
use crate::utils::checked_ratio;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use series_math::{summary, MathError, RollingWindow};

/// Trailing window of the rolling average column
pub const AVERAGE_WINDOW: usize = 7;

/// One observation with its derived columns
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnrichedPoint {
    pub date: NaiveDate,
    pub value: f64,
    /// Mean of the last seven values, once seven are available
    pub rolling_avg_7: Option<f64>,
    /// Percent change from the previous value
    pub growth: Option<f64>,
    /// Undefined for a single observation or a constant series
    pub z_score: Option<f64>,
    pub is_anomaly: bool,
}

/// Enrich every observation of `series`
///
/// A point is anomalous when `|z| > anomaly_threshold`. A zero previous value
/// in the growth column follows `policy`.
pub fn enrich(
    series: &Series,
    anomaly_threshold: f64,
    policy: ZeroDenominatorPolicy,
) -> Result<Vec<EnrichedPoint>> {
    spikes::check_threshold(anomaly_threshold)?;

    let values = series.values();
    let scores: Vec<Option<f64>> = match summary::z_scores(values) {
        Ok(scores) => scores.into_iter().map(Some).collect(),
        Err(MathError::CalculationError(_)) | Err(MathError::InsufficientData(_)) => {
            vec![None; values.len()]
        }
        Err(e) => return Err(e.into()),
    };

    let mut window = RollingWindow::new(AVERAGE_WINDOW)?;
    let mut rows = Vec::with_capacity(values.len());

    for (i, (point, z_score)) in series.points().zip(scores).enumerate() {
        window.update(point.value);
        let rolling_avg_7 = if window.is_full() {
            Some(window.mean()?)
        } else {
            None
        };

        let growth = match i.checked_sub(1).map(|prev| values[prev]) {
            Some(previous) => Some(checked_ratio(point.value - previous, previous, policy)? * 100.0),
            None => None,
        };

        rows.push(EnrichedPoint {
            date: point.date,
            value: point.value,
            rolling_avg_7,
            growth,
            z_score,
            is_anomaly: z_score.map_or(false, |z| z.abs() > anomaly_threshold),
        });
    }

    tracing::debug!(
        rows = rows.len(),
        anomalies = rows.iter().filter(|r| r.is_anomaly).count(),
        "enriched series"
    );
    Ok(rows)
}
