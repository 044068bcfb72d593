//! Z-score spike detection
//!
//! Statistics are computed once over the whole series (mean, sample
//! standard deviation); every point whose absolute z-score exceeds the
//! threshold is reported, in chronological order.

use crate::data::Series;
use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use series_math::{summary, MathError};

/// Default absolute z-score threshold
pub const DEFAULT_THRESHOLD: f64 = 2.0;

/// A flagged observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpikeRecord {
    pub date: NaiveDate,
    pub value: f64,
    pub z_score: f64,
    /// Absolute z-score
    pub magnitude: f64,
}

impl SpikeRecord {
    /// True for spikes above the mean
    pub fn is_surge(&self) -> bool {
        self.z_score > 0.0
    }
}

/// Flag points with `|z| > threshold`
///
/// A constant series has no spikes. A single observation has no defined
/// sample standard deviation and is reported as insufficient history.
pub fn detect(series: &Series, threshold: f64) -> Result<Vec<SpikeRecord>> {
    check_threshold(threshold)?;
    if series.len() < 2 {
        return Err(ForecastError::InsufficientHistory {
            needed: 2,
            got: series.len(),
        });
    }

    let scores = match summary::z_scores(series.values()) {
        Ok(scores) => scores,
        Err(MathError::CalculationError(_)) => {
            tracing::debug!(observations = series.len(), "constant series, no spikes");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let spikes: Vec<SpikeRecord> = series
        .points()
        .zip(scores)
        .filter(|(_, z)| z.abs() > threshold)
        .map(|(point, z_score)| SpikeRecord {
            date: point.date,
            value: point.value,
            z_score,
            magnitude: z_score.abs(),
        })
        .collect();

    tracing::info!(
        observations = series.len(),
        threshold,
        spikes = spikes.len(),
        "spike detection complete"
    );

    Ok(spikes)
}

pub(crate) fn check_threshold(threshold: f64) -> Result<()> {
    if !threshold.is_finite() || threshold < 0.0 {
        return Err(ForecastError::InvalidParameter(format!(
            "Spike threshold must be a non-negative number, got {}",
            threshold
        )));
    }
    Ok(())
}

/// Spikes ordered by descending magnitude
pub fn largest_first(mut spikes: Vec<SpikeRecord>) -> Vec<SpikeRecord> {
    spikes.sort_by(|a, b| b.magnitude.total_cmp(&a.magnitude));
    spikes
}
