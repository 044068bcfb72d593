//! Utility functions for the metricast crate

use crate::config::ZeroDenominatorPolicy;
use crate::data::Series;
use crate::error::{ForecastError, Result};
use chrono::{Days, NaiveDate};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

/// Divide under a zero-denominator policy
///
/// With [`ZeroDenominatorPolicy::Sentinel`] a zero denominator yields the
/// IEEE result (`±inf`, or NaN for `0/0`).
pub fn checked_ratio(numerator: f64, denominator: f64, policy: ZeroDenominatorPolicy) -> Result<f64> {
    if denominator == 0.0 && policy == ZeroDenominatorPolicy::Fail {
        return Err(ForecastError::DivisionByZero(format!(
            "{} / 0",
            numerator
        )));
    }
    Ok(numerator / denominator)
}

/// Split a series into a training head and a holdout tail of `holdout` points
pub fn train_test_split(series: &Series, holdout: usize) -> Result<(Series, Series)> {
    if holdout == 0 || holdout >= series.len() {
        return Err(ForecastError::InvalidParameter(format!(
            "Holdout of {} leaves no training or test data in a series of {}",
            holdout,
            series.len()
        )));
    }

    let cut = series.len() - holdout;
    Ok((series.slice(0, Some(cut))?, series.slice(cut, None)?))
}

/// The `horizon` consecutive days following `last`
///
/// The range is checked up front, so a horizon running past the last
/// representable date fails before any date is produced.
pub fn future_dates(last: NaiveDate, horizon: usize) -> Result<impl Iterator<Item = NaiveDate>> {
    let in_range = u64::try_from(horizon)
        .ok()
        .and_then(|days| last.checked_add_days(Days::new(days)))
        .is_some();
    if !in_range {
        return Err(ForecastError::DataError(format!(
            "{} + {} days is out of range",
            last, horizon
        )));
    }

    Ok(last.iter_days().skip(1).take(horizon))
}

/// Synthetic daily engagement series: a linear trend plus seeded Gaussian noise
pub fn synthetic_series(
    start: NaiveDate,
    days: usize,
    base: f64,
    trend: f64,
    noise_std: f64,
    seed: u64,
) -> Result<Series> {
    let noise = Normal::new(0.0, noise_std)
        .map_err(|e| ForecastError::InvalidParameter(format!("Noise level: {}", e)))?;
    let mut rng = StdRng::seed_from_u64(seed);

    let values: Vec<f64> = (0..days)
        .map(|i| base + trend * i as f64 + noise.sample(&mut rng))
        .collect();

    Series::from_values(start, &values)
}
