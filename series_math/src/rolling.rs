//! Trailing rolling window
//!
//! Keeps the last `period` observations and reports their mean and sample
//! standard deviation. Used to sweep rolling features across a whole series
//! without re-summing every window.

use crate::summary;
use crate::{MathError, Result};
use std::collections::VecDeque;

/// Fixed-size trailing window over a value stream
#[derive(Debug, Clone)]
pub struct RollingWindow {
    period: usize,
    values: VecDeque<f64>,
    sum: f64,
}

impl RollingWindow {
    /// Create a new rolling window with the specified period
    pub fn new(period: usize) -> Result<Self> {
        if period == 0 {
            return Err(MathError::InvalidInput(
                "Period must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            period,
            values: VecDeque::with_capacity(period),
            sum: 0.0,
        })
    }

    /// Push a new observation, evicting the oldest once the window is full
    pub fn update(&mut self, value: f64) {
        self.values.push_back(value);
        self.sum += value;

        if self.values.len() > self.period {
            if let Some(old_value) = self.values.pop_front() {
                self.sum -= old_value;
            }
        }
    }

    /// Whether the window holds `period` observations
    pub fn is_full(&self) -> bool {
        self.values.len() == self.period
    }

    /// Number of observations currently held
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the window is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Mean of the full window
    pub fn mean(&self) -> Result<f64> {
        self.ensure_full()?;
        Ok(self.sum / self.period as f64)
    }

    /// Sample standard deviation of the full window
    pub fn sample_std(&self) -> Result<f64> {
        self.ensure_full()?;
        let (front, back) = self.values.as_slices();
        if back.is_empty() {
            return summary::sample_std(front);
        }
        let contiguous: Vec<f64> = self.values.iter().copied().collect();
        summary::sample_std(&contiguous)
    }

    fn ensure_full(&self) -> Result<()> {
        if !self.is_full() {
            return Err(MathError::InsufficientData(format!(
                "Not enough data for rolling statistic. Need {} values, have {}.",
                self.period,
                self.values.len()
            )));
        }
        Ok(())
    }
}
