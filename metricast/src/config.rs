//! Configuration for training, forecasting and spike detection
//!
//! Every tunable the engine uses lives here so that policies (backend
//! choice, zero-denominator handling, short-history handling, band width)
//! are selected once at configuration time and threaded explicitly through
//! the components.

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Regression backend selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Ordinary least squares
    Linear,
    /// L2-regularized least squares
    Ridge {
        #[serde(default = "default_alpha")]
        alpha: f64,
    },
    /// Bagged regression trees
    Ensemble {
        #[serde(default = "default_n_trees")]
        n_trees: usize,
        #[serde(default)]
        max_depth: Option<usize>,
        #[serde(default = "default_min_samples_split")]
        min_samples_split: usize,
        #[serde(default = "default_seed")]
        seed: u64,
    },
}

fn default_alpha() -> f64 {
    1.0
}

fn default_n_trees() -> usize {
    100
}

fn default_min_samples_split() -> usize {
    2
}

fn default_seed() -> u64 {
    42
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Ridge {
            alpha: default_alpha(),
        }
    }
}

impl BackendConfig {
    /// Ensemble backend with the default size and the given seed
    pub fn ensemble(seed: u64) -> Self {
        BackendConfig::Ensemble {
            n_trees: default_n_trees(),
            max_depth: None,
            min_samples_split: default_min_samples_split(),
            seed,
        }
    }
}

/// What to do when a ratio has a zero denominator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroDenominatorPolicy {
    /// Return `ForecastError::DivisionByZero`
    #[default]
    Fail,
    /// Produce IEEE infinity (or NaN for 0/0) and let downstream checks flag it
    Sentinel,
}

/// How single-step features behave with less than 30 observations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryPolicy {
    /// Clamp lag indices to the earliest observation, shrink rolling windows
    #[default]
    Clamp,
    /// Return `ForecastError::InsufficientHistory`
    Strict,
}

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub backend: BackendConfig,
    pub zero_denominator: ZeroDenominatorPolicy,
    pub history: HistoryPolicy,
    /// Band half-width in multiples of the historical standard deviation
    pub band_width: f64,
    /// Confidence score of a one-step horizon's first point
    pub confidence_start: f64,
    /// Total confidence lost across the horizon
    pub confidence_decay: f64,
    /// Absolute z-score above which a point is a spike
    pub spike_threshold: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            zero_denominator: ZeroDenominatorPolicy::default(),
            history: HistoryPolicy::default(),
            band_width: 2.0,
            confidence_start: 0.95,
            confidence_decay: 0.2,
            spike_threshold: 2.0,
        }
    }
}

impl ForecastConfig {
    /// Default configuration with a different backend
    pub fn with_backend(backend: BackendConfig) -> Self {
        Self {
            backend,
            ..Self::default()
        }
    }

    /// Load and validate a configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let config: Self = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    /// Check parameter ranges
    pub fn validate(&self) -> Result<()> {
        match &self.backend {
            BackendConfig::Linear => {}
            BackendConfig::Ridge { alpha } => {
                if !alpha.is_finite() || *alpha < 0.0 {
                    return Err(ForecastError::InvalidParameter(format!(
                        "Ridge alpha must be a non-negative number, got {}",
                        alpha
                    )));
                }
            }
            BackendConfig::Ensemble {
                n_trees,
                max_depth,
                min_samples_split,
                ..
            } => {
                if *n_trees == 0 {
                    return Err(ForecastError::InvalidParameter(
                        "Ensemble needs at least one tree".to_string(),
                    ));
                }
                if *max_depth == Some(0) {
                    return Err(ForecastError::InvalidParameter(
                        "Tree depth must be positive".to_string(),
                    ));
                }
                if *min_samples_split < 2 {
                    return Err(ForecastError::InvalidParameter(
                        "min_samples_split must be at least 2".to_string(),
                    ));
                }
            }
        }

        if !(self.band_width > 0.0) {
            return Err(ForecastError::InvalidParameter(
                "Band width must be positive".to_string(),
            ));
        }

        let end = self.confidence_start - self.confidence_decay;
        if !(0.0..=1.0).contains(&self.confidence_start)
            || !(0.0..=1.0).contains(&end)
            || self.confidence_decay < 0.0
        {
            return Err(ForecastError::InvalidParameter(
                "Confidence scores must stay within [0, 1] and decay must be non-negative"
                    .to_string(),
            ));
        }

        if !self.spike_threshold.is_finite() || self.spike_threshold < 0.0 {
            return Err(ForecastError::InvalidParameter(format!(
                "Spike threshold must be a non-negative number, got {}",
                self.spike_threshold
            )));
        }

        Ok(())
    }
}
