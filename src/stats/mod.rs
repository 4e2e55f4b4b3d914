//! Statistical reduction of throughput sample windows
//!
//! A window with more than `min_samples_for_trim` samples is reduced with a
//! trimmed mean: sort, discard `floor(n * trim_fraction)` values from each
//! end, average the rest. Smaller windows are averaged as-is and an empty
//! window reduces to 0. The result never depends on sample order.


use crate::{
    error::{AppError, Result},
    models::{Config, SampleWindow},
};
use serde::{Deserialize, Serialize};

/// Configuration for the trimmed-mean reducer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReducerPolicy {
    /// Windows with this many samples or fewer are not trimmed
    pub min_samples_for_trim: usize,
    /// Fraction discarded from each end, in `[0, 0.5)`
    pub trim_fraction: f64,
}

impl ReducerPolicy {
    pub fn new(min_samples_for_trim: usize, trim_fraction: f64) -> Result<Self> {
        if !(0.0..0.5).contains(&trim_fraction) {
            return Err(AppError::statistics(format!(
                "Trim fraction must be in [0, 0.5), got {}",
                trim_fraction
            )));
        }
        Ok(Self {
            min_samples_for_trim,
            trim_fraction,
        })
    }

    /// Number of values dropped from each end of a window of `n` samples
    pub fn trim_count(&self, n: usize) -> usize {
        if n <= self.min_samples_for_trim {
            return 0;
        }
        // At least one sample always survives, whatever the fraction
        ((n as f64 * self.trim_fraction).floor() as usize).min((n - 1) / 2)
    }
}

impl Default for ReducerPolicy {
    fn default() -> Self {
        Self {
            min_samples_for_trim: crate::defaults::DEFAULT_TRIM_MIN_SAMPLES,
            trim_fraction: crate::defaults::DEFAULT_TRIM_FRACTION,
        }
    }
}

impl From<&Config> for ReducerPolicy {
    fn from(config: &Config) -> Self {
        Self {
            min_samples_for_trim: config.trim_min_samples,
            trim_fraction: config.trim_fraction,
        }
    }
}

/// Reduce a window to one speed figure with the default policy
pub fn reduce(window: &SampleWindow) -> f64 {
    reduce_with(window, &ReducerPolicy::default())
}

/// Reduce a window to one speed figure
pub fn reduce_with(window: &SampleWindow, policy: &ReducerPolicy) -> f64 {
    trimmed_mean(&window.values(), policy)
}

/// Trimmed mean of raw values; 0 for an empty slice
pub fn trimmed_mean(values: &[f64], policy: &ReducerPolicy) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let trim = policy.trim_count(sorted.len());
    let kept = &sorted[trim..sorted.len() - trim];
    mean(kept)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Descriptive summary of one window, used by verbose output and logs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSummary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub trimmed_mean: f64,
    /// Samples dropped from each end
    pub trimmed_count: usize,
}

impl WindowSummary {
    pub fn from_window(window: &SampleWindow, policy: &ReducerPolicy) -> Self {
        let values = window.values();
        if values.is_empty() {
            return Self {
                count: 0,
                min: 0.0,
                max: 0.0,
                mean: 0.0,
                trimmed_mean: 0.0,
                trimmed_count: 0,
            };
        }

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Self {
            count: values.len(),
            min,
            max,
            mean: mean(&values),
            trimmed_mean: trimmed_mean(&values, policy),
            trimmed_count: policy.trim_count(values.len()),
        }
    }
}
