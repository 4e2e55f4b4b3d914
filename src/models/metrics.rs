//! Measurement data models: samples, windows and test results

use crate::types::{Direction, TestPhase};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// One throughput observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Speed in megabits per second, never negative
    pub value_mbps: f64,

    /// Offset from the moment the window opened
    pub measured_at: Duration,
}

impl Sample {
    /// Create a sample; negative or non-finite speeds are clamped to 0
    pub fn new(value_mbps: f64, measured_at: Duration) -> Self {
        let value_mbps = if value_mbps.is_finite() && value_mbps > 0.0 {
            value_mbps
        } else {
            0.0
        };
        Self { value_mbps, measured_at }
    }

    /// Speed implied by moving `bytes` in `elapsed`
    pub fn speed_mbps(bytes: u64, elapsed: Duration) -> f64 {
        let secs = elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        (bytes as f64 * 8.0) / (secs * 1_000_000.0)
    }
}

/// Ordered samples collected during one throughput phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleWindow {
    pub direction: Direction,
    pub opened_at: DateTime<Utc>,
    samples: Vec<Sample>,
}

impl SampleWindow {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            opened_at: Utc::now(),
            samples: Vec::new(),
        }
    }

    /// Build a window from raw speeds, spacing them one second apart
    pub fn from_values(direction: Direction, values: &[f64]) -> Self {
        let mut window = Self::new(direction);
        for (i, &value) in values.iter().enumerate() {
            window.push(Sample::new(value, Duration::from_secs(i as u64 + 1)));
        }
        window
    }

    /// Append a sample; `measured_at` never goes backwards
    pub fn push(&mut self, sample: Sample) {
        let floor = self.samples.last().map(|s| s.measured_at).unwrap_or(Duration::ZERO);
        let measured_at = sample.measured_at.max(floor);
        self.samples.push(Sample { measured_at, ..sample });
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value_mbps).collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Final record of a completed speed test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    /// Correlates the result with the run's log lines
    pub run_id: Uuid,

    /// Base URL of the server that was measured
    pub server: String,

    pub download_mbps: f64,
    pub upload_mbps: f64,
    pub ping_ms: f64,
    pub jitter_ms: f64,

    /// Completion time, serialized as RFC 3339
    pub timestamp: DateTime<Utc>,
}

impl TestResult {
    pub fn new(
        run_id: Uuid,
        server: impl Into<String>,
        download_mbps: f64,
        upload_mbps: f64,
        ping_ms: f64,
        jitter_ms: f64,
    ) -> Self {
        Self {
            run_id,
            server: server.into(),
            download_mbps,
            upload_mbps,
            ping_ms,
            jitter_ms,
            timestamp: Utc::now(),
        }
    }
}

/// Fields finalized before a run was cancelled
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialResult {
    pub ping_ms: Option<f64>,
    pub jitter_ms: Option<f64>,
    pub download_mbps: Option<f64>,
}

impl PartialResult {
    /// Whether any phase finished before cancellation
    pub fn has_measurements(&self) -> bool {
        self.ping_ms.is_some() || self.jitter_ms.is_some() || self.download_mbps.is_some()
    }
}

/// How a run ended when it did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum TestOutcome {
    Completed(TestResult),
    Cancelled(PartialResult),
}

impl TestOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, TestOutcome::Completed(_))
    }

    pub fn result(&self) -> Option<&TestResult> {
        match self {
            TestOutcome::Completed(result) => Some(result),
            TestOutcome::Cancelled(_) => None,
        }
    }

    pub fn into_result(self) -> Option<TestResult> {
        match self {
            TestOutcome::Completed(result) => Some(result),
            TestOutcome::Cancelled(_) => None,
        }
    }
}

/// What a UI needs to draw the live gauge
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub phase: TestPhase,
    pub percent_complete: f64,
    pub current_speed_mbps: f64,
}

impl ProgressSnapshot {
    pub fn new(phase: TestPhase, percent_complete: f64, current_speed_mbps: f64) -> Self {
        Self {
            phase,
            percent_complete: percent_complete.clamp(0.0, 100.0),
            current_speed_mbps: current_speed_mbps.max(0.0),
        }
    }

    pub fn idle() -> Self {
        Self::new(TestPhase::Idle, 0.0, 0.0)
    }
}

impl Default for ProgressSnapshot {
    fn default() -> Self {
        Self::idle()
    }
}
