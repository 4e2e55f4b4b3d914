//! Progress reporting: observer interface and the phase-to-percent mapping

use crate::{
    models::{ProgressSnapshot, TestResult},
    types::TestPhase,
};

/// Receives live progress from a running test
///
/// Callbacks run inline on the measurement task and must return quickly.
pub trait ProgressObserver: Send + Sync {
    /// The orchestrator moved to `phase`
    fn on_phase_change(&self, _phase: TestPhase) {}

    /// A new snapshot is available (per completed chunk and at phase edges)
    fn on_progress(&self, _snapshot: &ProgressSnapshot) {}

    /// The run completed with `result`
    fn on_complete(&self, _result: &TestResult) {}
}

/// Where each phase's progress band starts and ends, in percent
///
/// Ping covers `[0, ping_end)`, download `[ping_end, download_end)` and
/// upload `[download_end, 100]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSplit {
    pub ping_end: f64,
    pub download_end: f64,
}

impl ProgressSplit {
    pub fn new(ping_end: f64, download_end: f64) -> Option<Self> {
        if 0.0 < ping_end && ping_end < download_end && download_end < 100.0 {
            Some(Self { ping_end, download_end })
        } else {
            None
        }
    }

    fn band(&self, phase: TestPhase) -> (f64, f64) {
        match phase {
            TestPhase::Idle => (0.0, 0.0),
            TestPhase::Ping => (0.0, self.ping_end),
            TestPhase::Download => (self.ping_end, self.download_end),
            TestPhase::Upload => (self.download_end, 100.0),
            TestPhase::Complete => (100.0, 100.0),
        }
    }

    /// Overall percentage for `fraction` of the way through `phase`
    pub fn percent(&self, phase: TestPhase, fraction: f64) -> f64 {
        let (start, end) = self.band(phase);
        let fraction = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 0.0 };
        if fraction >= 1.0 {
            return end;
        }
        start + (end - start) * fraction
    }
}

impl Default for ProgressSplit {
    fn default() -> Self {
        Self {
            ping_end: 100.0 / 3.0,
            download_end: 200.0 / 3.0,
        }
    }
}
