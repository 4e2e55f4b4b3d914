//! Type definitions and aliases

use serde::{Deserialize, Serialize};
use std::fmt;

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// Orchestrator state. Only `Idle` and `Complete` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestPhase {
    Idle,
    Ping,
    Download,
    Upload,
    Complete,
}

impl TestPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestPhase::Idle => "idle",
            TestPhase::Ping => "ping",
            TestPhase::Download => "download",
            TestPhase::Upload => "upload",
            TestPhase::Complete => "complete",
        }
    }

    /// Whether a measurement is in flight in this phase
    pub fn is_active(&self) -> bool {
        matches!(self, TestPhase::Ping | TestPhase::Download | TestPhase::Upload)
    }
}

impl fmt::Display for TestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which way the bytes flow during a throughput phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Download,
    Upload,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Download => "download",
            Direction::Upload => "upload",
        }
    }

    /// The orchestrator phase that measures this direction
    pub fn phase(&self) -> TestPhase {
        match self {
            Direction::Download => TestPhase::Download,
            Direction::Upload => TestPhase::Upload,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse speed classification used to color gauges and summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedLevel {
    /// Below 10 Mbps
    Slow,
    /// 10 to 100 Mbps
    Moderate,
    /// 100 Mbps and above
    Fast,
}

impl SpeedLevel {
    pub fn from_mbps(mbps: f64) -> Self {
        if mbps < 10.0 {
            Self::Slow
        } else if mbps < 100.0 {
            Self::Moderate
        } else {
            Self::Fast
        }
    }
}
