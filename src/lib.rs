//! Network Speed Tester
//!
//! Client-side speed measurement engine: picks the closest of a set of
//! HTTP speed test servers, measures latency and jitter, then samples
//! download and upload throughput over fixed windows and reduces each
//! window to a trimmed mean. Progress is observable while a run is in
//! flight and a run can be cancelled at any suspension point.

pub mod app;
pub mod cancel;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod models;
pub mod output;
pub mod probe;
pub mod sampler;
pub mod stats;
pub mod types;

// Re-export commonly used types
pub use cancel::{CancellationToken, Cancelled};
pub use client::{HttpTransport, SpeedTestServer, SpeedTestTransport};
pub use error::{AppError, Result};
pub use executor::{ProgressObserver, ProgressSplit, TestOrchestrator};
pub use models::{Config, PartialResult, ProgressSnapshot, Sample, SampleWindow, TestOutcome, TestResult};
pub use output::{JsonLinesSink, OutputFormatterFactory, ResultFormatter, ResultSink};
pub use stats::{reduce, reduce_with, ReducerPolicy};
pub use types::{Direction, TestPhase};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_SERVER_URLS: &[&str] = &["https://speed.cloudflare.com"];
    pub const DEFAULT_MAX_SERVER_CANDIDATES: usize = 3;
    pub const DEFAULT_DOWNLOAD_PATH: &str = "/__down";
    pub const DEFAULT_UPLOAD_PATH: &str = "/__up";

    pub const DEFAULT_PING_COUNT: u32 = 5;
    pub const DEFAULT_PING_TIMEOUT: Duration = Duration::from_secs(5);
    /// Reported when every latency probe fails
    pub const DEFAULT_PING_FALLBACK_MS: f64 = 9999.0;
    pub const DEFAULT_JITTER_READINGS: u32 = 5;
    pub const DEFAULT_JITTER_INTERVAL: Duration = Duration::from_millis(100);

    pub const DEFAULT_DOWNLOAD_DURATION: Duration = Duration::from_secs(10);
    pub const DEFAULT_DOWNLOAD_CHUNK_BYTES: u64 = 10 * 1024 * 1024;
    pub const DEFAULT_UPLOAD_DURATION: Duration = Duration::from_secs(10);
    pub const DEFAULT_UPLOAD_CHUNK_BYTES: u64 = 2 * 1024 * 1024;
    pub const DEFAULT_CHUNK_TIMEOUT: Duration = Duration::from_secs(15);
    pub const DEFAULT_FAILURE_BACKOFF: Duration = Duration::from_millis(100);
    pub const MAX_CHUNK_BYTES: u64 = 100 * 1024 * 1024;

    pub const DEFAULT_TRIM_FRACTION: f64 = 0.1;
    pub const DEFAULT_TRIM_MIN_SAMPLES: usize = 5;

    pub const DEFAULT_ENABLE_COLOR: bool = true;
}
