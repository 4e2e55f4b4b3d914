//! Data models and structures for the speed measurement engine

pub mod config;
pub mod metrics;

// Re-export main model types
pub use config::Config;
pub use metrics::{PartialResult, ProgressSnapshot, Sample, SampleWindow, TestOutcome, TestResult};
