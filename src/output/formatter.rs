//! Plain-text and JSON result formatters

use crate::{
    error::Result,
    models::{PartialResult, TestOutcome, TestResult},
};
use serde::Serialize;

/// Renders the end of a run for the terminal or a pipe
pub trait ResultFormatter: Send + Sync {
    fn format_result(&self, result: &TestResult) -> Result<String>;

    fn format_cancelled(&self, partial: &PartialResult) -> Result<String>;

    fn format_outcome(&self, outcome: &TestOutcome) -> Result<String> {
        match outcome {
            TestOutcome::Completed(result) => self.format_result(result),
            TestOutcome::Cancelled(partial) => self.format_cancelled(partial),
        }
    }
}

/// "125.5 Mbps", "1.2 Gbps", "0.50 Mbps"
pub fn format_speed(mbps: f64) -> String {
    if mbps >= 1000.0 {
        format!("{:.1} Gbps", mbps / 1000.0)
    } else if mbps >= 100.0 {
        format!("{:.0} Mbps", mbps)
    } else if mbps >= 10.0 {
        format!("{:.1} Mbps", mbps)
    } else {
        format!("{:.2} Mbps", mbps)
    }
}

pub fn format_latency(ms: f64) -> String {
    format!("{:.2} ms", ms)
}

pub(crate) const NOT_MEASURED: &str = "not measured";

/// Formatter without any terminal escapes
#[derive(Debug, Default, Clone)]
pub struct PlainFormatter;

impl PlainFormatter {
    pub fn new() -> Self {
        Self
    }
}

impl ResultFormatter for PlainFormatter {
    fn format_result(&self, result: &TestResult) -> Result<String> {
        let lines = [
            "Speed Test Results".to_string(),
            "==================".to_string(),
            format!("Server:    {}", result.server),
            format!("Ping:      {}", format_latency(result.ping_ms)),
            format!("Jitter:    {}", format_latency(result.jitter_ms)),
            format!("Download:  {}", format_speed(result.download_mbps)),
            format!("Upload:    {}", format_speed(result.upload_mbps)),
            format!("Completed: {}", result.timestamp.format("%Y-%m-%d %H:%M:%S UTC")),
        ];
        Ok(lines.join("\n"))
    }

    fn format_cancelled(&self, partial: &PartialResult) -> Result<String> {
        let lines = [
            "Speed test cancelled".to_string(),
            format!("Ping:      {}", partial.ping_ms.map(format_latency).unwrap_or_else(|| NOT_MEASURED.to_string())),
            format!("Jitter:    {}", partial.jitter_ms.map(format_latency).unwrap_or_else(|| NOT_MEASURED.to_string())),
            format!("Download:  {}", partial.download_mbps.map(format_speed).unwrap_or_else(|| NOT_MEASURED.to_string())),
            format!("Upload:    {}", NOT_MEASURED),
        ];
        Ok(lines.join("\n"))
    }
}

#[derive(Serialize)]
struct CancelledReport<'a> {
    status: &'static str,
    #[serde(flatten)]
    partial: &'a PartialResult,
}

#[derive(Serialize)]
struct CompletedReport<'a> {
    status: &'static str,
    #[serde(flatten)]
    result: &'a TestResult,
}

/// Pretty-printed JSON, one document per run
#[derive(Debug, Default, Clone)]
pub struct JsonFormatter;

impl JsonFormatter {
    pub fn new() -> Self {
        Self
    }
}

impl ResultFormatter for JsonFormatter {
    fn format_result(&self, result: &TestResult) -> Result<String> {
        Ok(serde_json::to_string_pretty(&CompletedReport {
            status: "completed",
            result,
        })?)
    }

    fn format_cancelled(&self, partial: &PartialResult) -> Result<String> {
        Ok(serde_json::to_string_pretty(&CancelledReport {
            status: "cancelled",
            partial,
        })?)
    }
}
