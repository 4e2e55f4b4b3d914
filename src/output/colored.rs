//! Colored formatter implementation with terminal color support

use super::formatter::{format_latency, format_speed, ResultFormatter, NOT_MEASURED};
use crate::{
    error::Result,
    models::{PartialResult, TestResult},
    types::SpeedLevel,
};
use colored::*;

/// Latency classification for color coding
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LatencyLevel {
    Excellent, // < 50ms
    Good,      // 50-100ms
    Fair,      // 100-300ms
    Poor,      // >= 300ms
}

impl LatencyLevel {
    pub fn from_ms(ms: f64) -> Self {
        if ms < 50.0 {
            Self::Excellent
        } else if ms < 100.0 {
            Self::Good
        } else if ms < 300.0 {
            Self::Fair
        } else {
            Self::Poor
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Self::Excellent => Color::Green,
            Self::Good => Color::Cyan,
            Self::Fair => Color::Yellow,
            Self::Poor => Color::Red,
        }
    }
}

/// Terminal color for a throughput figure
pub fn speed_color(mbps: f64) -> Color {
    match SpeedLevel::from_mbps(mbps) {
        SpeedLevel::Slow => Color::Red,
        SpeedLevel::Moderate => Color::Yellow,
        SpeedLevel::Fast => Color::Green,
    }
}

/// Formatter with ANSI colors
#[derive(Debug, Default, Clone)]
pub struct ColoredFormatter;

impl ColoredFormatter {
    pub fn new() -> Self {
        Self
    }

    fn label(name: &str) -> ColoredString {
        format!("{:<10}", format!("{}:", name)).bold()
    }

    fn speed(mbps: f64) -> ColoredString {
        format_speed(mbps).color(speed_color(mbps)).bold()
    }

    fn latency(ms: f64) -> ColoredString {
        format_latency(ms).color(LatencyLevel::from_ms(ms).color())
    }

    fn missing() -> ColoredString {
        NOT_MEASURED.dimmed()
    }
}

impl ResultFormatter for ColoredFormatter {
    fn format_result(&self, result: &TestResult) -> Result<String> {
        let lines = [
            "Speed Test Results".bold().underline().to_string(),
            format!("{} {}", Self::label("Server"), result.server.cyan()),
            format!("{} {}", Self::label("Ping"), Self::latency(result.ping_ms)),
            format!("{} {}", Self::label("Jitter"), Self::latency(result.jitter_ms)),
            format!("{} {}", Self::label("Download"), Self::speed(result.download_mbps)),
            format!("{} {}", Self::label("Upload"), Self::speed(result.upload_mbps)),
            format!(
                "{} {}",
                Self::label("Completed"),
                result.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string().dimmed()
            ),
        ];
        Ok(lines.join("\n"))
    }

    fn format_cancelled(&self, partial: &PartialResult) -> Result<String> {
        let lines = [
            "Speed test cancelled".yellow().bold().to_string(),
            format!("{} {}", Self::label("Ping"), partial.ping_ms.map(Self::latency).unwrap_or_else(Self::missing)),
            format!("{} {}", Self::label("Jitter"), partial.jitter_ms.map(Self::latency).unwrap_or_else(Self::missing)),
            format!("{} {}", Self::label("Download"), partial.download_mbps.map(Self::speed).unwrap_or_else(Self::missing)),
            format!("{} {}", Self::label("Upload"), Self::missing()),
        ];
        Ok(lines.join("\n"))
    }
}
