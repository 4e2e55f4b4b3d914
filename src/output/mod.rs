//! Output formatting and display
//!
//! Result formatters (plain, colored, JSON), the live terminal gauge and
//! the sinks that persist completed results.

mod colored;
mod formatter;
pub mod gauge;
pub mod sink;

pub use self::colored::{speed_color, ColoredFormatter, LatencyLevel};
pub use self::formatter::{format_latency, format_speed, JsonFormatter, PlainFormatter, ResultFormatter};
pub use gauge::GaugeRenderer;
pub use sink::{JsonLinesSink, ResultSink};

use crate::models::Config;

/// Output formatting factory for creating appropriate formatters
pub struct OutputFormatterFactory;

impl OutputFormatterFactory {
    /// JSON wins over color; color only when enabled
    pub fn create_formatter(enable_color: bool, json: bool) -> Box<dyn ResultFormatter> {
        if json {
            Box::new(JsonFormatter::new())
        } else if enable_color {
            Box::new(ColoredFormatter::new())
        } else {
            Box::new(PlainFormatter::new())
        }
    }

    pub fn from_config(config: &Config, json: bool) -> Box<dyn ResultFormatter> {
        Self::create_formatter(config.enable_color, json)
    }
}
