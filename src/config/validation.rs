//! Configuration validation utilities and rules
//!
//! `Config::validate` rejects configurations the engine cannot run. The
//! checks here accept the configuration but point out settings that are
//! likely to produce unreliable numbers.

use crate::{error::Result, models::Config};
use colored::*;
use std::time::Duration;

/// Windows shorter than this rarely leave TCP slow start
const SHORT_WINDOW: Duration = Duration::from_secs(2);

/// Configuration validator with advisory rules
pub struct ConfigValidator;

impl ConfigValidator {
    /// Hard validation followed by advisory checks
    pub fn validate_comprehensive(config: &Config) -> Result<Vec<ValidationWarning>> {
        config.validate()?;

        let mut warnings = Vec::new();
        warnings.extend(Self::validate_servers(config));
        warnings.extend(Self::validate_latency_settings(config));
        warnings.extend(Self::validate_throughput_settings(config));

        Ok(warnings)
    }

    fn validate_servers(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        for server in &config.server_urls {
            let Ok(parsed) = url::Url::parse(server) else {
                continue;
            };

            if parsed.scheme() == "http" {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Info,
                    format!("Server '{}' uses plain HTTP; proxies on the path may cache or compress payloads", server),
                ));
            }

            match parsed.host() {
                Some(url::Host::Ipv4(ip)) if ip.is_private() || ip.is_loopback() => {
                    warnings.push(ValidationWarning::new(
                        ValidationLevel::Info,
                        format!("Server '{}' is on a private or local network", server),
                    ));
                }
                Some(url::Host::Domain("localhost")) => {
                    warnings.push(ValidationWarning::new(
                        ValidationLevel::Info,
                        format!("Server '{}' is on a private or local network", server),
                    ));
                }
                _ => {}
            }
        }

        if config.server_urls.len() > config.max_server_candidates {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!(
                    "Only the first {} of {} servers will be considered",
                    config.max_server_candidates,
                    config.server_urls.len()
                ),
            ));
        }

        warnings
    }

    fn validate_latency_settings(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if !(3..=5).contains(&config.ping_count) {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Ping count of {} is outside the recommended range of 3 to 5", config.ping_count),
            ));
        }

        if config.ping_timeout_ms < 500 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Ping timeout of {}ms may count slow but healthy servers as failures", config.ping_timeout_ms),
            ));
        }

        warnings
    }

    fn validate_throughput_settings(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        for (name, duration_ms) in [
            ("Download", config.download_duration_ms),
            ("Upload", config.upload_duration_ms),
        ] {
            if Duration::from_millis(duration_ms) < SHORT_WINDOW {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Warning,
                    format!("{} window of {}ms is short; expect fewer samples and noisier results", name, duration_ms),
                ));
            }
        }

        if config.upload_chunk_bytes > config.download_chunk_bytes {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "Upload chunk ({} bytes) is larger than download chunk ({} bytes)",
                    config.upload_chunk_bytes, config.download_chunk_bytes
                ),
            ));
        }

        if config.chunk_timeout_ms < config.ping_timeout_ms {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!(
                    "Chunk timeout ({}ms) is shorter than ping timeout ({}ms)",
                    config.chunk_timeout_ms, config.ping_timeout_ms
                ),
            ));
        }

        warnings
    }
}

/// Validation warning levels
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValidationLevel {
    Info,
    Warning,
}

impl ValidationLevel {
    /// Get display string for level
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
        }
    }

    /// Get color for terminal display
    pub fn color(&self) -> Color {
        match self {
            Self::Info => Color::Blue,
            Self::Warning => Color::Yellow,
        }
    }
}

/// Configuration validation warning
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub level: ValidationLevel,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(level: ValidationLevel, message: String) -> Self {
        Self { level, message }
    }

    /// Format warning for display
    pub fn format(&self, use_color: bool) -> String {
        if use_color {
            format!("[{}] {}", self.level.as_str().color(self.level.color()).bold(), self.message)
        } else {
            format!("[{}] {}", self.level.as_str(), self.message)
        }
    }
}

/// Convenience function for comprehensive configuration validation
pub fn validate_config(config: &Config) -> Result<Vec<ValidationWarning>> {
    ConfigValidator::validate_comprehensive(config)
}
