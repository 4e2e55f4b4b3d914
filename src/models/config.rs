//! Configuration data model and validation

use crate::types::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
///
/// Every knob the engine exposes lives here; component policies
/// (`LatencyPolicy`, `SamplerSettings`, `ReducerPolicy`, `ProgressSplit`)
/// are derived from it so there is exactly one place defaults are decided.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Candidate speed test servers (base URLs)
    #[serde(default = "default_server_urls")]
    pub server_urls: Vec<String>,

    /// How many candidates to probe when choosing a server
    #[serde(default = "default_max_server_candidates")]
    pub max_server_candidates: usize,

    /// Path of the download endpoint, relative to the server URL
    #[serde(default = "default_download_path")]
    pub download_path: String,

    /// Path of the upload endpoint, relative to the server URL
    #[serde(default = "default_upload_path")]
    pub upload_path: String,

    /// Round-trip probes per latency measurement
    #[serde(default = "default_ping_count")]
    pub ping_count: u32,

    /// Per-probe timeout in milliseconds
    #[serde(default = "default_ping_timeout_ms")]
    pub ping_timeout_ms: u64,

    /// Latency reported when every probe fails
    #[serde(default = "default_ping_fallback_ms")]
    pub ping_fallback_ms: f64,

    /// Latency readings used to derive jitter
    #[serde(default = "default_jitter_readings")]
    pub jitter_readings: u32,

    /// Pause between jitter readings in milliseconds
    #[serde(default = "default_jitter_interval_ms")]
    pub jitter_interval_ms: u64,

    /// Download sampling window in milliseconds
    #[serde(default = "default_download_duration_ms")]
    pub download_duration_ms: u64,

    /// Bytes fetched per download chunk
    #[serde(default = "default_download_chunk_bytes")]
    pub download_chunk_bytes: u64,

    /// Upload sampling window in milliseconds
    #[serde(default = "default_upload_duration_ms")]
    pub upload_duration_ms: u64,

    /// Bytes sent per upload chunk
    #[serde(default = "default_upload_chunk_bytes")]
    pub upload_chunk_bytes: u64,

    /// Upper bound for a single chunk transfer in milliseconds
    #[serde(default = "default_chunk_timeout_ms")]
    pub chunk_timeout_ms: u64,

    /// Pause after a failed chunk in milliseconds
    #[serde(default = "default_failure_backoff_ms")]
    pub failure_backoff_ms: u64,

    /// Fraction trimmed from each end of a sample window
    #[serde(default = "default_trim_fraction")]
    pub trim_fraction: f64,

    /// Windows with this many samples or fewer are averaged untrimmed
    #[serde(default = "default_trim_min_samples")]
    pub trim_min_samples: usize,

    /// Append completed results to this JSON lines file
    #[serde(default)]
    pub results_file: Option<String>,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_urls: default_server_urls(),
            max_server_candidates: default_max_server_candidates(),
            download_path: default_download_path(),
            upload_path: default_upload_path(),
            ping_count: default_ping_count(),
            ping_timeout_ms: default_ping_timeout_ms(),
            ping_fallback_ms: default_ping_fallback_ms(),
            jitter_readings: default_jitter_readings(),
            jitter_interval_ms: default_jitter_interval_ms(),
            download_duration_ms: default_download_duration_ms(),
            download_chunk_bytes: default_download_chunk_bytes(),
            upload_duration_ms: default_upload_duration_ms(),
            upload_chunk_bytes: default_upload_chunk_bytes(),
            chunk_timeout_ms: default_chunk_timeout_ms(),
            failure_backoff_ms: default_failure_backoff_ms(),
            trim_fraction: default_trim_fraction(),
            trim_min_samples: default_trim_min_samples(),
            results_file: None,
            enable_color: default_enable_color(),
            verbose: false,
            debug: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_ms)
    }

    pub fn chunk_timeout(&self) -> Duration {
        Duration::from_millis(self.chunk_timeout_ms)
    }

    /// Validate the configuration; runs before any network I/O
    pub fn validate(&self) -> Result<()> {
        if self.server_urls.is_empty() {
            return Err(AppError::config("At least one server URL is required"));
        }

        for server in &self.server_urls {
            if server.is_empty() {
                return Err(AppError::config("Server URL cannot be empty"));
            }

            match url::Url::parse(server) {
                Ok(parsed) => {
                    if parsed.scheme() != "http" && parsed.scheme() != "https" {
                        return Err(AppError::config(format!(
                            "Server URL must use http or https: {}", server
                        )));
                    }
                    if parsed.host_str().is_none() {
                        return Err(AppError::config(format!("Server URL must have a host: {}", server)));
                    }
                }
                Err(e) => {
                    return Err(AppError::config(format!("Invalid server URL '{}': {}", server, e)));
                }
            }
        }

        for (name, path) in [("Download", &self.download_path), ("Upload", &self.upload_path)] {
            if !path.starts_with('/') {
                return Err(AppError::config(format!("{} path must start with '/': {}", name, path)));
            }
        }

        if self.max_server_candidates == 0 {
            return Err(AppError::config("Server candidate count must be greater than 0"));
        }

        if self.ping_count == 0 {
            return Err(AppError::config("Ping count must be greater than 0"));
        }

        if self.ping_count > 20 {
            return Err(AppError::config("Ping count cannot exceed 20"));
        }

        if self.ping_timeout_ms == 0 {
            return Err(AppError::config("Ping timeout must be greater than 0"));
        }

        if !self.ping_fallback_ms.is_finite() || self.ping_fallback_ms < 0.0 {
            return Err(AppError::config("Ping fallback must be a non-negative number of milliseconds"));
        }

        if self.jitter_readings == 0 {
            return Err(AppError::config("Jitter readings must be greater than 0"));
        }

        if self.download_duration_ms == 0 {
            return Err(AppError::config("Download duration must be greater than 0"));
        }

        if self.upload_duration_ms == 0 {
            return Err(AppError::config("Upload duration must be greater than 0"));
        }

        if self.download_chunk_bytes == 0 {
            return Err(AppError::config("Download chunk size must be greater than 0"));
        }

        if self.upload_chunk_bytes == 0 {
            return Err(AppError::config("Upload chunk size must be greater than 0"));
        }

        if self.upload_chunk_bytes > crate::defaults::MAX_CHUNK_BYTES
            || self.download_chunk_bytes > crate::defaults::MAX_CHUNK_BYTES
        {
            return Err(AppError::config(format!(
                "Chunk size cannot exceed {} bytes", crate::defaults::MAX_CHUNK_BYTES
            )));
        }

        if self.chunk_timeout_ms == 0 {
            return Err(AppError::config("Chunk timeout must be greater than 0"));
        }

        if !(0.0..0.5).contains(&self.trim_fraction) {
            return Err(AppError::config(format!(
                "Trim fraction must be in [0, 0.5), got {}", self.trim_fraction
            )));
        }

        Ok(())
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Ok(server_urls) = std::env::var("SERVER_URLS") {
            self.server_urls = server_urls
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Some(value) = env_parse::<u32>("PING_COUNT")? {
            self.ping_count = value;
        }
        if let Some(value) = env_parse::<u64>("PING_TIMEOUT_MS")? {
            self.ping_timeout_ms = value;
        }
        if let Some(value) = env_parse::<f64>("PING_FALLBACK_MS")? {
            self.ping_fallback_ms = value;
        }
        if let Some(value) = env_parse::<u64>("DOWNLOAD_DURATION_MS")? {
            self.download_duration_ms = value;
        }
        if let Some(value) = env_parse::<u64>("DOWNLOAD_CHUNK_BYTES")? {
            self.download_chunk_bytes = value;
        }
        if let Some(value) = env_parse::<u64>("UPLOAD_DURATION_MS")? {
            self.upload_duration_ms = value;
        }
        if let Some(value) = env_parse::<u64>("UPLOAD_CHUNK_BYTES")? {
            self.upload_chunk_bytes = value;
        }
        if let Some(value) = env_parse::<u64>("CHUNK_TIMEOUT_MS")? {
            self.chunk_timeout_ms = value;
        }
        if let Ok(path) = std::env::var("RESULTS_FILE") {
            let path = path.trim();
            if !path.is_empty() {
                self.results_file = Some(path.to_string());
            }
        }
        if let Some(value) = env_parse::<bool>("ENABLE_COLOR")? {
            self.enable_color = value;
        }

        Ok(())
    }
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, raw, e))),
        Err(_) => Ok(None),
    }
}

// Default value functions for serde
fn default_server_urls() -> Vec<String> {
    crate::defaults::DEFAULT_SERVER_URLS
        .iter()
        .map(|&s| s.to_string())
        .collect()
}

fn default_max_server_candidates() -> usize {
    crate::defaults::DEFAULT_MAX_SERVER_CANDIDATES
}

fn default_download_path() -> String {
    crate::defaults::DEFAULT_DOWNLOAD_PATH.to_string()
}

fn default_upload_path() -> String {
    crate::defaults::DEFAULT_UPLOAD_PATH.to_string()
}

fn default_ping_count() -> u32 {
    crate::defaults::DEFAULT_PING_COUNT
}

fn default_ping_timeout_ms() -> u64 {
    crate::defaults::DEFAULT_PING_TIMEOUT.as_millis() as u64
}

fn default_ping_fallback_ms() -> f64 {
    crate::defaults::DEFAULT_PING_FALLBACK_MS
}

fn default_jitter_readings() -> u32 {
    crate::defaults::DEFAULT_JITTER_READINGS
}

fn default_jitter_interval_ms() -> u64 {
    crate::defaults::DEFAULT_JITTER_INTERVAL.as_millis() as u64
}

fn default_download_duration_ms() -> u64 {
    crate::defaults::DEFAULT_DOWNLOAD_DURATION.as_millis() as u64
}

fn default_download_chunk_bytes() -> u64 {
    crate::defaults::DEFAULT_DOWNLOAD_CHUNK_BYTES
}

fn default_upload_duration_ms() -> u64 {
    crate::defaults::DEFAULT_UPLOAD_DURATION.as_millis() as u64
}

fn default_upload_chunk_bytes() -> u64 {
    crate::defaults::DEFAULT_UPLOAD_CHUNK_BYTES
}

fn default_chunk_timeout_ms() -> u64 {
    crate::defaults::DEFAULT_CHUNK_TIMEOUT.as_millis() as u64
}

fn default_failure_backoff_ms() -> u64 {
    crate::defaults::DEFAULT_FAILURE_BACKOFF.as_millis() as u64
}

fn default_trim_fraction() -> f64 {
    crate::defaults::DEFAULT_TRIM_FRACTION
}

fn default_trim_min_samples() -> usize {
    crate::defaults::DEFAULT_TRIM_MIN_SAMPLES
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}
