//! Environment variable handling and .env file management

use crate::error::{AppError, Result};
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load .env file if it exists
    ///
    /// Values already present in the process environment are not overwritten.
    pub fn load_env_file(debug: bool) -> Result<()> {
        Self::load_env_file_from(Path::new(".env"), debug)
    }

    /// Load a specific env file if it exists
    pub fn load_env_file_from(path: &Path, debug: bool) -> Result<()> {
        if path.exists() {
            dotenv::from_path(path)
                .map_err(|e| AppError::config(format!("Failed to load {}: {}", path.display(), e)))?;

            if debug {
                eprintln!("Loaded configuration from {}", path.display());
            }
        } else if debug {
            eprintln!("No {} file found, using defaults and CLI arguments", path.display());
        }

        Ok(())
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        match key {
            "SERVER_URLS" => {
                for server in value.split(',') {
                    let server = server.trim();
                    if !server.is_empty() {
                        url::Url::parse(server)
                            .map_err(|e| AppError::config(format!("Invalid SERVER_URLS entry '{}': {}", server, e)))?;
                    }
                }
            }
            "PING_COUNT" => {
                let count: u32 = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid PING_COUNT value '{}': {}", value, e)))?;
                if count == 0 || count > 20 {
                    return Err(AppError::config(format!("PING_COUNT must be between 1 and 20, got: {}", count)));
                }
            }
            "PING_TIMEOUT_MS" | "DOWNLOAD_DURATION_MS" | "UPLOAD_DURATION_MS" | "CHUNK_TIMEOUT_MS"
            | "DOWNLOAD_CHUNK_BYTES" | "UPLOAD_CHUNK_BYTES" => {
                let parsed: u64 = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
                if parsed == 0 {
                    return Err(AppError::config(format!("{} must be greater than 0", key)));
                }
            }
            "PING_FALLBACK_MS" => {
                let parsed: f64 = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid PING_FALLBACK_MS value '{}': {}", value, e)))?;
                if !parsed.is_finite() || parsed < 0.0 {
                    return Err(AppError::config("PING_FALLBACK_MS must be a non-negative number"));
                }
            }
            "ENABLE_COLOR" => {
                value
                    .parse::<bool>()
                    .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", value, e)))?;
            }
            _ => {
                // RESULTS_FILE and unknown keys accept any value
            }
        }

        Ok(())
    }

    /// Get list of all supported environment variables with descriptions
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("SERVER_URLS", "Comma-separated list of server base URLs", "https://speed.cloudflare.com"),
            ("PING_COUNT", "Latency probes per measurement (1-20)", "5"),
            ("PING_TIMEOUT_MS", "Per-probe timeout in milliseconds", "5000"),
            ("PING_FALLBACK_MS", "Latency reported when all probes fail", "9999"),
            ("DOWNLOAD_DURATION_MS", "Download window in milliseconds", "10000"),
            ("DOWNLOAD_CHUNK_BYTES", "Bytes requested per download chunk", "10485760"),
            ("UPLOAD_DURATION_MS", "Upload window in milliseconds", "10000"),
            ("UPLOAD_CHUNK_BYTES", "Bytes sent per upload chunk", "2097152"),
            ("CHUNK_TIMEOUT_MS", "Timeout for a single chunk in milliseconds", "15000"),
            ("RESULTS_FILE", "JSON lines file receiving completed results", "results.jsonl"),
            ("ENABLE_COLOR", "Enable colored output", "true"),
        ]
    }

    /// Display environment variable help
    pub fn display_env_help() -> String {
        let mut help = String::new();
        help.push_str("Supported Environment Variables:\n\n");

        for (var, description, example) in Self::get_supported_env_vars() {
            help.push_str(&format!("  {:<22} {}\n", var, description));
            help.push_str(&format!("  {:<22} Example: {}\n\n", "", example));
        }

        help.push_str("Configuration Priority (highest to lowest):\n");
        help.push_str("  1. Command-line arguments\n");
        help.push_str("  2. Environment variables\n");
        help.push_str("  3. .env file values\n");
        help.push_str("  4. Default values\n");

        help
    }

    /// Check every supported variable present in the environment
    ///
    /// Runs after the .env file is loaded so its values are covered too.
    pub fn validate_current_env() -> Result<()> {
        for (var_name, _, _) in Self::get_supported_env_vars() {
            if let Ok(value) = std::env::var(var_name) {
                Self::validate_env_var(var_name, value.trim())?;
            }
        }

        Ok(())
    }
}
