//! Configuration parsing from CLI arguments and environment variables

use crate::{cli::Cli, config::env::EnvManager, error::Result, models::Config};

/// Configuration parser that combines CLI arguments with environment variables
pub struct ConfigParser {
    cli: Cli,
    load_env_file: bool,
}

impl ConfigParser {
    /// Create a new configuration parser with CLI arguments
    pub fn new(cli: Cli) -> Self {
        Self { cli, load_env_file: true }
    }

    /// Skip reading `.env` from the working directory
    pub fn without_env_file(mut self) -> Self {
        self.load_env_file = false;
        self
    }

    /// Parse and build the complete configuration
    pub fn parse(&self) -> Result<Config> {
        let mut config = Config::default();

        if self.load_env_file {
            EnvManager::load_env_file(self.cli.debug)?;
        }

        EnvManager::validate_current_env()?;
        config.merge_from_env()?;
        self.apply_cli_overrides(&mut config);
        config.validate()?;

        Ok(config)
    }

    /// Apply CLI argument overrides to configuration
    fn apply_cli_overrides(&self, config: &mut Config) {
        let cli = &self.cli;

        if !cli.servers.is_empty() {
            config.server_urls = cli.servers.clone();
        }
        if let Some(count) = cli.ping_count {
            config.ping_count = count;
        }
        if let Some(ms) = cli.ping_timeout_ms {
            config.ping_timeout_ms = ms;
        }
        if let Some(ms) = cli.download_duration_ms {
            config.download_duration_ms = ms;
        }
        if let Some(bytes) = cli.download_chunk_bytes {
            config.download_chunk_bytes = bytes;
        }
        if let Some(ms) = cli.upload_duration_ms {
            config.upload_duration_ms = ms;
        }
        if let Some(bytes) = cli.upload_chunk_bytes {
            config.upload_chunk_bytes = bytes;
        }
        if let Some(ms) = cli.chunk_timeout_ms {
            config.chunk_timeout_ms = ms;
        }
        if let Some(ref path) = cli.results_file {
            config.results_file = Some(path.clone());
        }
        if let Some(color) = cli.color_override() {
            config.enable_color = color;
        }

        // CLI-only
        config.verbose = cli.verbose;
        config.debug = cli.debug;
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<Config> {
    ConfigParser::new(cli).parse()
}

/// Display configuration summary for debug purposes
pub fn display_config_summary(config: &Config) -> String {
    let mut summary = Vec::new();

    summary.push(format!("Servers: {}", config.server_urls.join(", ")));
    summary.push(format!("Ping: {} probes, {}ms timeout", config.ping_count, config.ping_timeout_ms));
    summary.push(format!(
        "Download: {}ms window, {} byte chunks",
        config.download_duration_ms, config.download_chunk_bytes
    ));
    summary.push(format!(
        "Upload: {}ms window, {} byte chunks",
        config.upload_duration_ms, config.upload_chunk_bytes
    ));
    summary.push(format!("Chunk Timeout: {}ms", config.chunk_timeout_ms));
    summary.push(format!(
        "Trimming: {:.0}% per side above {} samples",
        config.trim_fraction * 100.0,
        config.trim_min_samples
    ));
    summary.push(format!(
        "Results File: {}",
        config.results_file.as_deref().unwrap_or("none")
    ));
    summary.push(format!("Color Output: {}", config.enable_color));
    summary.push(format!("Verbose: {}", config.verbose));
    summary.push(format!("Debug: {}", config.debug));

    summary.join("\n")
}
