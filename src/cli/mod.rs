//! Command-line interface definition

use clap::{ArgAction, Parser};

const LONG_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("BUILD_TIME"), ")");

/// Network Speed Tester - measures latency, jitter, download and upload throughput
#[derive(Parser, Debug, Clone)]
#[command(name = "nst")]
#[command(version, long_version = LONG_VERSION, about, long_about = None)]
#[command(after_long_help = crate::config::EnvManager::display_env_help())]
pub struct Cli {
    /// Speed test server base URL (can be used multiple times)
    #[arg(short, long = "server", action = ArgAction::Append, value_name = "URL")]
    pub servers: Vec<String>,

    /// Round-trip probes per latency measurement
    #[arg(short = 'c', long, value_name = "N")]
    pub ping_count: Option<u32>,

    /// Per-probe timeout in milliseconds
    #[arg(long, value_name = "MS")]
    pub ping_timeout_ms: Option<u64>,

    /// Download sampling window in milliseconds
    #[arg(long, value_name = "MS")]
    pub download_duration_ms: Option<u64>,

    /// Bytes requested per download chunk
    #[arg(long, value_name = "BYTES")]
    pub download_chunk_bytes: Option<u64>,

    /// Upload sampling window in milliseconds
    #[arg(long, value_name = "MS")]
    pub upload_duration_ms: Option<u64>,

    /// Bytes sent per upload chunk
    #[arg(long, value_name = "BYTES")]
    pub upload_chunk_bytes: Option<u64>,

    /// Upper bound for a single chunk transfer in milliseconds
    #[arg(long, value_name = "MS")]
    pub chunk_timeout_ms: Option<u64>,

    /// Append completed results to this JSON lines file
    #[arg(short = 'o', long, value_name = "PATH")]
    pub results_file: Option<String>,

    /// Print the result as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Do not draw the live progress gauge
    #[arg(long)]
    pub no_gauge: bool,

    /// Force colored output
    #[arg(long)]
    pub color: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Validate CLI arguments for conflicts
    pub fn validate(&self) -> Result<(), String> {
        if self.color && self.no_color {
            return Err("Cannot specify both --color and --no-color".to_string());
        }

        Ok(())
    }

    /// Color preference from flags; `None` leaves the decision to the configuration
    pub fn color_override(&self) -> Option<bool> {
        if self.color {
            Some(true)
        } else if self.no_color || !supports_color() {
            Some(false)
        } else {
            None
        }
    }

    /// Whether the live gauge should be drawn
    pub fn show_gauge(&self) -> bool {
        !self.no_gauge && !self.json
    }

    /// Version line including build metadata
    pub fn version_info() -> String {
        match option_env!("GIT_COMMIT") {
            Some(commit) => format!("{} v{} ({}, built {})", crate::PKG_NAME, crate::VERSION, commit, env!("BUILD_TIME")),
            None => format!("{} v{} (built {})", crate::PKG_NAME, crate::VERSION, env!("BUILD_TIME")),
        }
    }
}

/// Check if the terminal supports color output
fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    #[cfg(target_os = "windows")]
    {
        if std::env::var("ANSICON").is_ok() || std::env::var("ConEmuANSI").is_ok() {
            return true;
        }
    }

    #[cfg(unix)]
    {
        true
    }
    #[cfg(not(unix))]
    {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parsing_defaults() {
        let cli = Cli::parse_from(["nst"]);
        assert!(cli.servers.is_empty());
        assert!(cli.ping_count.is_none());
        assert!(cli.download_duration_ms.is_none());
        assert!(cli.results_file.is_none());
        assert!(!cli.json);
        assert!(cli.show_gauge());
    }

    #[test]
    fn test_cli_parsing_all_options() {
        let cli = Cli::parse_from([
            "nst",
            "--server", "https://a.example.net",
            "--server", "https://b.example.net",
            "--ping-count", "3",
            "--ping-timeout-ms", "800",
            "--download-duration-ms", "4000",
            "--download-chunk-bytes", "1048576",
            "--upload-duration-ms", "3000",
            "--upload-chunk-bytes", "524288",
            "--chunk-timeout-ms", "5000",
            "--results-file", "results.jsonl",
            "--json",
            "--no-color",
            "--verbose",
            "--debug",
        ]);

        assert_eq!(cli.servers, vec!["https://a.example.net", "https://b.example.net"]);
        assert_eq!(cli.ping_count, Some(3));
        assert_eq!(cli.ping_timeout_ms, Some(800));
        assert_eq!(cli.download_duration_ms, Some(4000));
        assert_eq!(cli.download_chunk_bytes, Some(1_048_576));
        assert_eq!(cli.upload_duration_ms, Some(3000));
        assert_eq!(cli.upload_chunk_bytes, Some(524_288));
        assert_eq!(cli.chunk_timeout_ms, Some(5000));
        assert_eq!(cli.results_file.as_deref(), Some("results.jsonl"));
        assert!(cli.json);
        assert!(cli.no_color);
        assert!(cli.verbose);
        assert!(cli.debug);
    }

    #[test]
    fn test_json_hides_gauge() {
        assert!(!Cli::parse_from(["nst", "--json"]).show_gauge());
        assert!(!Cli::parse_from(["nst", "--no-gauge"]).show_gauge());
    }

    #[test]
    fn test_short_flags() {
        let cli = Cli::parse_from(["nst", "-s", "https://a.example.net", "-c", "7", "-o", "out.jsonl"]);
        assert_eq!(cli.servers.len(), 1);
        assert_eq!(cli.ping_count, Some(7));
        assert_eq!(cli.results_file.as_deref(), Some("out.jsonl"));
    }

    #[test]
    fn test_invalid_number_rejected() {
        assert!(Cli::try_parse_from(["nst", "--ping-count", "abc"]).is_err());
        assert!(Cli::try_parse_from(["nst", "--download-duration-ms", "-5"]).is_err());
    }

    #[test]
    fn test_cli_validation() {
        let conflict = Cli::parse_from(["nst", "--color", "--no-color"]);
        let err = conflict.validate().unwrap_err();
        assert!(err.contains("Cannot specify both --color and --no-color"));

        assert!(Cli::parse_from(["nst", "--color"]).validate().is_ok());
        assert!(Cli::parse_from(["nst"]).validate().is_ok());
    }

    #[test]
    fn test_color_override() {
        assert_eq!(Cli::parse_from(["nst", "--color"]).color_override(), Some(true));
        assert_eq!(Cli::parse_from(["nst", "--no-color"]).color_override(), Some(false));
    }

    #[test]
    fn test_long_help_lists_env_vars() {
        let help = Cli::command().render_long_help().to_string();
        assert!(help.contains("Supported Environment Variables:"));
        assert!(help.contains("CHUNK_TIMEOUT_MS"));
        assert!(help.contains("Configuration Priority"));
    }

    #[test]
    fn test_version_info() {
        let info = Cli::version_info();
        assert!(info.contains(crate::VERSION));
        assert!(info.contains("built"));
    }
}
