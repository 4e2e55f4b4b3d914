//! Structured logging for the speed measurement engine
//!
//! This module provides:
//! - Structured logging with levels, fields and correlation IDs
//! - Console and JSON output formats
//! - `EngineLogger`, the domain logger for phases, probes, chunks and sinks
//!
//! Every line goes to stderr so that `--json` output on stdout stays
//! machine readable.

use crate::error::{AppError, Result};
use crate::models::{Config, TestResult};
use crate::stats::WindowSummary;
use crate::types::{Direction, TestPhase};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    /// Trace level - most detailed
    Trace = 0,
    /// Debug level - per-chunk and per-probe detail
    Debug = 1,
    /// Info level - phase transitions and results
    Info = 2,
    /// Warning level - degraded but continuing
    Warn = 3,
    /// Error level - the run failed
    Error = 4,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    /// Get ANSI color code for console output
    pub fn color_code(&self) -> &'static str {
        match self {
            LogLevel::Trace => "\x1b[37m",    // White
            LogLevel::Debug => "\x1b[36m",    // Cyan
            LogLevel::Info => "\x1b[32m",     // Green
            LogLevel::Warn => "\x1b[33m",     // Yellow
            LogLevel::Error => "\x1b[31m",    // Red
        }
    }

    pub fn reset_code() -> &'static str {
        "\x1b[0m"
    }
}

impl std::str::FromStr for LogLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            _ => Err(AppError::parse(format!("Invalid log level: {}", s))),
        }
    }
}

/// Log entry structure for structured logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    /// Logger name/component
    pub logger: String,
    /// Run ID tying together the lines of one speed test
    pub correlation_id: Option<String>,
    pub fields: HashMap<String, serde_json::Value>,
    pub location: Option<LogLocation>,
}

/// Source code location information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogLocation {
    pub file: String,
    pub line: u32,
    pub module: Option<String>,
}

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogFormat {
    /// Human-readable console format
    Console,
    /// JSON format for structured logging
    Json,
}

/// Fields attached to every entry written through one logging scope
#[derive(Debug, Default)]
struct LogContext {
    context_fields: HashMap<String, serde_json::Value>,
}

/// Logger with level filtering and multiple output formats
///
/// Clones share the context fields; `scoped` starts a fresh set.
#[derive(Clone)]
pub struct Logger {
    min_level: LogLevel,
    use_color: bool,
    include_location: bool,
    format: LogFormat,
    name: String,
    context: Arc<RwLock<LogContext>>,
}

impl Logger {
    pub fn new(name: String) -> Self {
        Self {
            min_level: LogLevel::Info,
            use_color: true,
            include_location: false,
            format: LogFormat::Console,
            name,
            context: Arc::new(RwLock::new(LogContext::default())),
        }
    }

    /// Create a logger whose level and format follow the configuration
    pub fn with_config(name: String, config: &Config) -> Self {
        let min_level = if config.debug {
            LogLevel::Debug
        } else if config.verbose {
            LogLevel::Info
        } else {
            LogLevel::Warn
        };

        Self {
            min_level,
            use_color: config.enable_color,
            include_location: config.debug,
            format: if config.debug { LogFormat::Json } else { LogFormat::Console },
            name,
            context: Arc::new(RwLock::new(LogContext::default())),
        }
    }

    pub fn set_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    pub fn set_color(&mut self, use_color: bool) {
        self.use_color = use_color;
    }

    /// Same settings with an empty context of its own
    pub fn scoped(&self) -> Self {
        Self {
            context: Arc::new(RwLock::new(LogContext::default())),
            ..self.clone()
        }
    }

    /// Add context field for all subsequent log entries
    pub async fn add_context_field<T: Serialize>(&self, key: String, value: T) {
        if let Ok(json_value) = serde_json::to_value(value) {
            let mut context = self.context.write().await;
            context.context_fields.insert(key, json_value);
        }
    }

    pub fn log(&self, level: LogLevel, message: &str) -> LogEntryBuilder<'_> {
        LogEntryBuilder::new(self, level, message.to_string())
    }

    pub fn debug(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Debug, message)
    }

    async fn write_entry(&self, mut entry: LogEntry) {
        if entry.level < self.min_level {
            return;
        }

        let context = self.context.read().await;
        // Fields set on the entry itself win over scope fields
        for (key, value) in &context.context_fields {
            entry.fields.entry(key.clone()).or_insert_with(|| value.clone());
        }
        drop(context);

        let output = self.render(&entry);
        let _ = writeln!(io::stderr(), "{}", output);
    }

    fn render(&self, entry: &LogEntry) -> String {
        match self.format {
            LogFormat::Console => self.format_console(entry),
            LogFormat::Json => self.format_json(entry),
        }
    }

    fn format_console(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");
        let level_str = entry.level.as_str();

        let formatted_level = if self.use_color {
            format!("{}{:>5}{}", entry.level.color_code(), level_str, LogLevel::reset_code())
        } else {
            format!("{:>5}", level_str)
        };

        let mut output = format!("{} {} [{}] {}",
            timestamp,
            formatted_level,
            entry.logger,
            entry.message
        );

        if let Some(correlation_id) = &entry.correlation_id {
            let short = correlation_id.get(..8).unwrap_or(correlation_id);
            output.push_str(&format!(" [{}]", short));
        }

        if !entry.fields.is_empty() {
            let mut fields: Vec<String> = entry.fields.iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            fields.sort();
            output.push_str(&format!(" {{{}}}", fields.join(", ")));
        }

        if self.include_location {
            if let Some(location) = &entry.location {
                output.push_str(&format!(" @ {}:{}", location.file, location.line));
            }
        }

        output
    }

    fn format_json(&self, entry: &LogEntry) -> String {
        match serde_json::to_string(entry) {
            Ok(json) => json,
            Err(_) => format!("{{\"error\": \"Failed to serialize log entry\", \"message\": {:?}}}", entry.message),
        }
    }
}

/// Builder pattern for creating log entries
pub struct LogEntryBuilder<'a> {
    logger: &'a Logger,
    entry: LogEntry,
}

impl<'a> LogEntryBuilder<'a> {
    fn new(logger: &'a Logger, level: LogLevel, message: String) -> Self {
        Self {
            logger,
            entry: LogEntry {
                timestamp: Utc::now(),
                level,
                message,
                logger: logger.name.clone(),
                correlation_id: None,
                fields: HashMap::new(),
                location: None,
            },
        }
    }

    pub fn correlation_id(mut self, id: &str) -> Self {
        self.entry.correlation_id = Some(id.to_string());
        self
    }

    /// Attach the correlation ID when there is one
    pub fn maybe_correlation_id(self, id: Option<&str>) -> Self {
        match id {
            Some(id) => self.correlation_id(id),
            None => self,
        }
    }

    /// Add a structured field
    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.entry.fields.insert(key.to_string(), json_value);
        }
        self
    }

    pub fn location(mut self, file: &str, line: u32, module: Option<&str>) -> Self {
        self.entry.location = Some(LogLocation {
            file: file.to_string(),
            line,
            module: module.map(String::from),
        });
        self
    }

    /// Add window statistics
    pub fn window(self, summary: &WindowSummary) -> Self {
        self.field("samples", summary.count)
            .field("min_mbps", summary.min)
            .field("max_mbps", summary.max)
            .field("mean_mbps", summary.mean)
            .field("trimmed_mean_mbps", summary.trimmed_mean)
            .field("trimmed_each_end", summary.trimmed_count)
    }

    /// Add error information
    pub fn error_info(self, error: &AppError) -> Self {
        self.field("error_category", error.category())
            .field("error_recoverable", error.is_recoverable())
            .field("error_exit_code", error.exit_code())
    }

    pub async fn log(self) {
        self.logger.write_entry(self.entry).await;
    }

    #[cfg(test)]
    fn into_entry(self) -> LogEntry {
        self.entry
    }
}

/// Domain logger for one orchestrator
///
/// `for_run` returns a copy bound to a run ID with its own context; every
/// line it writes carries that ID as correlation ID, and once a server is
/// selected, the server as a field.
#[derive(Clone)]
pub struct EngineLogger {
    logger: Logger,
    run_id: Option<String>,
}

impl EngineLogger {
    pub fn new(config: &Config) -> Self {
        Self::from_logger(Logger::with_config("ENGINE".to_string(), config))
    }

    pub fn from_logger(logger: Logger) -> Self {
        Self { logger, run_id: None }
    }

    /// Logger that never prints below warn level
    pub fn quiet() -> Self {
        let mut logger = Logger::new("ENGINE".to_string());
        logger.set_level(LogLevel::Warn);
        logger.set_color(false);
        Self::from_logger(logger)
    }

    pub fn for_run(&self, run_id: &str) -> Self {
        Self {
            logger: self.logger.scoped(),
            run_id: Some(run_id.to_string()),
        }
    }

    pub fn run_id(&self) -> Option<&str> {
        self.run_id.as_deref()
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    fn at(&self, level: LogLevel, message: &str) -> LogEntryBuilder<'_> {
        self.logger.log(level, message).maybe_correlation_id(self.run_id())
    }

    pub async fn log_run_started(&self, candidates: usize) {
        self.at(LogLevel::Info, "Speed test started")
            .field("server_candidates", candidates)
            .log()
            .await;
    }

    pub async fn log_server_selected(&self, server: &str, latency_ms: Option<f64>) {
        self.at(LogLevel::Info, &format!("Selected server {}", server))
            .field("probe_latency_ms", latency_ms)
            .log()
            .await;
        self.logger.add_context_field("server".to_string(), server).await;
    }

    pub async fn log_no_server_answered(&self, candidates: usize, fallback: &str) {
        self.at(
            LogLevel::Warn,
            &format!("None of {} servers answered; using {}", candidates, fallback),
        )
        .field("server_candidates", candidates)
        .log()
        .await;
    }

    pub async fn log_server_unreachable(&self, server: &str) {
        self.at(LogLevel::Warn, &format!("Server {} did not answer any probe", server))
            .field("server", server)
            .log()
            .await;
    }

    pub async fn log_phase(&self, phase: TestPhase) {
        self.at(LogLevel::Info, &format!("Entering {} phase", phase))
            .field("phase", phase)
            .log()
            .await;
    }

    pub async fn log_latency(&self, ping_ms: f64, jitter_ms: f64, fallback_used: bool) {
        let level = if fallback_used { LogLevel::Warn } else { LogLevel::Info };
        let message = if fallback_used {
            "Every latency probe failed; reporting fallback latency"
        } else {
            "Latency measured"
        };
        self.at(level, message)
            .field("ping_ms", ping_ms)
            .field("jitter_ms", jitter_ms)
            .log()
            .await;
    }

    pub async fn log_chunk(&self, direction: Direction, bytes: u64, elapsed_ms: f64, speed_mbps: f64) {
        self.at(LogLevel::Debug, &format!("{} chunk complete", direction))
            .field("direction", direction)
            .field("bytes", bytes)
            .field("elapsed_ms", elapsed_ms)
            .field("speed_mbps", speed_mbps)
            .log()
            .await;
    }

    pub async fn log_chunk_failure(&self, direction: Direction, reason: &str) {
        self.at(LogLevel::Debug, &format!("{} chunk skipped: {}", direction, reason))
            .field("direction", direction)
            .log()
            .await;
    }

    pub async fn log_window_summary(&self, direction: Direction, summary: &WindowSummary) {
        let level = if summary.count == 0 { LogLevel::Warn } else { LogLevel::Info };
        let message = if summary.count == 0 {
            format!("{} window collected no samples", direction)
        } else {
            format!("{} window reduced", direction)
        };
        self.at(level, &message)
            .field("direction", direction)
            .window(summary)
            .log()
            .await;
    }

    pub async fn log_run_completed(&self, result: &TestResult) {
        self.at(LogLevel::Info, "Speed test complete")
            .field("server", &result.server)
            .field("download_mbps", result.download_mbps)
            .field("upload_mbps", result.upload_mbps)
            .field("ping_ms", result.ping_ms)
            .field("jitter_ms", result.jitter_ms)
            .log()
            .await;
    }

    pub async fn log_run_cancelled(&self, during: TestPhase) {
        self.at(LogLevel::Info, &format!("Speed test cancelled during {} phase", during))
            .field("phase", during)
            .log()
            .await;
    }

    pub async fn log_run_failed(&self, error: &AppError) {
        self.at(LogLevel::Error, &format!("Speed test failed: {}", error))
            .error_info(error)
            .log()
            .await;
    }

    pub async fn log_sink_failure(&self, sink: &str, error: &AppError) {
        self.at(LogLevel::Warn, &format!("Result sink '{}' failed: {}", sink, error))
            .field("sink", sink)
            .error_info(error)
            .log()
            .await;
    }
}

/// Debug line tagged with the call site
#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)*) => {
        $logger.debug(&format!($($arg)*))
            .location(file!(), line!(), Some(module_path!()))
            .log()
            .await
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sample_entry() -> LogEntry {
        LogEntry {
            timestamp: Utc::now(),
            level: LogLevel::Info,
            message: "Download window reduced".to_string(),
            logger: "ENGINE".to_string(),
            correlation_id: Some("3f2a9c1e-0000-4000-8000-000000000000".to_string()),
            fields: {
                let mut map = HashMap::new();
                map.insert("samples".to_string(), serde_json::json!(12));
                map
            },
            location: None,
        }
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from_str("DEBUG").unwrap(), LogLevel::Debug);
        assert_eq!(LogLevel::from_str("info").unwrap(), LogLevel::Info);
        assert_eq!(LogLevel::from_str("warning").unwrap(), LogLevel::Warn);
        assert!(LogLevel::from_str("loud").is_err());
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
    }

    #[test]
    fn test_logger_with_config() {
        let config = Config {
            debug: true,
            enable_color: false,
            ..Default::default()
        };
        let logger = Logger::with_config("TEST".to_string(), &config);
        assert_eq!(logger.min_level, LogLevel::Debug);
        assert_eq!(logger.format, LogFormat::Json);
        assert!(!logger.use_color);
        assert!(logger.include_location);

        let verbose = Config { verbose: true, ..Default::default() };
        assert_eq!(Logger::with_config("TEST".to_string(), &verbose).min_level, LogLevel::Info);

        let quiet = Logger::with_config("TEST".to_string(), &Config::default());
        assert_eq!(quiet.min_level, LogLevel::Warn);
    }

    #[tokio::test]
    async fn test_context_is_shared_between_clones() {
        let logger = Logger::new("TEST".to_string());
        let clone = logger.clone();
        clone.add_context_field("server".to_string(), "https://speed.example.net").await;
        assert!(logger.context.read().await.context_fields.contains_key("server"));

        let scoped = logger.scoped();
        assert!(scoped.context.read().await.context_fields.is_empty());
    }

    #[tokio::test]
    async fn test_run_scope_carries_selected_server() {
        let engine = EngineLogger::quiet();
        let run = engine.for_run("run-1");
        run.log_server_selected("https://speed.example.net", Some(12.0)).await;

        let context = run.logger().context.read().await;
        assert_eq!(context.context_fields["server"], serde_json::json!("https://speed.example.net"));
        drop(context);
        assert!(engine.logger().context.read().await.context_fields.is_empty());

        let next = engine.for_run("run-2");
        assert!(next.logger().context.read().await.context_fields.is_empty());
    }

    #[test]
    fn test_log_formats() {
        let entry = sample_entry();
        let mut logger = Logger::new("TEST".to_string());
        logger.set_color(false);

        let console = logger.format_console(&entry);
        assert!(console.contains("INFO"));
        assert!(console.contains("Download window reduced"));
        assert!(console.contains("[3f2a9c1e]"));
        assert!(console.contains("samples=12"));

        let json = logger.format_json(&entry);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["level"], "Info");
    }

    #[test]
    fn test_short_correlation_id_does_not_panic() {
        let mut entry = sample_entry();
        entry.correlation_id = Some("abc".to_string());
        let output = Logger::new("TEST".to_string()).format_console(&entry);
        assert!(output.contains("[abc]"));
    }

    #[test]
    fn test_builder_fields() {
        let logger = Logger::new("TEST".to_string());
        let summary = WindowSummary {
            count: 20,
            min: 40.0,
            max: 10_000.0,
            mean: 547.5,
            trimmed_mean: 50.0,
            trimmed_count: 2,
        };
        let entry = logger
            .log(LogLevel::Info, "window")
            .maybe_correlation_id(Some("run-1"))
            .window(&summary)
            .error_info(&AppError::timeout("chunk"))
            .into_entry();

        assert_eq!(entry.correlation_id.as_deref(), Some("run-1"));
        assert_eq!(entry.fields["trimmed_each_end"], serde_json::json!(2));
        assert_eq!(entry.fields["error_category"], serde_json::json!("TIMEOUT"));
    }

    #[test]
    fn test_engine_logger_binds_run_id() {
        let engine = EngineLogger::quiet();
        assert!(engine.run_id().is_none());

        let bound = engine.for_run("0b5e7a3c");
        assert_eq!(bound.run_id(), Some("0b5e7a3c"));
        let entry = bound.at(LogLevel::Info, "x").into_entry();
        assert_eq!(entry.correlation_id.as_deref(), Some("0b5e7a3c"));
        assert_eq!(entry.logger, "ENGINE");
    }

    #[tokio::test]
    async fn test_engine_logging_calls() {
        let engine = EngineLogger::quiet().for_run("run");
        let summary = WindowSummary {
            count: 0,
            min: 0.0,
            max: 0.0,
            mean: 0.0,
            trimmed_mean: 0.0,
            trimmed_count: 0,
        };

        engine.log_run_started(2).await;
        engine.log_no_server_answered(2, "https://a.example").await;
        engine.log_phase(TestPhase::Ping).await;
        engine.log_latency(12.5, 1.2, false).await;
        engine.log_chunk(Direction::Download, 1024, 3.0, 2.7).await;
        engine.log_chunk_failure(Direction::Upload, "timed out").await;
        engine.log_window_summary(Direction::Download, &summary).await;
        engine.log_run_cancelled(TestPhase::Upload).await;
        engine.log_sink_failure("results.jsonl", &AppError::io("read-only")).await;
    }

    #[tokio::test]
    async fn test_logging_macros() {
        let logger = Logger::new("TEST".to_string());
        crate::log_debug!(logger, "chunk {} of {}", 1, 4);
        crate::log_debug!(logger, "phase {}", TestPhase::Download);
    }
}
