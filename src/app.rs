//! Main application orchestration and execution

use crate::{
    cli::Cli,
    config::{display_config_summary, load_config, validate_config},
    error::{AppError, Result},
    executor::TestOrchestrator,
    log_debug,
    logging::Logger,
    models::{Config, TestOutcome},
    output::{GaugeRenderer, JsonLinesSink, OutputFormatterFactory},
};
use std::sync::Arc;

/// Exit code used when the user interrupts a run
pub const EXIT_CANCELLED: i32 = 130;

/// How a successful invocation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    Cancelled,
}

impl RunStatus {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Completed => 0,
            Self::Cancelled => EXIT_CANCELLED,
        }
    }
}

impl From<&TestOutcome> for RunStatus {
    fn from(outcome: &TestOutcome) -> Self {
        if outcome.is_completed() {
            Self::Completed
        } else {
            Self::Cancelled
        }
    }
}

/// Main application struct that coordinates all components
pub struct App {
    cli: Cli,
}

impl App {
    /// Create a new application instance with CLI configuration
    pub fn new(cli: Cli) -> Result<Self> {
        cli.validate().map_err(AppError::config)?;
        Ok(Self { cli })
    }

    /// Load configuration, run one speed test and print the outcome on stdout
    pub async fn run(self) -> Result<RunStatus> {
        let config = load_config(self.cli.clone())?;
        let warnings = validate_config(&config)?;

        let logger = Logger::with_config(crate::PKG_NAME.to_string(), &config);
        log_debug!(logger, "{}", crate::cli::Cli::version_info());
        log_debug!(logger, "Configuration:\n{}", display_config_summary(&config));

        for warning in &warnings {
            eprintln!("{}", warning.format(config.enable_color));
        }

        let orchestrator = Arc::new(self.build_orchestrator(&config)?);
        let interrupt = Self::cancel_on_ctrl_c(Arc::clone(&orchestrator));

        let outcome = orchestrator.run_test().await;
        interrupt.abort();
        let outcome = outcome?;

        let formatter = OutputFormatterFactory::from_config(&config, self.cli.json);
        println!("{}", formatter.format_outcome(&outcome)?);

        Ok(RunStatus::from(&outcome))
    }

    fn build_orchestrator(&self, config: &Config) -> Result<TestOrchestrator> {
        let mut orchestrator = TestOrchestrator::from_config(config.clone())?;

        if self.cli.show_gauge() {
            orchestrator = orchestrator.with_observer(Arc::new(GaugeRenderer::new(config.enable_color)));
        }

        if let Some(ref path) = config.results_file {
            orchestrator = orchestrator.with_sink(Arc::new(JsonLinesSink::new(path)));
        }

        Ok(orchestrator)
    }

    /// First Ctrl-C cancels the running test; the run then reports partial results
    fn cancel_on_ctrl_c(orchestrator: Arc<TestOrchestrator>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                orchestrator.cancel_test();
            }
        })
    }
}
