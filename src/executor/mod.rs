//! Test orchestrator: runs ping, download and upload in order
//!
//! This module contains:
//! - `TestOrchestrator`, the per-instance state machine
//!   `idle -> ping -> download -> upload -> complete`
//! - Progress publication through a `watch` channel and `ProgressObserver`s
//! - Server selection among configured candidates
//!
//! Cancellation and failure return the orchestrator to `idle` from any
//! phase. Only a fully completed run produces a `TestResult`.

pub mod progress;
pub mod server_selection;

pub use progress::{ProgressObserver, ProgressSplit};
pub use server_selection::{select_server, SelectedServer, SelectionError};

use crate::{
    cancel::{CancellationToken, Cancelled},
    client::{HttpTransport, SpeedTestTransport},
    error::{AppError, Result},
    logging::EngineLogger,
    models::{Config, PartialResult, ProgressSnapshot, TestOutcome, TestResult},
    output::sink::ResultSink,
    probe::{LatencyPolicy, LatencyProber},
    sampler::{SamplerSettings, ThroughputSampler},
    stats::{self, ReducerPolicy, WindowSummary},
    types::{Direction, TestPhase},
};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use uuid::Uuid;

/// Why a run stopped before completing
enum Interrupt {
    Cancelled,
    Failed(AppError),
}

impl From<Cancelled> for Interrupt {
    fn from(_: Cancelled) -> Self {
        Interrupt::Cancelled
    }
}

impl From<AppError> for Interrupt {
    fn from(error: AppError) -> Self {
        Interrupt::Failed(error)
    }
}

impl From<SelectionError> for Interrupt {
    fn from(error: SelectionError) -> Self {
        match error {
            SelectionError::Cancelled => Interrupt::Cancelled,
            SelectionError::Failed(e) => Interrupt::Failed(e),
        }
    }
}

/// Marks a run as active for the lifetime of `run_test`
///
/// Dropping it frees the slot; if the run never finished (the future was
/// dropped mid-phase) the published snapshot falls back to idle.
struct ActiveRun<'a> {
    slot: &'a Mutex<Option<CancellationToken>>,
    progress: &'a watch::Sender<ProgressSnapshot>,
    finished: bool,
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = None;
        }
        if !self.finished {
            self.progress.send_replace(ProgressSnapshot::idle());
        }
    }
}

/// Sequences one speed test at a time
pub struct TestOrchestrator {
    candidates: Vec<Arc<dyn SpeedTestTransport>>,
    config: Config,
    split: ProgressSplit,
    observers: Vec<Arc<dyn ProgressObserver>>,
    sinks: Vec<Arc<dyn ResultSink>>,
    logger: EngineLogger,
    progress: watch::Sender<ProgressSnapshot>,
    active: Mutex<Option<CancellationToken>>,
}

impl TestOrchestrator {
    /// Orchestrator measuring against a single transport
    pub fn new(transport: Arc<dyn SpeedTestTransport>, config: Config) -> Self {
        Self::with_candidates(vec![transport], config)
    }

    /// Orchestrator choosing among several servers by latency
    pub fn with_candidates(candidates: Vec<Arc<dyn SpeedTestTransport>>, config: Config) -> Self {
        let (progress, _) = watch::channel(ProgressSnapshot::idle());
        let logger = EngineLogger::new(&config);
        Self {
            candidates,
            config,
            split: ProgressSplit::default(),
            observers: Vec::new(),
            sinks: Vec::new(),
            logger,
            progress,
            active: Mutex::new(None),
        }
    }

    /// HTTP transports for every configured server
    pub fn from_config(config: Config) -> Result<Self> {
        config.validate()?;
        let candidates = HttpTransport::from_config(&config)?
            .into_iter()
            .map(|t| Arc::new(t) as Arc<dyn SpeedTestTransport>)
            .collect();
        Ok(Self::with_candidates(candidates, config))
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn with_logger(mut self, logger: EngineLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_progress_split(mut self, split: ProgressSplit) -> Self {
        self.split = split;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Live progress; the receiver always holds the latest snapshot
    pub fn subscribe(&self) -> watch::Receiver<ProgressSnapshot> {
        self.progress.subscribe()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        *self.progress.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.active.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }

    /// Cancel the running test; returns false when nothing was running
    pub fn cancel_test(&self) -> bool {
        match self.active.lock() {
            Ok(slot) => match slot.as_ref() {
                Some(token) => {
                    token.cancel();
                    true
                }
                None => false,
            },
            Err(_) => false,
        }
    }

    /// Run one full speed test
    ///
    /// Returns `Completed` with the result, or `Cancelled` with whatever
    /// phases had finished. Configuration errors are reported before any
    /// network traffic.
    pub async fn run_test(&self) -> Result<TestOutcome> {
        self.config.validate()?;
        if self.candidates.is_empty() {
            return Err(AppError::config("No speed test servers configured"));
        }

        let token = CancellationToken::new();
        let mut active = self.begin_run(token.clone())?;

        let run_id = Uuid::new_v4();
        let logger = self.logger.for_run(&run_id.to_string());
        let mut partial = PartialResult::default();

        let outcome = self.execute(run_id, &token, &logger, &mut partial).await;
        let interrupted_in = self.snapshot().phase;

        match outcome {
            Ok(result) => {
                self.complete(&result, &logger).await;
                active.finished = true;
                Ok(TestOutcome::Completed(result))
            }
            Err(Interrupt::Cancelled) => {
                self.reset_to_idle();
                logger.log_run_cancelled(interrupted_in).await;
                Ok(TestOutcome::Cancelled(partial))
            }
            Err(Interrupt::Failed(error)) => {
                self.reset_to_idle();
                logger.log_run_failed(&error).await;
                Err(error)
            }
        }
    }

    fn begin_run(&self, token: CancellationToken) -> Result<ActiveRun<'_>> {
        let mut slot = self
            .active
            .lock()
            .map_err(|_| AppError::internal("Orchestrator state lock poisoned"))?;
        if slot.is_some() {
            return Err(AppError::test_execution(
                "A speed test is already running on this orchestrator",
            ));
        }
        *slot = Some(token);
        Ok(ActiveRun {
            slot: &self.active,
            progress: &self.progress,
            finished: false,
        })
    }

    async fn execute(
        &self,
        run_id: Uuid,
        token: &CancellationToken,
        logger: &EngineLogger,
        partial: &mut PartialResult,
    ) -> std::result::Result<TestResult, Interrupt> {
        logger.log_run_started(self.candidates.len()).await;

        // Ping phase: server choice, latency, jitter
        self.enter_phase(TestPhase::Ping, logger).await;
        let policy = LatencyPolicy::from(&self.config);
        let fallback_ms = policy.fallback_ms;
        let selected = select_server(
            &self.candidates,
            self.config.max_server_candidates,
            &policy,
            token,
            logger,
        )
        .await?;
        logger
            .log_server_selected(selected.transport.server_url(), selected.latency_ms)
            .await;

        let prober = LatencyProber::new(Arc::clone(&selected.transport), policy);
        let latency = prober.try_measure_latency(token).await;
        token.check()?;
        let ping_ms = latency.unwrap_or(fallback_ms);
        partial.ping_ms = Some(ping_ms);
        self.publish(TestPhase::Ping, 0.5, 0.0);

        let jitter_ms = prober.measure_jitter(token).await;
        token.check()?;
        partial.jitter_ms = Some(jitter_ms);
        logger.log_latency(ping_ms, jitter_ms, latency.is_none()).await;
        self.publish(TestPhase::Ping, 1.0, 0.0);

        // Throughput phases, each with its own window
        let sampler = ThroughputSampler::new(Arc::clone(&selected.transport)).with_logger(logger.clone());
        let download_mbps = self
            .measure_throughput(Direction::Download, &sampler, token, logger)
            .await?;
        partial.download_mbps = Some(download_mbps);

        let upload_mbps = self
            .measure_throughput(Direction::Upload, &sampler, token, logger)
            .await?;
        token.check()?;

        Ok(TestResult::new(
            run_id,
            selected.transport.server_url(),
            download_mbps,
            upload_mbps,
            ping_ms,
            jitter_ms,
        ))
    }

    async fn measure_throughput(
        &self,
        direction: Direction,
        sampler: &ThroughputSampler,
        token: &CancellationToken,
        logger: &EngineLogger,
    ) -> std::result::Result<f64, Interrupt> {
        let phase = direction.phase();
        self.enter_phase(phase, logger).await;

        let settings = SamplerSettings::for_direction(direction, &self.config);
        let window = sampler
            .sample(direction, &settings, token, |chunk| {
                self.publish(phase, chunk.fraction_elapsed, chunk.speed_mbps);
            })
            .await;
        // A cancelled window is discarded, never reduced
        token.check()?;

        let policy = ReducerPolicy::from(&self.config);
        let mbps = stats::reduce_with(&window, &policy);
        logger
            .log_window_summary(direction, &WindowSummary::from_window(&window, &policy))
            .await;
        self.publish(phase, 1.0, mbps);
        Ok(mbps)
    }

    async fn enter_phase(&self, phase: TestPhase, logger: &EngineLogger) {
        self.publish(phase, 0.0, 0.0);
        for observer in &self.observers {
            observer.on_phase_change(phase);
        }
        logger.log_phase(phase).await;
    }

    fn publish(&self, phase: TestPhase, fraction: f64, speed_mbps: f64) {
        let snapshot = ProgressSnapshot::new(phase, self.split.percent(phase, fraction), speed_mbps);
        self.progress.send_replace(snapshot);
        for observer in &self.observers {
            observer.on_progress(&snapshot);
        }
    }

    fn reset_to_idle(&self) {
        self.progress.send_replace(ProgressSnapshot::idle());
        for observer in &self.observers {
            observer.on_phase_change(TestPhase::Idle);
        }
    }

    async fn complete(&self, result: &TestResult, logger: &EngineLogger) {
        self.publish(TestPhase::Complete, 1.0, 0.0);
        for observer in &self.observers {
            observer.on_phase_change(TestPhase::Complete);
            observer.on_complete(result);
        }
        logger.log_run_completed(result).await;

        for sink in &self.sinks {
            if let Err(error) = sink.record(result).await {
                logger.log_sink_failure(sink.name(), &error).await;
            }
        }
    }
}
