//! Throughput sampler: a fixed wall-clock window of chunk transfers
//!
//! The sampler keeps transferring chunks of `chunk_size` bytes until the
//! window duration has elapsed or the run is cancelled, recording one
//! [`Sample`] per successful chunk. A chunk that errors or exceeds
//! `chunk_timeout` is skipped; the sampler backs off briefly and moves on.
//! The window is always returned, even when it is empty.

use crate::{
    cancel::CancellationToken,
    client::{opaque_payload, SpeedTestTransport},
    logging::EngineLogger,
    models::{Config, Sample, SampleWindow},
    types::Direction,
};
use bytes::Bytes;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;

/// Window and chunk parameters for one direction
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerSettings {
    pub duration: Duration,
    pub chunk_size: u64,
    pub chunk_timeout: Duration,
    pub failure_backoff: Duration,
}

impl SamplerSettings {
    pub fn download(config: &Config) -> Self {
        Self {
            duration: Duration::from_millis(config.download_duration_ms),
            chunk_size: config.download_chunk_bytes,
            chunk_timeout: config.chunk_timeout(),
            failure_backoff: Duration::from_millis(config.failure_backoff_ms),
        }
    }

    pub fn upload(config: &Config) -> Self {
        Self {
            duration: Duration::from_millis(config.upload_duration_ms),
            chunk_size: config.upload_chunk_bytes,
            chunk_timeout: config.chunk_timeout(),
            failure_backoff: Duration::from_millis(config.failure_backoff_ms),
        }
    }

    pub fn for_direction(direction: Direction, config: &Config) -> Self {
        match direction {
            Direction::Download => Self::download(config),
            Direction::Upload => Self::upload(config),
        }
    }
}

/// Reported after every successful chunk
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkProgress {
    pub direction: Direction,
    /// Speed of this chunk alone
    pub speed_mbps: f64,
    /// Share of the window already elapsed, in `[0, 1]`
    pub fraction_elapsed: f64,
    pub samples_collected: usize,
}

/// Runs download and upload windows against one transport
pub struct ThroughputSampler {
    transport: Arc<dyn SpeedTestTransport>,
    logger: Option<EngineLogger>,
}

impl ThroughputSampler {
    pub fn new(transport: Arc<dyn SpeedTestTransport>) -> Self {
        Self {
            transport,
            logger: None,
        }
    }

    pub fn with_logger(mut self, logger: EngineLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Collect one window of samples
    ///
    /// On cancellation the in-flight chunk is dropped and no partial
    /// sample is recorded.
    pub async fn sample<F>(
        &self,
        direction: Direction,
        settings: &SamplerSettings,
        cancel: &CancellationToken,
        mut on_chunk: F,
    ) -> SampleWindow
    where
        F: FnMut(ChunkProgress),
    {
        let mut window = SampleWindow::new(direction);
        let opened = Instant::now();
        // Generated once and shared by every upload chunk
        let payload = match direction {
            Direction::Upload => Bytes::from(opaque_payload(settings.chunk_size as usize)),
            Direction::Download => Bytes::new(),
        };

        while opened.elapsed() < settings.duration && !cancel.is_cancelled() {
            let started = Instant::now();
            let transfer = async {
                match direction {
                    Direction::Download => self.transport.download(settings.chunk_size).await,
                    Direction::Upload => self.transport.upload(payload.clone()).await,
                }
            };

            let outcome = match cancel.run_until_cancelled(timeout(settings.chunk_timeout, transfer)).await {
                None => break,
                Some(outcome) => outcome,
            };
            let elapsed = started.elapsed();

            let failure = match outcome {
                Ok(Ok(bytes)) if bytes > 0 && !elapsed.is_zero() => {
                    let speed_mbps = Sample::speed_mbps(bytes, elapsed);
                    window.push(Sample::new(speed_mbps, opened.elapsed()));

                    if let Some(logger) = &self.logger {
                        logger
                            .log_chunk(direction, bytes, elapsed.as_secs_f64() * 1000.0, speed_mbps)
                            .await;
                    }

                    on_chunk(ChunkProgress {
                        direction,
                        speed_mbps,
                        fraction_elapsed: fraction(opened.elapsed(), settings.duration),
                        samples_collected: window.len(),
                    });
                    None
                }
                Ok(Ok(_)) => Some("empty transfer".to_string()),
                Ok(Err(e)) => Some(e.to_string()),
                Err(_) => Some(format!("exceeded {}ms", settings.chunk_timeout.as_millis())),
            };

            if let Some(reason) = failure {
                if let Some(logger) = &self.logger {
                    logger.log_chunk_failure(direction, &reason).await;
                }
                if !settings.failure_backoff.is_zero()
                    && cancel.sleep(settings.failure_backoff).await.is_err()
                {
                    break;
                }
            }
        }

        window
    }
}

fn fraction(elapsed: Duration, total: Duration) -> f64 {
    if total.is_zero() {
        return 1.0;
    }
    (elapsed.as_secs_f64() / total.as_secs_f64()).clamp(0.0, 1.0)
}
