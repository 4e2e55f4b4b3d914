//! Choosing the server to measure against
//!
//! The first `max_candidates` servers are probed one after another and the
//! lowest mean round trip wins. A lone candidate is used without probing.
//! When no candidate answers, the first one is used and the ping phase
//! reports the fallback latency, same as a lone dead server.

use crate::{
    cancel::{CancellationToken, Cancelled},
    client::SpeedTestTransport,
    error::AppError,
    logging::EngineLogger,
    probe::{LatencyPolicy, LatencyProber},
};
use std::sync::Arc;

/// The server a run will measure
pub struct SelectedServer {
    pub transport: Arc<dyn SpeedTestTransport>,
    /// Mean probe latency, when probing happened
    pub latency_ms: Option<f64>,
}

/// Why no server could be selected
#[derive(Debug)]
pub enum SelectionError {
    Cancelled,
    Failed(AppError),
}

impl From<Cancelled> for SelectionError {
    fn from(_: Cancelled) -> Self {
        SelectionError::Cancelled
    }
}

pub async fn select_server(
    candidates: &[Arc<dyn SpeedTestTransport>],
    max_candidates: usize,
    policy: &LatencyPolicy,
    cancel: &CancellationToken,
    logger: &EngineLogger,
) -> Result<SelectedServer, SelectionError> {
    let considered = &candidates[..candidates.len().min(max_candidates.max(1))];

    match considered {
        [] => Err(SelectionError::Failed(AppError::config("No speed test servers configured"))),
        [only] => Ok(SelectedServer {
            transport: Arc::clone(only),
            latency_ms: None,
        }),
        _ => {
            let mut best: Option<(f64, &Arc<dyn SpeedTestTransport>)> = None;

            for candidate in considered {
                cancel.check()?;
                let prober = LatencyProber::new(Arc::clone(candidate), policy.clone());
                match prober.try_measure_latency(cancel).await {
                    Some(latency) => {
                        if best.map_or(true, |(lowest, _)| latency < lowest) {
                            best = Some((latency, candidate));
                        }
                    }
                    None => {
                        cancel.check()?;
                        logger.log_server_unreachable(candidate.server_url()).await;
                    }
                }
            }
            cancel.check()?;

            match best {
                Some((latency, transport)) => Ok(SelectedServer {
                    transport: Arc::clone(transport),
                    latency_ms: Some(latency),
                }),
                None => {
                    let first = &considered[0];
                    logger
                        .log_no_server_answered(considered.len(), first.server_url())
                        .await;
                    Ok(SelectedServer {
                        transport: Arc::clone(first),
                        latency_ms: None,
                    })
                }
            }
        }
    }
}
