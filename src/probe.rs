//! Latency prober: round-trip time and jitter
//!
//! A latency measurement is `ping_count` sequential probes, each bounded by
//! `ping_timeout`. Failed or timed-out probes are skipped (not retried and
//! not counted); the measurement is the mean of the probes that succeeded.

use crate::{cancel::CancellationToken, client::SpeedTestTransport, models::Config};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;

/// Probe counts and timings
#[derive(Debug, Clone, PartialEq)]
pub struct LatencyPolicy {
    pub ping_count: u32,
    pub ping_timeout: Duration,
    /// Reported by `measure_latency` when no probe succeeds
    pub fallback_ms: f64,
    pub jitter_readings: u32,
    pub jitter_interval: Duration,
}

impl Default for LatencyPolicy {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for LatencyPolicy {
    fn from(config: &Config) -> Self {
        Self {
            ping_count: config.ping_count,
            ping_timeout: config.ping_timeout(),
            fallback_ms: config.ping_fallback_ms,
            jitter_readings: config.jitter_readings,
            jitter_interval: Duration::from_millis(config.jitter_interval_ms),
        }
    }
}

/// Measures round-trip latency against one transport
pub struct LatencyProber {
    transport: Arc<dyn SpeedTestTransport>,
    policy: LatencyPolicy,
}

impl LatencyProber {
    pub fn new(transport: Arc<dyn SpeedTestTransport>, policy: LatencyPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> &LatencyPolicy {
        &self.policy
    }

    /// Mean RTT in milliseconds, or the fallback sentinel if every probe failed
    pub async fn measure_latency(&self, cancel: &CancellationToken) -> f64 {
        self.try_measure_latency(cancel)
            .await
            .unwrap_or(self.policy.fallback_ms)
    }

    /// Mean RTT in milliseconds; `None` when no probe succeeded
    pub async fn try_measure_latency(&self, cancel: &CancellationToken) -> Option<f64> {
        let mut rtts = Vec::with_capacity(self.policy.ping_count as usize);

        for _ in 0..self.policy.ping_count {
            let start = Instant::now();
            let probe = timeout(self.policy.ping_timeout, self.transport.ping());
            match cancel.run_until_cancelled(probe).await {
                None => break,
                Some(Ok(Ok(()))) => rtts.push(start.elapsed().as_secs_f64() * 1000.0),
                // Failed or timed out: skipped, not retried
                Some(Ok(Err(_))) | Some(Err(_)) => {}
            }
        }

        if rtts.is_empty() {
            None
        } else {
            Some(rtts.iter().sum::<f64>() / rtts.len() as f64)
        }
    }

    /// Mean absolute difference between consecutive latency readings
    ///
    /// Readings where every probe failed are left out. Fewer than two
    /// successful readings yield 0.
    pub async fn measure_jitter(&self, cancel: &CancellationToken) -> f64 {
        let mut readings = Vec::with_capacity(self.policy.jitter_readings as usize);

        for i in 0..self.policy.jitter_readings {
            if i > 0 && cancel.sleep(self.policy.jitter_interval).await.is_err() {
                break;
            }
            if cancel.is_cancelled() {
                break;
            }
            if let Some(reading) = self.try_measure_latency(cancel).await {
                readings.push(reading);
            }
        }

        jitter_from_readings(&readings)
    }
}

/// Mean absolute difference of consecutive readings; 0 below two readings
pub fn jitter_from_readings(readings: &[f64]) -> f64 {
    if readings.len() < 2 {
        return 0.0;
    }
    let total: f64 = readings.windows(2).map(|pair| (pair[1] - pair[0]).abs()).sum();
    total / (readings.len() - 1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::{Behavior, ScriptedTransport};

    fn policy(ping_count: u32, timeout_ms: u64) -> LatencyPolicy {
        LatencyPolicy {
            ping_count,
            ping_timeout: Duration::from_millis(timeout_ms),
            fallback_ms: 9999.0,
            jitter_readings: 5,
            jitter_interval: Duration::from_millis(5),
        }
    }

    fn respond(ms: u64) -> Behavior {
        Behavior::Respond(Duration::from_millis(ms))
    }

    #[test]
    fn test_policy_from_default_config() {
        let policy = LatencyPolicy::default();
        assert_eq!(policy.ping_count, 5);
        assert_eq!(policy.ping_timeout, Duration::from_millis(5000));
        assert_eq!(policy.fallback_ms, 9999.0);
        assert_eq!(policy.jitter_readings, 5);
        assert_eq!(policy.jitter_interval, Duration::from_millis(100));
    }

    #[test]
    fn test_jitter_from_readings() {
        assert_eq!(jitter_from_readings(&[]), 0.0);
        assert_eq!(jitter_from_readings(&[20.0]), 0.0);
        assert_eq!(jitter_from_readings(&[10.0, 14.0, 12.0]), 3.0);
        assert_eq!(jitter_from_readings(&[30.0, 30.0, 30.0]), 0.0);
    }

    #[tokio::test]
    async fn test_timed_out_probes_are_skipped() {
        // Three of five probes time out; the result is the mean of the other two
        let transport = Arc::new(ScriptedTransport::new("scripted").with_pings(vec![
            respond(10),
            Behavior::Hang,
            respond(30),
            Behavior::Hang,
            Behavior::Hang,
        ]));
        let prober = LatencyProber::new(transport.clone(), policy(5, 100));

        let latency = prober.measure_latency(&CancellationToken::new()).await;
        assert_ne!(latency, 9999.0);
        assert!(latency >= 10.0 && latency < 100.0, "latency = {}", latency);
        assert_eq!(transport.pings(), 5);
    }

    #[tokio::test]
    async fn test_failed_probes_are_not_retried() {
        let transport = Arc::new(
            ScriptedTransport::new("scripted")
                .with_pings(vec![Behavior::Fail, respond(1), Behavior::Fail]),
        );
        let prober = LatencyProber::new(transport.clone(), policy(3, 500));

        assert!(prober.try_measure_latency(&CancellationToken::new()).await.is_some());
        assert_eq!(transport.pings(), 3);
    }

    #[tokio::test]
    async fn test_all_probes_failing_yields_sentinel() {
        let transport = Arc::new(ScriptedTransport::new("scripted").with_ping_default(Behavior::Fail));
        let prober = LatencyProber::new(transport, policy(5, 100));
        let cancel = CancellationToken::new();

        assert_eq!(prober.try_measure_latency(&cancel).await, None);
        assert_eq!(prober.measure_latency(&cancel).await, 9999.0);
    }

    #[tokio::test]
    async fn test_cancel_stops_issuing_probes() {
        let transport = Arc::new(ScriptedTransport::new("scripted").with_ping_default(Behavior::Hang));
        let prober = LatencyProber::new(transport.clone(), policy(5, 10_000));
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            canceller.cancel();
        });

        let start = Instant::now();
        assert_eq!(prober.try_measure_latency(&cancel).await, None);
        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(transport.pings(), 1);
    }

    #[tokio::test]
    async fn test_jitter_skips_failed_readings() {
        // Each reading is a single probe: 5ms, fail, 25ms, fail, 15ms
        let transport = Arc::new(ScriptedTransport::new("scripted").with_pings(vec![
            respond(5),
            Behavior::Fail,
            respond(25),
            Behavior::Fail,
            respond(15),
        ]));
        let prober = LatencyProber::new(transport.clone(), policy(1, 1000));

        let jitter = prober.measure_jitter(&CancellationToken::new()).await;
        assert_eq!(transport.pings(), 5);
        // Roughly (|25-5| + |15-25|) / 2 = 15, with scheduling slack
        assert!(jitter > 5.0 && jitter < 40.0, "jitter = {}", jitter);
    }

    #[tokio::test]
    async fn test_jitter_with_one_reading_is_zero() {
        let transport = Arc::new(
            ScriptedTransport::new("scripted")
                .with_pings(vec![respond(3)])
                .with_ping_default(Behavior::Fail),
        );
        let prober = LatencyProber::new(transport, policy(1, 1000));
        assert_eq!(prober.measure_jitter(&CancellationToken::new()).await, 0.0);
    }
}
