//! Scripted in-memory transport for deterministic engine tests

use super::SpeedTestTransport;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// What one scripted call does
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Behavior {
    /// Succeed after the given delay
    Respond(Duration),
    /// Fail immediately with a network error
    Fail,
    /// Never complete
    Hang,
}

impl Behavior {
    async fn perform(self) -> Result<()> {
        match self {
            Behavior::Respond(delay) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Ok(())
            }
            Behavior::Fail => Err(AppError::network("scripted failure")),
            Behavior::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }
}

/// Transport whose calls follow a script
///
/// Ping behaviours are consumed from a queue and fall back to
/// `ping_default` once it runs dry. Every download/upload call uses the
/// same behaviour.
pub struct ScriptedTransport {
    url: String,
    pings: Mutex<VecDeque<Behavior>>,
    ping_default: Behavior,
    download: Behavior,
    upload: Behavior,
    /// Bytes reported per download; `None` echoes the requested size
    download_bytes: Option<u64>,
    pub ping_calls: AtomicUsize,
    pub download_calls: AtomicUsize,
    pub upload_calls: AtomicUsize,
    /// Start address of each uploaded buffer
    upload_buffers: Mutex<Vec<usize>>,
}

impl ScriptedTransport {
    pub fn new(url: &str) -> Self {
        let fast = Behavior::Respond(Duration::from_millis(2));
        Self {
            url: url.to_string(),
            pings: Mutex::new(VecDeque::new()),
            ping_default: fast,
            download: fast,
            upload: fast,
            download_bytes: None,
            ping_calls: AtomicUsize::new(0),
            download_calls: AtomicUsize::new(0),
            upload_calls: AtomicUsize::new(0),
            upload_buffers: Mutex::new(Vec::new()),
        }
    }

    pub fn with_pings(self, script: Vec<Behavior>) -> Self {
        *self.pings.lock().unwrap() = script.into();
        self
    }

    pub fn with_ping_default(mut self, behavior: Behavior) -> Self {
        self.ping_default = behavior;
        self
    }

    pub fn with_download(mut self, behavior: Behavior) -> Self {
        self.download = behavior;
        self
    }

    pub fn with_upload(mut self, behavior: Behavior) -> Self {
        self.upload = behavior;
        self
    }

    pub fn with_download_bytes(mut self, bytes: u64) -> Self {
        self.download_bytes = Some(bytes);
        self
    }

    pub fn pings(&self) -> usize {
        self.ping_calls.load(Ordering::SeqCst)
    }

    pub fn downloads(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }

    pub fn uploads(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub fn upload_buffers(&self) -> Vec<usize> {
        self.upload_buffers.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeedTestTransport for ScriptedTransport {
    fn server_url(&self) -> &str {
        &self.url
    }

    async fn ping(&self) -> Result<()> {
        self.ping_calls.fetch_add(1, Ordering::SeqCst);
        let behavior = self
            .pings
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.ping_default);
        behavior.perform().await
    }

    async fn download(&self, bytes: u64) -> Result<u64> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        self.download.perform().await?;
        Ok(self.download_bytes.unwrap_or(bytes))
    }

    async fn upload(&self, payload: Bytes) -> Result<u64> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        self.upload_buffers.lock().unwrap().push(payload.as_ptr() as usize);
        self.upload.perform().await?;
        Ok(payload.len() as u64)
    }
}
