//! HTTP transport for speed test endpoints
//!
//! The engine never talks to reqwest directly; it drives a
//! [`SpeedTestTransport`]. [`HttpTransport`] is the production
//! implementation against a Cloudflare-style server exposing a download
//! endpoint (`GET {path}?bytes=N`) and an upload endpoint (`POST {path}`).

#[cfg(test)]
pub(crate) mod testing;

use crate::{
    error::{AppError, Result},
    models::Config,
};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::{Client, Url};
use std::time::Duration;

/// One round trip, one download chunk or one upload chunk against a server
///
/// Implementations must be cancel-safe: the engine drops the returned
/// future to abort an in-flight transfer.
#[async_trait]
pub trait SpeedTestTransport: Send + Sync {
    /// Base URL of the server this transport talks to
    fn server_url(&self) -> &str;

    /// Minimal request used for latency probing
    async fn ping(&self) -> Result<()>;

    /// Fetch `bytes` bytes and consume the whole body; returns bytes received
    async fn download(&self, bytes: u64) -> Result<u64>;

    /// Send `payload`; returns bytes sent once the server acknowledged them
    ///
    /// Callers reuse one buffer across chunks, so clones are refcount bumps.
    async fn upload(&self, payload: Bytes) -> Result<u64>;
}

/// A speed test server and its endpoints
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedTestServer {
    pub base_url: Url,
    pub download_path: String,
    pub upload_path: String,
}

impl SpeedTestServer {
    /// Parse a server base URL using the default endpoint paths
    pub fn parse(base_url: &str) -> Result<Self> {
        Self::with_paths(
            base_url,
            crate::defaults::DEFAULT_DOWNLOAD_PATH,
            crate::defaults::DEFAULT_UPLOAD_PATH,
        )
    }

    pub fn with_paths(base_url: &str, download_path: &str, upload_path: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.scheme() != "http" && base_url.scheme() != "https" {
            return Err(AppError::validation(format!(
                "Unsupported scheme '{}' for speed test server",
                base_url.scheme()
            )));
        }
        if base_url.host_str().is_none() {
            return Err(AppError::validation("Speed test server URL must have a host"));
        }

        Ok(Self {
            base_url,
            download_path: download_path.to_string(),
            upload_path: upload_path.to_string(),
        })
    }

    /// Download URL for a payload of `bytes`
    pub fn download_url(&self, bytes: u64) -> Result<Url> {
        let mut url = self.base_url.join(&self.download_path)?;
        url.query_pairs_mut().append_pair("bytes", &bytes.to_string());
        Ok(url)
    }

    pub fn upload_url(&self) -> Result<Url> {
        Ok(self.base_url.join(&self.upload_path)?)
    }
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: Client,
    server: SpeedTestServer,
    server_label: String,
}

impl HttpTransport {
    /// Create a transport for `server`
    ///
    /// No overall request timeout is set on the client: the prober and the
    /// sampler bound every call themselves.
    pub fn new(server: SpeedTestServer) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("{}/{}", crate::PKG_NAME, crate::VERSION))
            .build()
            .map_err(|e| AppError::network(format!("Failed to create HTTP client: {}", e)))?;

        let server_label = server.base_url.as_str().trim_end_matches('/').to_string();
        Ok(Self {
            client,
            server,
            server_label,
        })
    }

    /// One transport per configured server URL, in configuration order
    pub fn from_config(config: &Config) -> Result<Vec<Self>> {
        config
            .server_urls
            .iter()
            .map(|url| {
                let server =
                    SpeedTestServer::with_paths(url, &config.download_path, &config.upload_path)?;
                Self::new(server)
            })
            .collect()
    }

    pub fn server(&self) -> &SpeedTestServer {
        &self.server
    }

    fn ensure_success(url: &Url, status: reqwest::StatusCode) -> Result<()> {
        if status.is_success() {
            Ok(())
        } else {
            Err(AppError::http_request(format!("{} returned HTTP {}", url, status)))
        }
    }
}

#[async_trait]
impl SpeedTestTransport for HttpTransport {
    fn server_url(&self) -> &str {
        &self.server_label
    }

    async fn ping(&self) -> Result<()> {
        let url = self.server.download_url(0)?;
        let response = self.client.get(url.clone()).send().await?;
        Self::ensure_success(&url, response.status())?;
        // Drain so the connection can be reused by the next probe
        response.bytes().await?;
        Ok(())
    }

    async fn download(&self, bytes: u64) -> Result<u64> {
        let url = self.server.download_url(bytes)?;
        let response = self.client.get(url.clone()).send().await?;
        Self::ensure_success(&url, response.status())?;

        let mut received: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk
                .map_err(|e| AppError::http_request(format!("Download stream error: {}", e)))?;
            received += chunk.len() as u64;
        }

        Ok(received)
    }

    async fn upload(&self, payload: Bytes) -> Result<u64> {
        let url = self.server.upload_url()?;
        let sent = payload.len() as u64;
        let response = self
            .client
            .post(url.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(payload)
            .send()
            .await?;
        Self::ensure_success(&url, response.status())?;
        response.bytes().await?;
        Ok(sent)
    }
}

/// Locally generated upload body
///
/// xorshift64 output rather than zeros so that transparent compression on
/// the path cannot inflate the measured upload speed.
pub fn opaque_payload(size: usize) -> Vec<u8> {
    let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
    let mut payload = Vec::with_capacity(size);
    while payload.len() < size {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        let remaining = size - payload.len();
        let bytes = state.to_le_bytes();
        payload.extend_from_slice(&bytes[..remaining.min(bytes.len())]);
    }
    payload
}
