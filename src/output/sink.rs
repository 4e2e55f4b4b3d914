//! Destinations for completed results

use crate::{
    error::{AppError, Result},
    models::TestResult,
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Receives every completed `TestResult` exactly once
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Short name used in log lines
    fn name(&self) -> &str;

    async fn record(&self, result: &TestResult) -> Result<()>;
}

/// Appends one JSON object per line to a file
pub struct JsonLinesSink {
    path: PathBuf,
    label: String,
}

impl JsonLinesSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let label = path.display().to_string();
        Self { path, label }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ResultSink for JsonLinesSink {
    fn name(&self) -> &str {
        &self.label
    }

    async fn record(&self, result: &TestResult) -> Result<()> {
        let mut line = serde_json::to_string(result)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| AppError::io(format!("Cannot open {}: {}", self.label, e)))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| AppError::io(format!("Cannot write {}: {}", self.label, e)))?;
        file.flush().await?;
        Ok(())
    }
}
