//! ReplayFileSource - serves records from a JSON Lines file
//!
//! Each line is `{ "timestamp": RFC3339, "key": optional string, "payload": object | string }`.
//! A line without `timestamp` is stamped when it is polled, so a replay file can stand
//! in for a live topic. String payloads are handed to the decoder verbatim.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use contracts::{ContractError, RawRecord, StreamConfig, StreamSource};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::error::{IngestionError, Result};
use crate::metrics::SourceMetrics;

#[derive(Debug, Deserialize)]
struct ReplayLine {
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    key: Option<String>,
    payload: Value,
}

/// Stream source replaying a JSON Lines file
pub struct ReplayFileSource {
    name: String,
    path: PathBuf,
    lines: Vec<String>,
    cursor: usize,
    batch_size: usize,
    metrics: Arc<SourceMetrics>,
}

impl ReplayFileSource {
    /// Read the whole file up front
    #[instrument(name = "replay_source_open", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn open(
        name: impl Into<String>,
        path: impl AsRef<Path>,
        batch_size: usize,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| IngestionError::ReplayOpen {
                path: path.display().to_string(),
                source,
            })?;
        let lines: Vec<String> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        info!(lines = lines.len(), "Replay file loaded");
        Ok(Self {
            name: name.into(),
            path,
            lines,
            cursor: 0,
            batch_size: batch_size.max(1),
            metrics: Arc::new(SourceMetrics::new()),
        })
    }

    /// Open from the `[stream]` section (`params.path`)
    pub async fn from_config(config: &StreamConfig) -> Result<Self> {
        let name = if config.topic.is_empty() {
            "replay_file".to_string()
        } else {
            config.topic.clone()
        };
        let path = config
            .params
            .get("path")
            .filter(|path| !path.trim().is_empty())
            .ok_or_else(|| IngestionError::MissingParam {
                source_name: name.clone(),
                param: "path",
            })?;
        Self::open(name, path, config.batch_size).await
    }

    /// Shared metrics handle
    pub fn metrics(&self) -> Arc<SourceMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Lines not yet served
    pub fn remaining(&self) -> usize {
        self.lines.len().saturating_sub(self.cursor)
    }

    fn parse_line(&self, line_no: usize, line: &str) -> Option<RawRecord> {
        let parsed: ReplayLine = match serde_json::from_str(line) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    line = line_no + 1,
                    error = %e,
                    "Skipping malformed replay line"
                );
                self.metrics.record_malformed();
                return None;
            }
        };

        let payload = match parsed.payload {
            Value::String(text) => Bytes::from(text),
            other => Bytes::from(other.to_string()),
        };
        Some(RawRecord {
            timestamp: parsed.timestamp.unwrap_or_else(Utc::now),
            key: parsed.key,
            payload,
        })
    }
}

impl StreamSource for ReplayFileSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn poll(&mut self, max_wait: Duration) -> std::result::Result<Vec<RawRecord>, ContractError> {
        if self.cursor >= self.lines.len() {
            // Exhausted: behave like an idle topic.
            tokio::time::sleep(max_wait).await;
            self.metrics.record_poll(0);
            return Ok(Vec::new());
        }

        let end = (self.cursor + self.batch_size).min(self.lines.len());
        let batch: Vec<RawRecord> = (self.cursor..end)
            .filter_map(|idx| self.parse_line(idx, &self.lines[idx]))
            .collect();
        self.cursor = end;

        self.metrics.record_poll(batch.len());
        debug!(source = %self.name, records = batch.len(), remaining = self.remaining(), "Replay batch");
        Ok(batch)
    }

    async fn close(&mut self) -> std::result::Result<(), ContractError> {
        debug!(source = %self.name, unread = self.remaining(), "Replay source closed");
        self.lines.clear();
        self.cursor = 0;
        Ok(())
    }
}
