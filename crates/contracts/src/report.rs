//! Verdicts and run summary - the output of a finished run.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::FieldMap;

/// Terminal per-row outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerdictStatus {
    Ok,
    Mismatch,
    NotFound,
    Conflict,
    SendFailed,
    Skipped,
}

impl VerdictStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictStatus::Ok => "OK",
            VerdictStatus::Mismatch => "MISMATCH",
            VerdictStatus::NotFound => "NOT_FOUND",
            VerdictStatus::Conflict => "CONFLICT",
            VerdictStatus::SendFailed => "SEND_FAILED",
            VerdictStatus::Skipped => "SKIPPED",
        }
    }
}

impl fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One failed field comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMismatch {
    pub field: String,
    pub expected: String,
    pub actual: String,
}

/// Verdict for one row (matched rows: one verdict per observed event)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub row_id: String,
    pub status: VerdictStatus,

    /// Failed fields in expectation order, empty unless MISMATCH
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mismatch_details: Vec<FieldMismatch>,

    /// Send failure reason or other diagnostic text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// Ambiguous candidate ids (CONFLICT only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<String>,

    /// Actual decoded values of the correlated event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<FieldMap>,

    /// Stream timestamp of the correlated event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_at: Option<DateTime<Utc>>,
}

impl Verdict {
    /// Verdict without any event attached
    pub fn bare(row_id: impl Into<String>, status: VerdictStatus) -> Self {
        Self {
            row_id: row_id.into(),
            status,
            mismatch_details: Vec::new(),
            detail: None,
            candidates: Vec::new(),
            actual: None,
            received_at: None,
        }
    }
}

/// Aggregated run counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// All rows in the suite
    pub total: usize,
    /// Enabled rows
    pub enabled: usize,
    /// Rows whose stimulus was sent successfully
    pub sent_ok: usize,
    /// Rows with at least one correlated event
    pub matched: usize,
    /// OK verdicts
    pub passed: usize,
    /// MISMATCH verdicts plus send failures
    pub failed: usize,
    pub not_found: usize,
    /// Rows that ended Conflicted
    pub conflicted: usize,
    pub skipped: usize,
    /// Decoded events no row claimed
    pub unmatched_events: u64,
    pub decode_failures: u64,
    pub discarded_before_watermark: u64,
}

/// Descriptive run metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub run_start: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub topic: String,
    pub timeout_secs: u64,
    pub duration_ms: u64,
    #[serde(default)]
    pub dry_run: bool,
}

/// Full run report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub metadata: RunMetadata,
    pub summary: RunSummary,
    pub verdicts: Vec<Verdict>,
}
