//! Source-side counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-source metrics, shared between a source and whoever reports on it
#[derive(Debug, Default)]
pub struct SourceMetrics {
    /// Total polls served
    pub polls: AtomicU64,

    /// Total records handed out
    pub records_emitted: AtomicU64,

    /// Lines/messages that could not be turned into a record
    pub malformed: AtomicU64,
}

impl SourceMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one poll returning `count` records
    pub fn record_poll(&self, count: usize) {
        self.polls.fetch_add(1, Ordering::Relaxed);
        self.records_emitted
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Record a malformed input
    pub fn record_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            polls: self.polls.load(Ordering::Relaxed),
            records_emitted: self.records_emitted.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub polls: u64,
    pub records_emitted: u64,
    pub malformed: u64,
}
