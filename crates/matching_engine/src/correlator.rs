//! Two-stage event-to-row correlation.
//!
//! Stage 1 narrows rows by sender; stage 2 (only with two or more sender candidates)
//! narrows by subject. Anything that does not resolve to exactly one row is a conflict,
//! never a guess.

use std::collections::HashMap;
use std::sync::Arc;

use contracts::{ExpectationRow, ObservedEvent, RowState};
use tracing::{debug, info, warn};

/// Which stage resolved an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStage {
    /// Single sender candidate
    Sender,
    /// Disambiguated by subject
    Subject,
}

/// Result of correlating one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorrelationOutcome {
    /// Row moved Pending -> Matched
    Matched { row_id: String, stage: MatchStage },
    /// Row was already Matched; event appended
    Appended { row_id: String, stage: MatchStage },
    /// No row with this sender
    Unmatched,
    /// Ambiguous; every Pending candidate is now Conflicted
    Conflict { candidates: Vec<String> },
}

impl CorrelationOutcome {
    /// Label for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            CorrelationOutcome::Matched {
                stage: MatchStage::Sender,
                ..
            } => "matched_sender",
            CorrelationOutcome::Matched {
                stage: MatchStage::Subject,
                ..
            } => "matched_subject",
            CorrelationOutcome::Appended { .. } => "appended",
            CorrelationOutcome::Unmatched => "unmatched",
            CorrelationOutcome::Conflict { .. } => "conflict",
        }
    }
}

/// Correlation counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorrelationStats {
    pub matched: u64,
    pub appended: u64,
    pub unmatched: u64,
    pub conflicts: u64,
}

/// Owns the row collection during consumption.
#[derive(Debug)]
pub struct Correlator {
    rows: Vec<ExpectationRow>,
    /// Normalized sender -> row indices (all rows, state filtered at lookup)
    by_sender: HashMap<String, Vec<usize>>,
    pending: usize,
    stats: CorrelationStats,
}

impl Correlator {
    /// Take ownership of the dispatched rows and build the sender index
    pub fn new(rows: Vec<ExpectationRow>) -> Self {
        let mut by_sender: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, row) in rows.iter().enumerate() {
            by_sender.entry(row.normalized_sender()).or_default().push(idx);
        }
        let pending = rows.iter().filter(|row| row.is_pending()).count();

        Self {
            rows,
            by_sender,
            pending,
            stats: CorrelationStats::default(),
        }
    }

    /// Rows still waiting for an event
    pub fn pending_count(&self) -> usize {
        self.pending
    }

    /// True when no row is Pending any more
    pub fn all_resolved(&self) -> bool {
        self.pending == 0
    }

    pub fn stats(&self) -> CorrelationStats {
        self.stats
    }

    pub fn rows(&self) -> &[ExpectationRow] {
        &self.rows
    }

    /// Hand the rows back for verdict computation
    pub fn into_rows(self) -> Vec<ExpectationRow> {
        self.rows
    }

    /// Correlate one decoded event; pure state transition, never blocks.
    pub fn correlate(&mut self, event: ObservedEvent) -> CorrelationOutcome {
        let key = event.correlation_key.clone();

        let sender_candidates: Vec<usize> = self
            .by_sender
            .get(&key.sender)
            .map(|indices| {
                indices
                    .iter()
                    .copied()
                    .filter(|&idx| is_correlatable(&self.rows[idx].state))
                    .collect()
            })
            .unwrap_or_default();

        match sender_candidates.as_slice() {
            [] => {
                self.stats.unmatched += 1;
                info!(
                    sequence = event.sequence,
                    sender = %key.sender,
                    subject = %key.subject,
                    "Observed event matches no row, dropped"
                );
                CorrelationOutcome::Unmatched
            }
            [only] => self.attach(*only, event, MatchStage::Sender),
            _ => {
                let subject_candidates: Vec<usize> = sender_candidates
                    .iter()
                    .copied()
                    .filter(|&idx| self.rows[idx].normalized_subject() == key.subject)
                    .collect();

                match subject_candidates.as_slice() {
                    [only] => self.attach(*only, event, MatchStage::Subject),
                    [] => self.conflict(&sender_candidates, &event),
                    _ => self.conflict(&subject_candidates, &event),
                }
            }
        }
    }

    /// Mark every still-Pending row NotFound; returns how many were expired.
    pub fn expire_pending(&mut self) -> usize {
        let mut expired = 0;
        for row in self.rows.iter_mut().filter(|row| row.is_pending()) {
            if row.mark_not_found().is_ok() {
                expired += 1;
                debug!(row_id = %row.id, "Row expired without event");
            }
        }
        self.pending = self.pending.saturating_sub(expired);
        expired
    }

    fn attach(&mut self, idx: usize, event: ObservedEvent, stage: MatchStage) -> CorrelationOutcome {
        let sequence = event.sequence;
        let row = &mut self.rows[idx];
        let was_pending = row.is_pending();

        if let Err(err) = row.attach_event(Arc::new(event)) {
            // Candidates are filtered by state, so this only fires on a broken index.
            warn!(row_id = %row.id, error = %err, "Failed to attach event");
            self.stats.unmatched += 1;
            return CorrelationOutcome::Unmatched;
        }

        let row_id = row.id.clone();
        if was_pending {
            self.pending = self.pending.saturating_sub(1);
            self.stats.matched += 1;
            debug!(row_id = %row_id, sequence, ?stage, "Row matched");
            CorrelationOutcome::Matched { row_id, stage }
        } else {
            self.stats.appended += 1;
            debug!(row_id = %row_id, sequence, ?stage, "Additional event appended to matched row");
            CorrelationOutcome::Appended { row_id, stage }
        }
    }

    fn conflict(&mut self, candidates: &[usize], event: &ObservedEvent) -> CorrelationOutcome {
        let candidate_ids: Vec<String> = candidates
            .iter()
            .map(|&idx| self.rows[idx].id.clone())
            .collect();

        for &idx in candidates {
            let row = &mut self.rows[idx];
            if row.is_pending() && row.mark_conflicted(candidate_ids.clone()).is_ok() {
                self.pending = self.pending.saturating_sub(1);
            }
        }

        self.stats.conflicts += 1;
        warn!(
            sequence = event.sequence,
            sender = %event.correlation_key.sender,
            subject = %event.correlation_key.subject,
            candidates = ?candidate_ids,
            "Observed event is ambiguous, candidates marked conflicted"
        );
        CorrelationOutcome::Conflict {
            candidates: candidate_ids,
        }
    }
}

fn is_correlatable(state: &RowState) -> bool {
    matches!(state, RowState::Pending | RowState::Matched(_))
}
