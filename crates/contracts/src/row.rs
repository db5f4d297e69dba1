//! ExpectationRow - one test case: the stimulus to send and the event it should produce.
//!
//! Row state moves forward exactly once through the lifecycle:
//!
//! ```text
//! Pending --send failed--> SendFailed
//! Pending --disabled-----> Skipped
//! Pending --correlated---> Matched(events)   (further events append)
//! Pending --ambiguous----> Conflicted(candidates)
//! Pending --window end---> NotFound
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{normalize_key_part, ContractError, ObservedEvent};

/// One asserted field: schema path plus the raw expectation text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedField {
    /// Schema field path (dot separated)
    pub path: String,

    /// Raw expectation (may be empty = ignore)
    #[serde(default)]
    pub expectation: String,
}

impl ExpectedField {
    pub fn new(path: impl Into<String>, expectation: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            expectation: expectation.into(),
        }
    }
}

/// Row lifecycle state
#[derive(Debug, Clone, Default)]
pub enum RowState {
    /// Created, or sent successfully and awaiting correlation
    #[default]
    Pending,
    /// Stimulus could not be sent
    SendFailed { reason: String },
    /// Disabled row, or dry run
    Skipped,
    /// At least one observed event correlated to this row
    Matched(Vec<Arc<ObservedEvent>>),
    /// An event could not be resolved to a single row
    Conflicted { candidates: Vec<String> },
    /// Window ended without a correlated event
    NotFound,
}

impl RowState {
    /// Short state name for logs and errors
    pub fn name(&self) -> &'static str {
        match self {
            RowState::Pending => "Pending",
            RowState::SendFailed { .. } => "SendFailed",
            RowState::Skipped => "Skipped",
            RowState::Matched(_) => "Matched",
            RowState::Conflicted { .. } => "Conflicted",
            RowState::NotFound => "NotFound",
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, RowState::Pending)
    }
}

/// Test case row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpectationRow {
    /// Unique, non-empty identifier
    pub id: String,

    /// Disabled rows are skipped without dispatch or correlation
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Sender address of the stimulus message
    pub sender: String,

    /// Subject of the stimulus message
    pub subject: String,

    /// Message body
    #[serde(default)]
    pub body: String,

    /// Opaque attachment specification, passed through to the sender
    #[serde(default)]
    pub attachment: String,

    /// Asserted fields, in evaluation order
    #[serde(default)]
    pub expected: Vec<ExpectedField>,

    /// Current lifecycle state
    #[serde(skip)]
    pub state: RowState,

    /// Wall-clock time the stimulus was sent (diagnostic only)
    #[serde(skip)]
    pub sent_at: Option<DateTime<Utc>>,
}

fn default_enabled() -> bool {
    true
}

impl ExpectationRow {
    /// Create an enabled row without body, attachment or expectations
    pub fn new(id: impl Into<String>, sender: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            enabled: true,
            sender: sender.into(),
            subject: subject.into(),
            body: String::new(),
            attachment: String::new(),
            expected: Vec::new(),
            state: RowState::Pending,
            sent_at: None,
        }
    }

    /// Builder-style expectation
    pub fn expect(mut self, path: impl Into<String>, expectation: impl Into<String>) -> Self {
        self.expected.push(ExpectedField::new(path, expectation));
        self
    }

    /// Builder-style disable
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Sender after matching normalization
    pub fn normalized_sender(&self) -> String {
        normalize_key_part(&self.sender)
    }

    /// Subject after matching normalization
    pub fn normalized_subject(&self) -> String {
        normalize_key_part(&self.subject)
    }

    /// Row is waiting for correlation
    pub fn is_pending(&self) -> bool {
        self.state.is_pending()
    }

    /// Events attached to a matched row
    pub fn matched_events(&self) -> &[Arc<ObservedEvent>] {
        match &self.state {
            RowState::Matched(events) => events,
            _ => &[],
        }
    }

    /// Pending -> Skipped
    pub fn mark_skipped(&mut self) -> Result<(), ContractError> {
        self.transition("Skipped", RowState::Skipped)
    }

    /// Pending -> SendFailed
    pub fn mark_send_failed(&mut self, reason: impl Into<String>) -> Result<(), ContractError> {
        self.transition(
            "SendFailed",
            RowState::SendFailed {
                reason: reason.into(),
            },
        )
    }

    /// Pending -> Conflicted
    pub fn mark_conflicted(&mut self, candidates: Vec<String>) -> Result<(), ContractError> {
        self.transition("Conflicted", RowState::Conflicted { candidates })
    }

    /// Pending -> NotFound
    pub fn mark_not_found(&mut self) -> Result<(), ContractError> {
        self.transition("NotFound", RowState::NotFound)
    }

    /// Pending -> Matched, or append to an already matched row
    pub fn attach_event(&mut self, event: Arc<ObservedEvent>) -> Result<(), ContractError> {
        match &mut self.state {
            RowState::Matched(events) => {
                events.push(event);
                Ok(())
            }
            RowState::Pending => {
                self.state = RowState::Matched(vec![event]);
                Ok(())
            }
            other => Err(ContractError::InvalidTransition {
                row_id: self.id.clone(),
                from: other.name(),
                to: "Matched",
            }),
        }
    }

    fn transition(&mut self, to: &'static str, next: RowState) -> Result<(), ContractError> {
        if !self.state.is_pending() {
            return Err(ContractError::InvalidTransition {
                row_id: self.id.clone(),
                from: self.state.name(),
                to,
            });
        }
        self.state = next;
        Ok(())
    }
}
