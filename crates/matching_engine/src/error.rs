//! Matching engine error types

use thiserror::Error;

/// Run-fatal engine errors
///
/// Row-local problems never surface here; they end up in the row's verdict.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Row set violates a run-start precondition
    #[error("run precondition failed: {message} (rows: {})", .row_ids.join(", "))]
    Precondition {
        message: String,
        row_ids: Vec<String>,
    },

    /// Run setting out of range
    #[error("invalid setting '{field}': {message}")]
    InvalidSetting { field: String, message: String },
}

impl EngineError {
    /// Create a precondition error naming the offending rows
    pub fn precondition(message: impl Into<String>, row_ids: Vec<String>) -> Self {
        Self::Precondition {
            message: message.into(),
            row_ids,
        }
    }

    /// Create an invalid setting error
    pub fn invalid_setting(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSetting {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Engine Result alias
pub type Result<T> = std::result::Result<T, EngineError>;
