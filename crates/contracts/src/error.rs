//! Layered error definitions
//!
//! Categorized by source: config / send / stream / decode / row state

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Send Errors =====
    /// Stimulus message could not be delivered
    #[error("send failed for row '{row_id}': {message}")]
    Send { row_id: String, message: String },

    /// Stimulus message did not complete within the per-send timeout
    #[error("send timed out for row '{row_id}' after {timeout_ms}ms")]
    SendTimeout { row_id: String, timeout_ms: u64 },

    // ===== Stream Errors =====
    /// Stream transport error (poll failed)
    #[error("stream '{source_name}' error: {message}")]
    Stream {
        source_name: String,
        message: String,
    },

    /// Record payload could not be decoded into a field map
    #[error("decode error: {message}")]
    Decode { message: String },

    // ===== Row State Errors =====
    /// Row state transition that the lifecycle does not allow
    #[error("row '{row_id}' cannot move from {from} to {to}")]
    InvalidTransition {
        row_id: String,
        from: &'static str,
        to: &'static str,
    },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create send error
    pub fn send(row_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Send {
            row_id: row_id.into(),
            message: message.into(),
        }
    }

    /// Create stream error
    pub fn stream(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Stream {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}
