//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Sender creation error
    #[error("failed to create sender '{name}': {message}")]
    SenderCreation { name: String, message: String },

    /// Concurrency limit below 1
    #[error("invalid concurrency limit {0}, must be at least 1")]
    InvalidConcurrency(usize),

    /// Concurrency limiter closed while rows were still queued
    #[error("send limiter closed: {0}")]
    LimiterClosed(String),

    /// Send error (from contract)
    #[error("sender error: {0}")]
    Contract(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatcherError {
    /// Create a sender creation error
    pub fn sender_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SenderCreation {
            name: name.into(),
            message: message.into(),
        }
    }
}
