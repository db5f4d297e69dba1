//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration parsing or validation error
    #[error(transparent)]
    Config(#[from] contracts::ContractError),

    /// Run-start precondition rejected the run before any send
    #[error(transparent)]
    Precondition(#[from] matching_engine::EngineError),

    /// Dispatcher could not be built or driven
    #[error("Dispatch failed: {0}")]
    Dispatch(#[from] dispatcher::DispatcherError),

    /// Report could not be written
    #[error("Failed to write report {path}: {source}")]
    ReportWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Report could not be serialized
    #[error("Failed to serialize report: {0}")]
    ReportSerialize(#[from] serde_json::Error),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    /// Whether the run was refused before any message was sent
    pub fn is_run_fatal(&self) -> bool {
        matches!(self, CliError::Precondition(_) | CliError::Config(_))
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
