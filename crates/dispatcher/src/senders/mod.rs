//! Sender implementations
//!
//! Contains LogSender and PickupDirSender, plus the config-driven factory.

mod log;
mod pickup_dir;

pub use self::log::LogSender;
pub use self::pickup_dir::{render_eml, PickupDirConfig, PickupDirSender};

use contracts::{ContractError, MessageSender, OutboundMessage, SenderConfig, SenderKind};
use tracing::instrument;

use crate::error::DispatcherError;

/// Sender selected from the `[sender]` section
pub enum ConfiguredSender {
    Log(LogSender),
    PickupDir(PickupDirSender),
}

impl MessageSender for ConfiguredSender {
    fn name(&self) -> &str {
        match self {
            ConfiguredSender::Log(sender) => sender.name(),
            ConfiguredSender::PickupDir(sender) => sender.name(),
        }
    }

    async fn send(&self, message: &OutboundMessage) -> Result<(), ContractError> {
        match self {
            ConfiguredSender::Log(sender) => sender.send(message).await,
            ConfiguredSender::PickupDir(sender) => sender.send(message).await,
        }
    }
}

/// Create a sender from configuration
#[instrument(name = "dispatcher_create_sender", skip(config), fields(kind = ?config.kind))]
pub fn create_sender(config: &SenderConfig) -> Result<ConfiguredSender, DispatcherError> {
    match config.kind {
        SenderKind::Log => Ok(ConfiguredSender::Log(LogSender::new("log"))),
        SenderKind::PickupDir => PickupDirSender::from_params("pickup_dir", &config.params)
            .map(ConfiguredSender::PickupDir)
            .map_err(|e| DispatcherError::sender_creation("pickup_dir", e)),
    }
}
