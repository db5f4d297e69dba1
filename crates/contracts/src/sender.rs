//! MessageSender trait - Dispatcher output interface
//!
//! Ordinary transport failures are returned as errors, never panics.

use crate::{ContractError, OutboundMessage};

/// Stimulus transport
///
/// Implementations are shared across concurrent send tasks, so `send` takes `&self`.
#[trait_variant::make(MessageSender: Send)]
pub trait LocalMessageSender {
    /// Sender name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Transmit one message
    ///
    /// # Errors
    /// Returns a descriptive transport error; the row becomes SendFailed
    async fn send(&self, message: &OutboundMessage) -> Result<(), ContractError>;
}
