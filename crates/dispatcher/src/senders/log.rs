//! LogSender - logs the composed message via tracing

use contracts::{ContractError, MessageSender, OutboundMessage};
use tracing::{debug, info, instrument};

/// Sender that only logs messages (smoke runs, dry transports)
pub struct LogSender {
    name: String,
}

impl LogSender {
    /// Create a new LogSender with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl MessageSender for LogSender {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sender_send",
        skip(self, message),
        fields(sender = %self.name, row_id = %message.row_id)
    )]
    async fn send(&self, message: &OutboundMessage) -> Result<(), ContractError> {
        info!(
            from = %message.from,
            to = %message.to,
            subject = %message.subject,
            cc = message.cc.len(),
            attachment = message.attachment_spec.as_deref().unwrap_or(""),
            "Stimulus message logged"
        );
        if let Ok(json) = serde_json::to_string(message) {
            debug!(message = %json, "Message payload");
        }
        Ok(())
    }
}
