//! OutboundMessage - what a MessageSender actually transmits.

use serde::{Deserialize, Serialize};

/// Stimulus message composed from a row and the mail settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Originating row id (sent as `X-Test-Id`)
    pub row_id: String,

    pub from: String,
    pub to: String,

    #[serde(default)]
    pub cc: Vec<String>,

    #[serde(default)]
    pub bcc: Vec<String>,

    pub subject: String,
    pub body: String,

    /// Opaque attachment specification, interpreted by the sender
    #[serde(default)]
    pub attachment_spec: Option<String>,
}
