//! PickupDirSender - drops one `.eml` file per message into a pickup directory
//!
//! A mail relay (or a test harness) watching the directory picks the files up.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::Utc;
use contracts::{ContractError, MessageSender, OutboundMessage};
use tracing::{debug, instrument};

const MESSAGE_ID_DOMAIN: &str = "verifier.local";

/// Configuration for PickupDirSender
#[derive(Debug, Clone)]
pub struct PickupDirConfig {
    /// Directory receiving `.eml` files
    pub dir: PathBuf,
}

impl PickupDirConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let dir = params
            .get("dir")
            .filter(|dir| !dir.trim().is_empty())
            .ok_or_else(|| "missing 'dir' parameter".to_string())?;
        Ok(Self {
            dir: PathBuf::from(dir),
        })
    }
}

/// Sender that writes RFC 5322 style text files
pub struct PickupDirSender {
    name: String,
    config: PickupDirConfig,
}

impl PickupDirSender {
    /// Create a new PickupDirSender, creating the directory if needed
    pub fn new(name: impl Into<String>, config: PickupDirConfig) -> std::io::Result<Self> {
        std::fs::create_dir_all(&config.dir)?;
        Ok(Self {
            name: name.into(),
            config,
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, String> {
        let config = PickupDirConfig::from_params(params)?;
        let dir = config.dir.display().to_string();
        Self::new(name, config).map_err(|e| format!("cannot create '{}': {}", dir, e))
    }

    fn file_path(&self, message: &OutboundMessage, stamp: i64) -> PathBuf {
        let safe_id: String = message
            .row_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.config.dir.join(format!("{}-{}.eml", safe_id, stamp))
    }
}

/// Render headers, blank line, body
pub fn render_eml(message: &OutboundMessage) -> String {
    let now = Utc::now();
    let mut out = String::new();
    out.push_str(&format!("From: {}\r\n", message.from));
    out.push_str(&format!("To: {}\r\n", message.to));
    if !message.cc.is_empty() {
        out.push_str(&format!("Cc: {}\r\n", message.cc.join(", ")));
    }
    if !message.bcc.is_empty() {
        out.push_str(&format!("Bcc: {}\r\n", message.bcc.join(", ")));
    }
    out.push_str(&format!("Subject: {}\r\n", message.subject));
    out.push_str(&format!("X-Test-Id: {}\r\n", message.row_id));
    out.push_str(&format!("Date: {}\r\n", now.to_rfc2822()));
    out.push_str(&format!(
        "Message-ID: <{}.{}@{}>\r\n",
        message.row_id,
        now.timestamp_nanos_opt().unwrap_or_default(),
        MESSAGE_ID_DOMAIN
    ));
    if let Some(spec) = &message.attachment_spec {
        out.push_str(&format!("X-Attachment-Spec: {}\r\n", spec));
    }
    out.push_str("Content-Type: text/plain; charset=utf-8\r\n");
    out.push_str("\r\n");
    out.push_str(&message.body);
    out
}

impl MessageSender for PickupDirSender {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "pickup_dir_sender_send",
        skip(self, message),
        fields(sender = %self.name, row_id = %message.row_id)
    )]
    async fn send(&self, message: &OutboundMessage) -> Result<(), ContractError> {
        let stamp = Utc::now().timestamp_micros();
        let path = self.file_path(message, stamp);
        tokio::fs::write(&path, render_eml(message))
            .await
            .map_err(|e| {
                ContractError::send(&message.row_id, format!("{}: {}", path.display(), e))
            })?;
        debug!(path = %path.display(), "Message written to pickup directory");
        Ok(())
    }
}
