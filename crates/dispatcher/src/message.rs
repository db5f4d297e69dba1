//! Message composition shared by all senders.

use contracts::{ExpectationRow, MailConfig, OutboundMessage};

/// Build the stimulus message for a row.
///
/// `From` and `Subject` come from the row verbatim; recipients from `[mail]`.
pub fn compose_message(row: &ExpectationRow, mail: &MailConfig) -> OutboundMessage {
    let attachment = row.attachment.trim();
    OutboundMessage {
        row_id: row.id.clone(),
        from: row.sender.trim().to_string(),
        to: mail.to_address.clone(),
        cc: mail.cc.clone(),
        bcc: mail.bcc.clone(),
        subject: row.subject.clone(),
        body: row.body.clone(),
        attachment_spec: (!attachment.is_empty()).then(|| attachment.to_string()),
    }
}
