//! Stream-side data: raw records as polled, and decoded observed events.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ordered mapping field-path -> decoded value.
///
/// Insertion order follows the schema field order (serde_json `preserve_order`).
pub type FieldMap = serde_json::Map<String, Value>;

/// One record as returned by a stream poll, before decoding.
#[derive(Debug, Clone)]
pub struct RawRecord {
    /// Broker timestamp of the record
    pub timestamp: DateTime<Utc>,

    /// Record key (diagnostics only)
    pub key: Option<String>,

    /// Encoded payload, handed verbatim to the decoder
    pub payload: Bytes,
}

impl RawRecord {
    /// Create a record without key
    pub fn new(timestamp: DateTime<Utc>, payload: impl Into<Bytes>) -> Self {
        Self {
            timestamp,
            key: None,
            payload: payload.into(),
        }
    }
}

/// `(sender_value, subject_value)` pulled from a decoded event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationKey {
    pub sender: String,
    pub subject: String,
}

impl CorrelationKey {
    /// Build a key from raw strings, applying the matching normalization
    pub fn new(sender: &str, subject: &str) -> Self {
        Self {
            sender: normalize_key_part(sender),
            subject: normalize_key_part(subject),
        }
    }
}

/// A successfully decoded stream record.
///
/// Immutable after creation; shared by `Arc` once attached to a matched row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservedEvent {
    /// Stream timestamp
    pub received_at: DateTime<Utc>,

    /// Position in receipt order within the run (0-based)
    pub sequence: u64,

    /// Flattened decoded fields
    pub fields: FieldMap,

    /// Extracted correlation key
    pub correlation_key: CorrelationKey,
}

impl ObservedEvent {
    /// Value of a field, `None` when the path was not decoded
    pub fn field(&self, path: &str) -> Option<&Value> {
        self.fields.get(path)
    }
}

/// Normalization shared by correlation keys and row sender/subject: trim only, case-sensitive.
pub fn normalize_key_part(value: &str) -> String {
    value.trim().to_string()
}

/// Render a decoded value for comparison/reporting.
///
/// Null and missing become the empty string, strings are trimmed, composites are
/// serialized as compact JSON.
pub fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(composite) => composite.to_string(),
    }
}
