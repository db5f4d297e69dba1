//! Run-start preconditions, checked before any send.

use std::collections::{HashMap, HashSet};

use contracts::{DispatchConfig, ExpectationRow, WindowConfig};

use crate::error::{EngineError, Result};

/// Validate the row set.
///
/// - ids are non-empty and unique across all rows
/// - enabled rows have a non-empty sender
/// - trimmed `(sender, subject)` is unique among enabled rows
pub fn check_rows(rows: &[ExpectationRow]) -> Result<()> {
    let mut seen_ids = HashSet::new();
    for (position, row) in rows.iter().enumerate() {
        if row.id.trim().is_empty() {
            return Err(EngineError::precondition(
                format!("row at position {} has an empty id", position + 1),
                Vec::new(),
            ));
        }
        if !seen_ids.insert(row.id.as_str()) {
            return Err(EngineError::precondition(
                "duplicate row id",
                vec![row.id.clone()],
            ));
        }
    }

    let mut by_key: HashMap<(String, String), Vec<String>> = HashMap::new();
    for row in rows.iter().filter(|row| row.enabled) {
        let sender = row.normalized_sender();
        if sender.is_empty() {
            return Err(EngineError::precondition(
                "enabled row has an empty sender",
                vec![row.id.clone()],
            ));
        }
        by_key
            .entry((sender, row.normalized_subject()))
            .or_default()
            .push(row.id.clone());
    }

    let mut duplicated: Vec<Vec<String>> = by_key
        .into_values()
        .filter(|ids| ids.len() > 1)
        .collect();
    if !duplicated.is_empty() {
        duplicated.sort();
        let groups: Vec<String> = duplicated.iter().map(|ids| ids.join("/")).collect();
        return Err(EngineError::precondition(
            format!(
                "duplicate (sender, subject) among enabled rows: {}",
                groups.join("; ")
            ),
            duplicated.into_iter().flatten().collect(),
        ));
    }

    Ok(())
}

/// Validate dispatcher and window settings
pub fn check_settings(dispatch: &DispatchConfig, window: &WindowConfig) -> Result<()> {
    if dispatch.concurrency == 0 {
        return Err(EngineError::invalid_setting(
            "sender.concurrency",
            "must be at least 1",
        ));
    }
    if dispatch.send_timeout.is_zero() {
        return Err(EngineError::invalid_setting(
            "sender.send_timeout_secs",
            "must be > 0",
        ));
    }
    if window.timeout.is_zero() {
        return Err(EngineError::invalid_setting("stream.timeout_secs", "must be > 0"));
    }
    if window.poll_interval.is_zero() {
        return Err(EngineError::invalid_setting(
            "stream.poll_interval_ms",
            "must be > 0",
        ));
    }
    Ok(())
}
