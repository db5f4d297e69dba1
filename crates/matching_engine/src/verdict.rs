//! Verdict aggregation: terminal row states plus field comparison.

use std::collections::HashMap;

use contracts::{ExpectationRow, FieldKind, RowState, RunSummary, Verdict, VerdictStatus};
use tracing::warn;

use crate::comparator::evaluate_fields;
use crate::consumer::ConsumerStats;

/// Build verdicts in row order.
///
/// Matched rows yield one verdict per attached event, in receipt order.
pub fn finalize(rows: &[ExpectationRow], kinds: &HashMap<String, FieldKind>) -> Vec<Verdict> {
    let mut verdicts = Vec::with_capacity(rows.len());

    for row in rows {
        match &row.state {
            RowState::Skipped => verdicts.push(Verdict::bare(&row.id, VerdictStatus::Skipped)),
            RowState::SendFailed { reason } => {
                let mut verdict = Verdict::bare(&row.id, VerdictStatus::SendFailed);
                verdict.detail = Some(reason.clone());
                verdicts.push(verdict);
            }
            RowState::NotFound => verdicts.push(Verdict::bare(&row.id, VerdictStatus::NotFound)),
            RowState::Pending => {
                warn!(row_id = %row.id, "Row still pending at finalize, reporting NOT_FOUND");
                verdicts.push(Verdict::bare(&row.id, VerdictStatus::NotFound));
            }
            RowState::Conflicted { candidates } => {
                let mut verdict = Verdict::bare(&row.id, VerdictStatus::Conflict);
                verdict.candidates = candidates.clone();
                verdicts.push(verdict);
            }
            RowState::Matched(events) => {
                for event in events {
                    let mismatches = evaluate_fields(&row.expected, &event.fields, kinds);
                    let status = if mismatches.is_empty() {
                        VerdictStatus::Ok
                    } else {
                        VerdictStatus::Mismatch
                    };
                    let mut verdict = Verdict::bare(&row.id, status);
                    verdict.mismatch_details = mismatches;
                    verdict.actual = Some(event.fields.clone());
                    verdict.received_at = Some(event.received_at);
                    verdicts.push(verdict);
                }
            }
        }
    }

    verdicts
}

/// Aggregate counts over the final rows and verdicts.
pub fn summarize(
    rows: &[ExpectationRow],
    verdicts: &[Verdict],
    stats: &ConsumerStats,
) -> RunSummary {
    let count_status = |status: VerdictStatus| verdicts.iter().filter(|v| v.status == status).count();

    RunSummary {
        total: rows.len(),
        enabled: rows.iter().filter(|row| row.enabled).count(),
        sent_ok: rows
            .iter()
            .filter(|row| {
                row.enabled
                    && !matches!(row.state, RowState::SendFailed { .. } | RowState::Skipped)
            })
            .count(),
        matched: rows
            .iter()
            .filter(|row| matches!(row.state, RowState::Matched(_)))
            .count(),
        passed: count_status(VerdictStatus::Ok),
        failed: count_status(VerdictStatus::Mismatch) + count_status(VerdictStatus::SendFailed),
        not_found: count_status(VerdictStatus::NotFound),
        conflicted: rows
            .iter()
            .filter(|row| matches!(row.state, RowState::Conflicted { .. }))
            .count(),
        skipped: count_status(VerdictStatus::Skipped),
        unmatched_events: stats.correlation.unmatched,
        decode_failures: stats.decode_failures,
        discarded_before_watermark: stats.discarded_before_watermark,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use contracts::{CorrelationKey, FieldMap, ObservedEvent};
    use serde_json::json;
    use std::sync::Arc;

    fn event(total: f64) -> Arc<ObservedEvent> {
        let mut fields = FieldMap::new();
        fields.insert("total".into(), json!(total));
        fields.insert("note".into(), json!("whatever"));
        Arc::new(ObservedEvent {
            received_at: Utc::now(),
            sequence: 0,
            fields,
            correlation_key: CorrelationKey::new("a@x.com", "S"),
        })
    }

    fn kinds() -> HashMap<String, FieldKind> {
        HashMap::from([("total".to_string(), FieldKind::Float)])
    }

    #[test]
    fn test_one_verdict_per_matched_event() {
        let mut row = ExpectationRow::new("TC-1", "a@x.com", "S")
            .expect("total", "3,14+-0,2")
            .expect("note", "");
        row.attach_event(event(3.05)).unwrap();
        row.attach_event(event(2.9)).unwrap();

        let verdicts = finalize(&[row], &kinds());

        assert_eq!(verdicts.len(), 2);
        assert_eq!(verdicts[0].status, VerdictStatus::Ok);
        assert!(verdicts[0].mismatch_details.is_empty());
        assert_eq!(verdicts[1].status, VerdictStatus::Mismatch);
        assert_eq!(verdicts[1].mismatch_details[0].field, "total");
        assert_eq!(verdicts[1].actual.as_ref().unwrap()["note"], "whatever");
    }

    #[test]
    fn test_terminal_states_map_to_status() {
        let mut failed = ExpectationRow::new("TC-1", "a@x.com", "S1");
        failed.mark_send_failed("connection refused").unwrap();
        let mut skipped = ExpectationRow::new("TC-2", "a@x.com", "S2").disabled();
        skipped.mark_skipped().unwrap();
        let mut missing = ExpectationRow::new("TC-3", "b@x.com", "S");
        missing.mark_not_found().unwrap();
        let mut conflicted = ExpectationRow::new("TC-4", "c@x.com", "S");
        conflicted
            .mark_conflicted(vec!["TC-4".into(), "TC-5".into()])
            .unwrap();

        let verdicts = finalize(&[failed, skipped, missing, conflicted], &kinds());
        let statuses: Vec<_> = verdicts.iter().map(|v| v.status).collect();

        assert_eq!(
            statuses,
            vec![
                VerdictStatus::SendFailed,
                VerdictStatus::Skipped,
                VerdictStatus::NotFound,
                VerdictStatus::Conflict
            ]
        );
        assert_eq!(verdicts[0].detail.as_deref(), Some("connection refused"));
        assert!(verdicts[0].mismatch_details.is_empty());
        assert_eq!(verdicts[3].candidates, vec!["TC-4", "TC-5"]);
    }

    #[test]
    fn test_summary_counts() {
        let mut ok = ExpectationRow::new("TC-1", "a@x.com", "S").expect("total", "1");
        ok.attach_event(event(1.0)).unwrap();
        let mut bad = ExpectationRow::new("TC-2", "b@x.com", "S").expect("total", "1");
        bad.attach_event(event(2.0)).unwrap();
        let mut failed = ExpectationRow::new("TC-3", "c@x.com", "S");
        failed.mark_send_failed("boom").unwrap();
        let mut skipped = ExpectationRow::new("TC-4", "d@x.com", "S").disabled();
        skipped.mark_skipped().unwrap();
        let rows = vec![ok, bad, failed, skipped];

        let verdicts = finalize(&rows, &kinds());
        let stats = ConsumerStats {
            decode_failures: 3,
            ..Default::default()
        };
        let summary = summarize(&rows, &verdicts, &stats);

        assert_eq!(summary.total, 4);
        assert_eq!(summary.enabled, 3);
        assert_eq!(summary.sent_ok, 2);
        assert_eq!(summary.matched, 2);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.decode_failures, 3);
    }
}
