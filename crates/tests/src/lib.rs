//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 端到端运行 (channel / 回放文件事件源)
//! - 比较语法与关联规则的跨 crate 验证

#[cfg(test)]
mod contract_tests {
    use contracts::{RunSummary, VerdictStatus};

    #[test]
    fn test_verdict_status_wire_names() {
        let names: Vec<String> = [
            VerdictStatus::Ok,
            VerdictStatus::Mismatch,
            VerdictStatus::NotFound,
            VerdictStatus::Conflict,
            VerdictStatus::SendFailed,
            VerdictStatus::Skipped,
        ]
        .iter()
        .map(|status| serde_json::to_value(status).unwrap().as_str().unwrap().to_string())
        .collect();

        assert_eq!(
            names,
            ["OK", "MISMATCH", "NOT_FOUND", "CONFLICT", "SEND_FAILED", "SKIPPED"]
        );
    }

    #[test]
    fn test_summary_snapshot_keys() {
        let value = serde_json::to_value(RunSummary::default()).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            [
                "total",
                "enabled",
                "sent_ok",
                "matched",
                "passed",
                "failed",
                "not_found",
                "conflicted",
                "skipped",
                "unmatched_events",
                "decode_failures",
                "discarded_before_watermark",
            ]
        );
    }
}

#[cfg(test)]
mod comparator_tests {
    use contracts::FieldKind;
    use matching_engine::{compare, FieldOutcome, MUST_BE_EMPTY};
    use serde_json::{json, Value};

    fn float(expected: &str, actual: Value) -> FieldOutcome {
        compare(expected, Some(&actual), FieldKind::Float)
    }

    #[test]
    fn test_empty_expectation_is_ignored() {
        assert_eq!(compare("", Some(&json!("anything")), FieldKind::String), FieldOutcome::Ignore);
        assert_eq!(compare("   ", None, FieldKind::Float), FieldOutcome::Ignore);
    }

    #[test]
    fn test_must_be_empty() {
        assert_eq!(compare(MUST_BE_EMPTY, None, FieldKind::String), FieldOutcome::Pass);
        assert_eq!(compare(MUST_BE_EMPTY, Some(&Value::Null), FieldKind::String), FieldOutcome::Pass);
        assert_eq!(compare(MUST_BE_EMPTY, Some(&json!("  ")), FieldKind::String), FieldOutcome::Pass);
        assert!(compare(MUST_BE_EMPTY, Some(&json!("x")), FieldKind::String).is_fail());
    }

    #[test]
    fn test_symmetric_tolerance_with_decimal_comma() {
        assert_eq!(float("3,14+-0,2", json!(3.05)), FieldOutcome::Pass);
        assert_eq!(float("3,14+-0,2", json!(2.9)), FieldOutcome::Fail {
            expected: "3,14+-0,2".into(),
            actual: "2.9".into(),
        });
        assert_eq!(float("3,14±0,2", json!(3.34)), FieldOutcome::Pass);
    }

    #[test]
    fn test_upward_tolerance() {
        assert_eq!(float("3,14+0,2", json!(3.30)), FieldOutcome::Pass);
        assert!(float("3,14+0,2", json!(3.40)).is_fail());
        assert!(float("3,14+0,2", json!(3.10)).is_fail());
    }

    #[test]
    fn test_tolerance_only_applies_to_float_fields() {
        assert!(compare("3+-1", Some(&json!("3")), FieldKind::String).is_fail());
        assert_eq!(
            compare("3+-1", Some(&json!("3+-1")), FieldKind::String),
            FieldOutcome::Pass
        );
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{
        ContractError, ExpectationRow, MessageSender, OutboundMessage, RawRecord, RunBlueprint,
        VerdictStatus,
    };
    use ingestion::{channel_source, JsonEventDecoder, ReplayFileSource};
    use matching_engine::MUST_BE_EMPTY;
    use tokio::sync::watch;
    use verifier_cli::{RunOrchestrator, RunOutcome};

    const BLUEPRINT: &str = r#"
[schema]
fields = [
    { path = "mail.from" },
    { path = "mail.subject" },
    { path = "order.total", kind = "float" },
    { path = "order.note" },
]

[matching]
sender_path = "mail.from"
subject_path = "mail.subject"

[mail]
to_address = "inbox@test.local"

[sender]
kind = "log"
concurrency = 4

[stream]
kind = "replay_file"
topic = "orders"
timeout_secs = 3
poll_interval_ms = 100
params = { path = "unused.jsonl" }
"#;

    fn blueprint() -> RunBlueprint {
        ConfigLoader::load_blueprint_from_str(BLUEPRINT, ConfigFormat::Toml).unwrap()
    }

    /// Records every send; fails rows whose subject starts with `FAIL`.
    #[derive(Clone, Default)]
    struct RecordingSender {
        sent: Arc<AtomicUsize>,
    }

    impl MessageSender for RecordingSender {
        fn name(&self) -> &str {
            "recording"
        }

        async fn send(&self, message: &OutboundMessage) -> Result<(), ContractError> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            if message.subject.starts_with("FAIL") {
                return Err(ContractError::send(&message.row_id, "relay refused"));
            }
            Ok(())
        }
    }

    fn event_json(from: &str, subject: &str, total: f64) -> String {
        serde_json::json!({
            "mail": { "from": from, "subject": subject },
            "order": { "total": total, "note": null }
        })
        .to_string()
    }

    fn record(payload: String) -> RawRecord {
        RawRecord::new(Utc::now() + chrono::Duration::seconds(1), payload)
    }

    /// Run against a channel source pre-filled with `records`.
    async fn run_with_records(
        rows: Vec<ExpectationRow>,
        records: Vec<RawRecord>,
        sender: RecordingSender,
    ) -> RunOutcome {
        let orchestrator = RunOrchestrator::new(blueprint());
        let (tx, source) = channel_source("orders", 64, 16);
        for record in records {
            tx.send(record).await.unwrap();
        }
        let (_cancel_tx, cancel_rx) = watch::channel(false);
        let decoder = JsonEventDecoder::from_blueprint(orchestrator.blueprint());
        orchestrator
            .execute(rows, sender, source, decoder, cancel_rx)
            .await
            .unwrap()
    }

    fn status_of(outcome: &RunOutcome, row_id: &str) -> Vec<VerdictStatus> {
        outcome
            .report
            .verdicts
            .iter()
            .filter(|v| v.row_id == row_id)
            .map(|v| v.status)
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_event_ends_not_found_at_timeout() {
        let rows = vec![ExpectationRow::new("TC-1", "a@x.com", "Order 1").expect("order.total", "10")];

        let outcome = run_with_records(rows, Vec::new(), RecordingSender::default()).await;

        assert_eq!(status_of(&outcome, "TC-1"), [VerdictStatus::NotFound]);
        assert_eq!(outcome.report.summary.not_found, 1);
        assert!(outcome.stats.polls > 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_failure_wins_over_late_event() {
        // TC-2 keeps the window open so the late event is consumed.
        let rows = vec![
            ExpectationRow::new("TC-1", "a@x.com", "FAIL order"),
            ExpectationRow::new("TC-2", "b@x.com", "Never arrives"),
        ];
        let sender = RecordingSender::default();

        let outcome = run_with_records(
            rows,
            vec![record(event_json("a@x.com", "FAIL order", 1.0))],
            sender.clone(),
        )
        .await;

        assert_eq!(sender.sent.load(Ordering::SeqCst), 2);
        assert_eq!(status_of(&outcome, "TC-1"), [VerdictStatus::SendFailed]);
        assert_eq!(status_of(&outcome, "TC-2"), [VerdictStatus::NotFound]);
        let verdict = &outcome.report.verdicts[0];
        assert!(verdict.detail.as_deref().unwrap_or("").contains("relay refused"));
        assert_eq!(outcome.report.summary.failed, 1);
        assert_eq!(outcome.report.summary.unmatched_events, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_candidate_matches_on_sender_alone() {
        let rows = vec![ExpectationRow::new("TC-1", "a@x.com", "Order 1")
            .expect("order.total", "3,14+-0,2")
            .expect("order.note", MUST_BE_EMPTY)];

        // Subject differs: stage one needs only the sender.
        let outcome = run_with_records(
            rows,
            vec![record(event_json(" a@x.com ", "Rewritten subject", 3.05))],
            RecordingSender::default(),
        )
        .await;

        assert_eq!(status_of(&outcome, "TC-1"), [VerdictStatus::Ok]);
        assert_eq!(outcome.report.summary.passed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_absent_field_satisfies_must_be_empty() {
        let rows = vec![ExpectationRow::new("TC-1", "a@x.com", "Order 1")
            .expect("order.total", "5")
            .expect("order.note", MUST_BE_EMPTY)];
        let payload = serde_json::json!({
            "mail": { "from": "a@x.com", "subject": "Order 1" },
            "order": { "total": 5 }
        })
        .to_string();

        let outcome = run_with_records(rows, vec![record(payload)], RecordingSender::default()).await;

        assert_eq!(status_of(&outcome, "TC-1"), [VerdictStatus::Ok]);
        assert_eq!(outcome.report.summary.decode_failures, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shared_sender_resolved_by_subject() {
        let rows = vec![
            ExpectationRow::new("S1", "shared@x.com", "First").expect("order.total", "1"),
            ExpectationRow::new("S2", "shared@x.com", "Second").expect("order.total", "2"),
        ];

        let outcome = run_with_records(
            rows,
            vec![record(event_json("shared@x.com", "First", 1.0))],
            RecordingSender::default(),
        )
        .await;

        assert_eq!(status_of(&outcome, "S1"), [VerdictStatus::Ok]);
        assert_eq!(status_of(&outcome, "S2"), [VerdictStatus::NotFound]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ambiguous_event_conflicts_candidates() {
        let rows = vec![
            ExpectationRow::new("S1", "shared@x.com", "First"),
            ExpectationRow::new("S2", "shared@x.com", "Second"),
        ];

        let outcome = run_with_records(
            rows,
            vec![record(event_json("shared@x.com", "Neither", 1.0))],
            RecordingSender::default(),
        )
        .await;

        assert_eq!(status_of(&outcome, "S1"), [VerdictStatus::Conflict]);
        assert_eq!(status_of(&outcome, "S2"), [VerdictStatus::Conflict]);
        assert_eq!(outcome.report.verdicts[0].candidates, ["S1", "S2"]);
        assert_eq!(outcome.report.summary.conflicted, 2);
        assert_eq!(outcome.stats.conflicts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mismatch_and_repeat_events() {
        let rows = vec![ExpectationRow::new("TC-1", "a@x.com", "Order").expect("order.total", "3,14+0,2")];

        let outcome = run_with_records(
            rows,
            vec![
                record(event_json("a@x.com", "Order", 3.30)),
                record(event_json("a@x.com", "Order", 3.40)),
            ],
            RecordingSender::default(),
        )
        .await;

        assert_eq!(
            status_of(&outcome, "TC-1"),
            [VerdictStatus::Ok, VerdictStatus::Mismatch]
        );
        let mismatch = &outcome.report.verdicts[1].mismatch_details[0];
        assert_eq!(mismatch.field, "order.total");
        assert_eq!(mismatch.expected, "3,14+0,2");
    }

    #[tokio::test]
    async fn test_duplicate_pair_rejected_before_dispatch() {
        let orchestrator = RunOrchestrator::new(blueprint());
        let rows = vec![
            ExpectationRow::new("TC-1", "a@x.com", "Same"),
            ExpectationRow::new("TC-2", "a@x.com", "Same"),
        ];
        let (_tx, source) = channel_source("orders", 4, 4);
        let (_cancel_tx, cancel_rx) = watch::channel(false);
        let sender = RecordingSender::default();
        let decoder = JsonEventDecoder::from_blueprint(orchestrator.blueprint());

        let err = orchestrator
            .execute(rows, sender.clone(), source, decoder, cancel_rx)
            .await
            .unwrap_err();

        assert!(err.is_run_fatal());
        assert_eq!(sender.sent.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_early_stop_when_all_rows_resolved() {
        let rows = vec![
            ExpectationRow::new("TC-1", "a@x.com", "A"),
            ExpectationRow::new("TC-2", "b@x.com", "B"),
            ExpectationRow::new("TC-3", "c@x.com", "C").disabled(),
        ];

        let outcome = run_with_records(
            rows,
            vec![
                record(event_json("a@x.com", "A", 1.0)),
                record(event_json("b@x.com", "B", 1.0)),
            ],
            RecordingSender::default(),
        )
        .await;

        assert_eq!(outcome.report.summary.passed, 2);
        assert_eq!(outcome.report.summary.skipped, 1);
        assert!(outcome.report.metadata.duration_ms < 3_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_closes_window_early() {
        let orchestrator = RunOrchestrator::new(blueprint());
        let rows = vec![ExpectationRow::new("TC-1", "a@x.com", "A")];
        let (_tx, source) = channel_source("orders", 4, 4);
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let decoder = JsonEventDecoder::from_blueprint(orchestrator.blueprint());

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            let _ = cancel_tx.send(true);
        });
        let outcome = orchestrator
            .execute(rows, RecordingSender::default(), source, decoder, cancel_rx)
            .await
            .unwrap();

        assert_eq!(status_of(&outcome, "TC-1"), [VerdictStatus::NotFound]);
        assert!(outcome.stats.duration < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_replay_file_with_pickup_dir_sender() {
        let dir = tempfile::tempdir().unwrap();
        let pickup = dir.path().join("pickup");
        let replay = dir.path().join("events.jsonl");
        let lines = [
            r#"{"payload":{"mail":{"from":"a@x.com","subject":"A"},"order":{"total":3.05,"note":null}}}"#,
            "not json",
            r#"{"key":"k2","payload":"{\"mail\":{\"from\":\"b@x.com\",\"subject\":\"B\"},\"order\":{\"total\":9,\"note\":\"late\"}}"}"#,
        ];
        std::fs::write(&replay, lines.join("\n")).unwrap();

        let mut bp = blueprint();
        bp.sender.kind = contracts::SenderKind::PickupDir;
        bp.sender
            .params
            .insert("dir".into(), pickup.display().to_string());
        bp.stream.params.insert("path".into(), replay.display().to_string());

        let suite = ConfigLoader::load_suite_from_str(
            r#"
[[rows]]
id = "TC-1"
sender = "a@x.com"
subject = "A"
expected = [{ path = "order.total", expectation = "3,14+-0,2" }]

[[rows]]
id = "TC-2"
sender = "b@x.com"
subject = "B"
expected = [
    { path = "order.total", expectation = "10" },
    { path = "order.note", expectation = "MUSS_LEER_SEIN" },
]
"#,
            ConfigFormat::Toml,
            &bp,
        )
        .unwrap();

        let sender = dispatcher::create_sender(&bp.sender).unwrap();
        let source = ReplayFileSource::from_config(&bp.stream).await.unwrap();
        let malformed = source.metrics();
        let decoder = JsonEventDecoder::from_blueprint(&bp);
        let (_cancel_tx, cancel_rx) = watch::channel(false);

        let outcome = RunOrchestrator::new(bp)
            .execute(suite.rows, sender, source, decoder, cancel_rx)
            .await
            .unwrap();

        assert_eq!(std::fs::read_dir(&pickup).unwrap().count(), 2);
        assert_eq!(malformed.snapshot().malformed, 1);
        assert_eq!(status_of(&outcome, "TC-1"), [VerdictStatus::Ok]);
        assert_eq!(status_of(&outcome, "TC-2"), [VerdictStatus::Mismatch]);
        let fields: Vec<&str> = outcome.report.verdicts[1]
            .mismatch_details
            .iter()
            .map(|m| m.field.as_str())
            .collect();
        assert_eq!(fields, ["order.total", "order.note"]);

        let report_path =
            verifier_cli::write_report(&outcome.report, &dir.path().join("suite.toml"), None)
                .unwrap();
        assert!(report_path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("suite-results-"));
    }

    #[test]
    fn test_dry_run_marks_every_row_skipped() {
        let rows = vec![
            ExpectationRow::new("TC-1", "a@x.com", "A"),
            ExpectationRow::new("TC-2", "b@x.com", "B"),
        ];

        let outcome = RunOrchestrator::new(blueprint()).dry_run(rows).unwrap();

        assert!(outcome.report.metadata.dry_run);
        assert_eq!(outcome.report.summary.skipped, 2);
        assert_eq!(outcome.report.summary.sent_ok, 0);
    }
}
