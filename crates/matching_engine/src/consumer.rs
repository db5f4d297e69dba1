//! Time-bounded stream consumption.
//!
//! State machine `Polling -> Draining -> (Polling | Done)`. Each cycle polls one
//! batch, drops records older than the watermark, decodes the rest and feeds them to
//! the [`Correlator`] in receipt order. The window ends when no row is pending, when
//! the global timeout elapses, or when the cancel signal fires; rows still pending at
//! that point become NotFound.

use std::time::Duration;

use chrono::{DateTime, Utc};
use contracts::{
    display_value, ContractError, CorrelationKey, EventDecoder, ExpectationRow, MatchingConfig,
    ObservedEvent, RawRecord, StreamSource, WindowConfig,
};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, instrument, trace, warn};

use crate::correlator::{CorrelationStats, Correlator};

/// Run-start watermark, captured once per run.
///
/// `at` filters stream records; `instant` measures the window on the tokio clock.
#[derive(Debug, Clone, Copy)]
pub struct Watermark {
    pub at: DateTime<Utc>,
    pub instant: Instant,
}

impl Watermark {
    pub fn now() -> Self {
        Self {
            at: Utc::now(),
            instant: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.instant.elapsed()
    }
}

/// Consumer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    Polling,
    Draining,
    Done,
}

/// Why the window closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// No row left pending
    AllResolved,
    /// Global timeout elapsed
    Timeout,
    /// External stop signal
    Cancelled,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::AllResolved => "all_resolved",
            StopReason::Timeout => "timeout",
            StopReason::Cancelled => "cancelled",
        }
    }
}

/// Consumption counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    pub polls: u64,
    pub poll_errors: u64,
    pub records_polled: u64,
    pub discarded_before_watermark: u64,
    pub decode_failures: u64,
    pub events_decoded: u64,
    pub correlation: CorrelationStats,
}

/// Result of a finished window
#[derive(Debug)]
pub struct WindowOutcome {
    pub rows: Vec<ExpectationRow>,
    pub stop_reason: StopReason,
    pub stats: ConsumerStats,
    /// Rows moved to NotFound when the window closed
    pub expired: usize,
    pub elapsed: Duration,
}

/// Owns the polling loop for one run
pub struct WindowConsumer<S, D> {
    source: S,
    decoder: D,
    matching: MatchingConfig,
    config: WindowConfig,
    watermark: Watermark,
    cancel: watch::Receiver<bool>,
    state: WindowState,
    stats: ConsumerStats,
    next_sequence: u64,
}

impl<S, D> WindowConsumer<S, D>
where
    S: StreamSource,
    D: EventDecoder,
{
    pub fn new(
        source: S,
        decoder: D,
        matching: MatchingConfig,
        config: WindowConfig,
        watermark: Watermark,
        cancel: watch::Receiver<bool>,
    ) -> Self {
        Self {
            source,
            decoder,
            matching,
            config,
            watermark,
            cancel,
            state: WindowState::Polling,
            stats: ConsumerStats::default(),
            next_sequence: 0,
        }
    }

    /// Consume until the window closes, then finalize pending rows.
    #[instrument(
        name = "window_consumer_run",
        skip(self, rows),
        fields(source = %self.source.name(), rows = rows.len())
    )]
    pub async fn run(mut self, rows: Vec<ExpectationRow>) -> WindowOutcome {
        let mut correlator = Correlator::new(rows);
        let deadline = self.watermark.instant + self.config.timeout;

        info!(
            pending = correlator.pending_count(),
            timeout_ms = self.config.timeout.as_millis() as u64,
            "Window opened"
        );

        let stop_reason = loop {
            if correlator.all_resolved() {
                break StopReason::AllResolved;
            }
            if *self.cancel.borrow() {
                break StopReason::Cancelled;
            }
            let now = Instant::now();
            if now >= deadline {
                break StopReason::Timeout;
            }

            self.transition(WindowState::Polling);
            let cycle_start = now;
            let max_wait = self.config.poll_interval.min(deadline - now);

            // A batch that lands on the deadline tick is still correlated.
            let polled = tokio::select! {
                biased;
                _ = wait_cancelled(&mut self.cancel) => break StopReason::Cancelled,
                result = self.source.poll(max_wait) => result,
                _ = tokio::time::sleep_until(deadline) => break StopReason::Timeout,
            };

            self.stats.polls += 1;
            let eligible = match polled {
                Ok(batch) => self.drain(batch, &mut correlator),
                Err(err) => {
                    self.stats.poll_errors += 1;
                    observability::metrics::record_poll_error(self.source.name());
                    warn!(error = %err, state = ?self.state, "Poll failed, treating cycle as empty");
                    0
                }
            };

            if eligible == 0 && !correlator.all_resolved() {
                let idle = self.config.poll_interval.saturating_sub(cycle_start.elapsed());
                if !idle.is_zero() {
                    let wake = (Instant::now() + idle).min(deadline);
                    tokio::select! {
                        biased;
                        _ = wait_cancelled(&mut self.cancel) => break StopReason::Cancelled,
                        _ = tokio::time::sleep_until(wake) => {}
                    }
                }
            }
        };

        self.transition(WindowState::Done);
        let expired = correlator.expire_pending();
        self.stats.correlation = correlator.stats();
        let elapsed = self.watermark.elapsed();

        if let Err(err) = self.source.close().await {
            warn!(error = %err, "Failed to close stream source");
        }

        observability::metrics::record_window_closed(
            stop_reason.as_str(),
            elapsed.as_secs_f64() * 1000.0,
            expired,
        );
        info!(
            reason = stop_reason.as_str(),
            elapsed_ms = elapsed.as_millis() as u64,
            expired,
            polls = self.stats.polls,
            events = self.stats.events_decoded,
            "Window closed"
        );

        WindowOutcome {
            rows: correlator.into_rows(),
            stop_reason,
            stats: self.stats,
            expired,
            elapsed,
        }
    }

    fn transition(&mut self, next: WindowState) {
        if self.state != next {
            trace!(from = ?self.state, to = ?next, "Window state changed");
            self.state = next;
        }
    }

    /// Process one batch; returns how many records passed the watermark.
    fn drain(&mut self, batch: Vec<RawRecord>, correlator: &mut Correlator) -> usize {
        self.transition(WindowState::Draining);
        let source_name = self.source.name().to_string();
        self.stats.records_polled += batch.len() as u64;
        observability::metrics::record_records_polled(&source_name, batch.len());

        let mut eligible = 0;
        for record in batch {
            if record.timestamp < self.watermark.at {
                self.stats.discarded_before_watermark += 1;
                observability::metrics::record_discarded_before_watermark(&source_name);
                trace!(timestamp = %record.timestamp, "Record predates run start, discarded");
                continue;
            }
            eligible += 1;

            let event = match self.decode(&record) {
                Ok(event) => event,
                Err(err) => {
                    self.stats.decode_failures += 1;
                    observability::metrics::record_decode_failure(&source_name);
                    warn!(
                        key = record.key.as_deref().unwrap_or(""),
                        timestamp = %record.timestamp,
                        error = %err,
                        "Record skipped"
                    );
                    continue;
                }
            };

            self.stats.events_decoded += 1;
            let outcome = correlator.correlate(event);
            observability::metrics::record_correlation(outcome.kind());
            debug!(
                outcome = outcome.kind(),
                state = ?self.state,
                pending = correlator.pending_count(),
                "Event correlated"
            );
        }
        eligible
    }

    fn decode(&mut self, record: &RawRecord) -> Result<ObservedEvent, ContractError> {
        let fields = self.decoder.decode(&record.payload)?;

        let sender = fields.get(&self.matching.sender_path).ok_or_else(|| {
            ContractError::decode(format!(
                "matching field '{}' missing from event",
                self.matching.sender_path
            ))
        })?;
        let subject = fields.get(&self.matching.subject_path).ok_or_else(|| {
            ContractError::decode(format!(
                "matching field '{}' missing from event",
                self.matching.subject_path
            ))
        })?;
        let correlation_key =
            CorrelationKey::new(&display_value(Some(sender)), &display_value(Some(subject)));

        let sequence = self.next_sequence;
        self.next_sequence += 1;

        Ok(ObservedEvent {
            received_at: record.timestamp,
            sequence,
            fields,
            correlation_key,
        })
    }
}

/// Resolves once the flag is set; never resolves if the sender is dropped unset.
async fn wait_cancelled(cancel: &mut watch::Receiver<bool>) {
    if cancel.wait_for(|cancelled| *cancelled).await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::FieldMap;
    use serde_json::json;
    use std::collections::VecDeque;

    /// Scripted source: returns queued batches, then idles for `max_wait`.
    struct ScriptedSource {
        batches: VecDeque<Result<Vec<RawRecord>, ContractError>>,
        polls: usize,
    }

    impl ScriptedSource {
        fn new(batches: Vec<Result<Vec<RawRecord>, ContractError>>) -> Self {
            Self {
                batches: batches.into(),
                polls: 0,
            }
        }
    }

    impl StreamSource for ScriptedSource {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn poll(&mut self, max_wait: Duration) -> Result<Vec<RawRecord>, ContractError> {
            self.polls += 1;
            match self.batches.pop_front() {
                Some(batch) => batch,
                None => {
                    tokio::time::sleep(max_wait).await;
                    Ok(Vec::new())
                }
            }
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            Ok(())
        }
    }

    /// Every poll takes the full `max_wait`, then hands out the next queued batch.
    struct PacedSource {
        batches: VecDeque<Vec<RawRecord>>,
    }

    impl StreamSource for PacedSource {
        fn name(&self) -> &str {
            "paced"
        }

        async fn poll(&mut self, max_wait: Duration) -> Result<Vec<RawRecord>, ContractError> {
            tokio::time::sleep(max_wait).await;
            Ok(self.batches.pop_front().unwrap_or_default())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            Ok(())
        }
    }

    fn json_decoder(payload: &[u8]) -> Result<FieldMap, ContractError> {
        serde_json::from_slice(payload).map_err(|e| ContractError::decode(e.to_string()))
    }

    fn matching() -> MatchingConfig {
        MatchingConfig {
            sender_path: "from".into(),
            subject_path: "subject".into(),
        }
    }

    fn config() -> WindowConfig {
        WindowConfig {
            timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(500),
            batch_size: 10,
        }
    }

    fn record(watermark: &Watermark, offset_ms: i64, payload: serde_json::Value) -> RawRecord {
        RawRecord::new(
            watermark.at + chrono::Duration::milliseconds(offset_ms),
            payload.to_string().into_bytes(),
        )
    }

    fn consumer(
        source: ScriptedSource,
        watermark: Watermark,
        cancel: watch::Receiver<bool>,
    ) -> WindowConsumer<ScriptedSource, fn(&[u8]) -> Result<FieldMap, ContractError>> {
        WindowConsumer::new(
            source,
            json_decoder as fn(&[u8]) -> Result<FieldMap, ContractError>,
            matching(),
            config(),
            watermark,
            cancel,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_early_stop_before_timeout() {
        let watermark = Watermark::now();
        let (_tx, rx) = watch::channel(false);
        let source = ScriptedSource::new(vec![
            Ok(Vec::new()),
            Ok(vec![record(
                &watermark,
                5,
                json!({"from": "a@x.com", "subject": "S", "total": 1.5}),
            )]),
        ]);

        let outcome = consumer(source, watermark, rx)
            .run(vec![ExpectationRow::new("TC-1", "a@x.com", "S")])
            .await;

        assert_eq!(outcome.stop_reason, StopReason::AllResolved);
        assert!(outcome.elapsed < config().timeout, "elapsed {:?}", outcome.elapsed);
        assert_eq!(outcome.rows[0].matched_events().len(), 1);
        assert_eq!(outcome.expired, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_marks_pending_not_found() {
        let watermark = Watermark::now();
        let (_tx, rx) = watch::channel(false);

        let outcome = consumer(ScriptedSource::new(Vec::new()), watermark, rx)
            .run(vec![ExpectationRow::new("TC-1", "a@x.com", "S")])
            .await;

        assert_eq!(outcome.stop_reason, StopReason::Timeout);
        assert_eq!(outcome.rows[0].state.name(), "NotFound");
        assert_eq!(outcome.expired, 1);
        assert!(outcome.elapsed >= config().timeout);
        assert!(outcome.elapsed < config().timeout + config().poll_interval);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_returned_on_deadline_tick_is_correlated() {
        let watermark = Watermark::now();
        let (_tx, rx) = watch::channel(false);
        let cycles = (config().timeout.as_millis() / config().poll_interval.as_millis()) as usize;
        let mut batches: VecDeque<Vec<RawRecord>> = vec![Vec::new(); cycles - 1].into();
        batches.push_back(vec![record(&watermark, 1, json!({"from": "a@x.com", "subject": "S"}))]);

        let outcome = WindowConsumer::new(
            PacedSource { batches },
            json_decoder as fn(&[u8]) -> Result<FieldMap, ContractError>,
            matching(),
            config(),
            watermark,
            rx,
        )
        .run(vec![ExpectationRow::new("TC-1", "a@x.com", "S")])
        .await;

        assert_eq!(outcome.stats.polls, cycles as u64);
        assert_eq!(outcome.stats.events_decoded, 1);
        assert_eq!(outcome.rows[0].state.name(), "Matched");
        assert_eq!(outcome.stop_reason, StopReason::AllResolved);
        assert!(outcome.elapsed >= config().timeout);
    }

    #[test]
    fn test_drain_moves_to_draining() {
        let watermark = Watermark::now();
        let (_tx, rx) = watch::channel(false);
        let mut consumer = consumer(ScriptedSource::new(Vec::new()), watermark, rx);
        let mut correlator = Correlator::new(vec![ExpectationRow::new("TC-1", "a@x.com", "S")]);
        assert_eq!(consumer.state, WindowState::Polling);

        let eligible = consumer.drain(
            vec![record(&watermark, 1, json!({"from": "a@x.com", "subject": "S"}))],
            &mut correlator,
        );

        assert_eq!(eligible, 1);
        assert_eq!(consumer.state, WindowState::Draining);
        assert!(correlator.all_resolved());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shared_sender_second_subject_times_out() {
        let watermark = Watermark::now();
        let (_tx, rx) = watch::channel(false);
        let source = ScriptedSource::new(vec![Ok(vec![record(
            &watermark,
            1,
            json!({"from": "a@x.com", "subject": "S1"}),
        )])]);

        let outcome = consumer(source, watermark, rx)
            .run(vec![
                ExpectationRow::new("TC-1", "a@x.com", "S1"),
                ExpectationRow::new("TC-2", "a@x.com", "S2"),
            ])
            .await;

        assert_eq!(outcome.stop_reason, StopReason::Timeout);
        assert_eq!(outcome.rows[0].state.name(), "Matched");
        assert_eq!(outcome.rows[1].state.name(), "NotFound");
    }

    #[tokio::test(start_paused = true)]
    async fn test_records_before_watermark_are_discarded() {
        let watermark = Watermark::now();
        let (_tx, rx) = watch::channel(false);
        let source = ScriptedSource::new(vec![Ok(vec![
            record(&watermark, -1_000, json!({"from": "a@x.com", "subject": "S"})),
            record(&watermark, 0, json!({"from": "b@x.com", "subject": "S"})),
        ])]);

        let outcome = consumer(source, watermark, rx)
            .run(vec![
                ExpectationRow::new("TC-1", "a@x.com", "S"),
                ExpectationRow::new("TC-2", "b@x.com", "S"),
            ])
            .await;

        assert_eq!(outcome.stats.discarded_before_watermark, 1);
        assert_eq!(outcome.rows[0].state.name(), "NotFound");
        assert_eq!(outcome.rows[1].state.name(), "Matched");
    }

    #[tokio::test(start_paused = true)]
    async fn test_decode_failures_do_not_abort() {
        let watermark = Watermark::now();
        let (_tx, rx) = watch::channel(false);
        let source = ScriptedSource::new(vec![Ok(vec![
            RawRecord::new(watermark.at, &b"not json"[..]),
            record(&watermark, 1, json!({"from": "a@x.com"})),
            record(&watermark, 2, json!({"from": "a@x.com", "subject": "S"})),
        ])]);

        let outcome = consumer(source, watermark, rx)
            .run(vec![ExpectationRow::new("TC-1", "a@x.com", "S")])
            .await;

        assert_eq!(outcome.stats.decode_failures, 2);
        assert_eq!(outcome.stop_reason, StopReason::AllResolved);
        assert_eq!(outcome.rows[0].matched_events()[0].sequence, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_error_is_an_empty_cycle() {
        let watermark = Watermark::now();
        let (_tx, rx) = watch::channel(false);
        let source = ScriptedSource::new(vec![
            Err(ContractError::stream("scripted", "broker unreachable")),
            Ok(vec![record(&watermark, 1, json!({"from": "a@x.com", "subject": "S"}))]),
        ]);

        let outcome = consumer(source, watermark, rx)
            .run(vec![ExpectationRow::new("TC-1", "a@x.com", "S")])
            .await;

        assert_eq!(outcome.stats.poll_errors, 1);
        assert_eq!(outcome.stop_reason, StopReason::AllResolved);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_signal_stops_window() {
        let watermark = Watermark::now();
        let (tx, rx) = watch::channel(false);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            let _ = tx.send(true);
        });

        let outcome = consumer(ScriptedSource::new(Vec::new()), watermark, rx)
            .run(vec![ExpectationRow::new("TC-1", "a@x.com", "S")])
            .await;

        assert_eq!(outcome.stop_reason, StopReason::Cancelled);
        assert_eq!(outcome.rows[0].state.name(), "NotFound");
        assert!(outcome.elapsed < config().timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_pending_closes_without_polling() {
        let watermark = Watermark::now();
        let (_tx, rx) = watch::channel(false);
        let mut failed = ExpectationRow::new("TC-1", "a@x.com", "S");
        failed.mark_send_failed("smtp down").unwrap();

        let outcome = consumer(ScriptedSource::new(Vec::new()), watermark, rx)
            .run(vec![failed])
            .await;

        assert_eq!(outcome.stop_reason, StopReason::AllResolved);
        assert_eq!(outcome.stats.polls, 0);
        assert_eq!(outcome.rows[0].state.name(), "SendFailed");
    }
}
