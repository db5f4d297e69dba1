//! Dispatcher - bounded concurrent sends for all enabled rows

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use contracts::{ContractError, DispatchConfig, ExpectationRow, MailConfig, MessageSender};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::error::DispatcherError;
use crate::message::compose_message;
use crate::metrics::{MetricsSnapshot, SendMetrics};

/// Outcome of one send
#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub row_id: String,
    /// `None` on success, failure reason otherwise
    pub error: Option<String>,
    /// Wall-clock start of the send (diagnostic only)
    pub sent_at: DateTime<Utc>,
    pub latency: Duration,
}

impl SendOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of a dispatch phase
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    /// Per-row outcomes in completion order
    pub outcomes: Vec<SendOutcome>,
    pub sent_ok: usize,
    pub failed: usize,
    pub skipped: usize,
    pub elapsed: Duration,
}

/// Mark every Pending row Skipped (disabled rows, dry run); returns the count.
pub fn skip_rows<'a>(rows: impl IntoIterator<Item = &'a mut ExpectationRow>) -> usize {
    let mut skipped = 0;
    for row in rows {
        if row.mark_skipped().is_ok() {
            skipped += 1;
        }
    }
    skipped
}

/// Sends stimulus messages under a fixed concurrency cap
pub struct Dispatcher<S> {
    sender: Arc<S>,
    mail: MailConfig,
    config: DispatchConfig,
    metrics: Arc<SendMetrics>,
}

impl<S> Dispatcher<S>
where
    S: MessageSender + Sync + 'static,
{
    /// Create a dispatcher; rejects a concurrency limit below 1
    pub fn new(sender: S, mail: MailConfig, config: DispatchConfig) -> Result<Self, DispatcherError> {
        if config.concurrency == 0 {
            return Err(DispatcherError::InvalidConcurrency(config.concurrency));
        }
        Ok(Self {
            sender: Arc::new(sender),
            mail,
            config,
            metrics: Arc::new(SendMetrics::new()),
        })
    }

    /// Get metrics snapshot
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Send every enabled Pending row; disabled rows become Skipped.
    ///
    /// Returns after all sends completed. Failed rows become SendFailed; successful
    /// rows stay Pending with `sent_at` recorded.
    #[instrument(
        name = "dispatcher_dispatch",
        skip(self, rows),
        fields(sender = %self.sender.name(), rows = rows.len(), concurrency = self.config.concurrency)
    )]
    pub async fn dispatch(
        &self,
        rows: &mut [ExpectationRow],
    ) -> Result<DispatchReport, DispatcherError> {
        let started = Instant::now();
        let mut report = DispatchReport {
            skipped: skip_rows(rows.iter_mut().filter(|row| !row.enabled)),
            ..Default::default()
        };
        self.metrics.add_skipped(report.skipped);
        observability::metrics::record_send_skipped(report.skipped);

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let mut join_set: JoinSet<(usize, SendOutcome)> = JoinSet::new();

        for (idx, row) in rows.iter().enumerate() {
            if !row.enabled || !row.is_pending() {
                continue;
            }
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| DispatcherError::LimiterClosed(e.to_string()))?;

            let message = compose_message(row, &self.mail);
            let sender = Arc::clone(&self.sender);
            let metrics = Arc::clone(&self.metrics);
            let send_timeout = self.config.send_timeout;

            join_set.spawn(async move {
                let _permit = permit;
                let in_flight = metrics.inc_in_flight();
                observability::metrics::record_sends_in_flight(in_flight);

                let sent_at = Utc::now();
                let begin = Instant::now();
                let row_id = message.row_id.clone();

                // Own task so a panicking sender only fails this row.
                let attempt =
                    tokio::spawn(async move { tokio::time::timeout(send_timeout, sender.send(&message)).await });
                let error = match attempt.await {
                    Ok(Ok(Ok(()))) => None,
                    Ok(Ok(Err(err))) => Some(err.to_string()),
                    Ok(Err(_elapsed)) => Some(
                        ContractError::SendTimeout {
                            row_id: row_id.clone(),
                            timeout_ms: send_timeout.as_millis() as u64,
                        }
                        .to_string(),
                    ),
                    Err(join_err) => Some(format!("send task failed: {}", join_err)),
                };

                let in_flight = metrics.dec_in_flight();
                observability::metrics::record_sends_in_flight(in_flight);
                if error.is_none() {
                    metrics.inc_sent_count();
                } else {
                    metrics.inc_failure_count();
                }

                (
                    idx,
                    SendOutcome {
                        row_id,
                        error,
                        sent_at,
                        latency: begin.elapsed(),
                    },
                )
            });
        }

        while let Some(joined) = join_set.join_next().await {
            let (idx, outcome) = match joined {
                Ok(result) => result,
                Err(join_err) => {
                    // The wrapper never panics; only an aborted runtime gets here.
                    warn!(error = %join_err, "Send wrapper task lost");
                    continue;
                }
            };

            let latency_ms = outcome.latency.as_secs_f64() * 1000.0;
            observability::metrics::record_send(self.sender.name(), outcome.is_ok(), latency_ms);

            let row = &mut rows[idx];
            row.sent_at = Some(outcome.sent_at);
            match &outcome.error {
                None => {
                    report.sent_ok += 1;
                    debug!(row_id = %row.id, latency_ms, "Stimulus sent");
                }
                Some(reason) => {
                    report.failed += 1;
                    warn!(row_id = %row.id, reason = %reason, "Stimulus send failed");
                    if let Err(err) = row.mark_send_failed(reason.clone()) {
                        warn!(error = %err, "Unexpected row state after send");
                    }
                }
            }
            report.outcomes.push(outcome);
        }

        report.elapsed = started.elapsed();
        info!(
            sent_ok = report.sent_ok,
            failed = report.failed,
            skipped = report.skipped,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Dispatch complete"
        );
        Ok(report)
    }
}
