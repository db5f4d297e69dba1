//! Run orchestrator - sequences dispatch, window consumption and verdicts.
//!
//! The watermark is captured first and threaded explicitly into the consumer. All
//! sends complete before the window opens; run-start preconditions are checked
//! before anything is sent.

use std::time::Duration;

use chrono::Utc;
use contracts::{
    EventDecoder, ExpectationRow, MessageSender, RunBlueprint, RunMetadata, RunReport, RunSummary,
    StreamSource,
};
use dispatcher::{skip_rows, Dispatcher};
use matching_engine::{finalize, preconditions, summarize, ConsumerStats, Watermark, WindowConsumer};
use tokio::sync::watch;
use tracing::{info, instrument, warn};

use super::RunStats;
use crate::error::Result;

/// Everything a finished run produced
#[derive(Debug)]
pub struct RunOutcome {
    pub report: RunReport,
    pub stats: RunStats,
}

/// Main run orchestrator
pub struct RunOrchestrator {
    blueprint: RunBlueprint,
}

impl RunOrchestrator {
    /// Create an orchestrator for a validated blueprint (CLI overrides already applied)
    pub fn new(blueprint: RunBlueprint) -> Self {
        Self { blueprint }
    }

    pub fn blueprint(&self) -> &RunBlueprint {
        &self.blueprint
    }

    /// Validate rows and settings, send every enabled row, then watch the stream.
    ///
    /// Fails only on run-fatal preconditions, before any message is sent. Every
    /// row-local problem ends up in the report.
    #[instrument(
        name = "run_orchestrator_execute",
        skip_all,
        fields(rows = rows.len(), topic = %self.blueprint.stream.topic)
    )]
    pub async fn execute<S, Src, D>(
        &self,
        mut rows: Vec<ExpectationRow>,
        sender: S,
        source: Src,
        decoder: D,
        cancel: watch::Receiver<bool>,
    ) -> Result<RunOutcome>
    where
        S: MessageSender + Sync + 'static,
        Src: StreamSource,
        D: EventDecoder,
    {
        let watermark = Watermark::now();
        let dispatch_config = self.blueprint.to_dispatch_config();
        let window_config = self.blueprint.to_window_config();

        preconditions::check_settings(&dispatch_config, &window_config)?;
        preconditions::check_rows(&rows)?;

        let mut stats = RunStats::default();

        // Dispatch
        let dispatcher = Dispatcher::new(sender, self.blueprint.mail.clone(), dispatch_config)?;
        let dispatch = dispatcher.dispatch(&mut rows).await?;
        for outcome in &dispatch.outcomes {
            stats
                .aggregator
                .record_send(outcome.is_ok(), outcome.latency.as_secs_f64() * 1000.0);
        }
        stats.aggregator.record_skipped(dispatch.skipped);
        stats.dispatch_elapsed = dispatch.elapsed;
        stats.peak_in_flight = dispatcher.metrics().peak_in_flight;

        // Window
        let consumer = WindowConsumer::new(
            source,
            decoder,
            self.blueprint.matching.clone(),
            window_config,
            watermark,
            cancel,
        );
        let window = consumer.run(rows).await;
        stats.aggregator.record_window(
            window.stop_reason.as_str(),
            window.elapsed.as_secs_f64() * 1000.0,
        );
        stats.polls = window.stats.polls;
        stats.poll_errors = window.stats.poll_errors;
        stats.conflicts = window.stats.correlation.conflicts;

        // Verdicts
        let verdicts = finalize(&window.rows, &self.blueprint.field_kinds());
        let summary = summarize(&window.rows, &verdicts, &window.stats);
        stats.aggregator.update_verdicts(&verdicts);
        stats.duration = watermark.elapsed();

        let report = self.build_report(&watermark, summary, verdicts, stats.duration, false);
        observability::metrics::record_run_summary(
            &report.summary,
            &report.verdicts,
            report.metadata.duration_ms as f64,
        );
        info!(
            passed = report.summary.passed,
            failed = report.summary.failed,
            not_found = report.summary.not_found,
            conflicted = report.summary.conflicted,
            stop_reason = window.stop_reason.as_str(),
            "Run complete"
        );

        Ok(RunOutcome { report, stats })
    }

    /// Validate rows and settings, then mark every row Skipped without sending.
    #[instrument(name = "run_orchestrator_dry_run", skip_all, fields(rows = rows.len()))]
    pub fn dry_run(&self, mut rows: Vec<ExpectationRow>) -> Result<RunOutcome> {
        let watermark = Watermark::now();
        preconditions::check_settings(
            &self.blueprint.to_dispatch_config(),
            &self.blueprint.to_window_config(),
        )?;
        preconditions::check_rows(&rows)?;

        let skipped = skip_rows(rows.iter_mut());
        warn!(skipped, "Dry run: no message sent, stream not consumed");

        let mut stats = RunStats::default();
        stats.aggregator.record_skipped(skipped);

        let verdicts = finalize(&rows, &self.blueprint.field_kinds());
        let summary = summarize(&rows, &verdicts, &ConsumerStats::default());
        stats.aggregator.update_verdicts(&verdicts);
        stats.duration = watermark.elapsed();

        let report = self.build_report(&watermark, summary, verdicts, stats.duration, true);
        Ok(RunOutcome { report, stats })
    }

    fn build_report(
        &self,
        watermark: &Watermark,
        summary: RunSummary,
        verdicts: Vec<contracts::Verdict>,
        duration: Duration,
        dry_run: bool,
    ) -> RunReport {
        RunReport {
            metadata: RunMetadata {
                run_start: watermark.at,
                finished_at: Utc::now(),
                topic: self.blueprint.stream.topic.clone(),
                timeout_secs: self.blueprint.stream.timeout_secs,
                duration_ms: duration.as_millis() as u64,
                dry_run,
            },
            summary,
            verdicts,
        }
    }
}
