//! Run statistics and console summary.

use std::time::Duration;

use contracts::RunSummary;
use observability::RunStatsAggregator;

/// Statistics from one run
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Time spent in the dispatch phase
    pub dispatch_elapsed: Duration,

    /// Highest number of concurrent sends
    pub peak_in_flight: usize,

    /// Polls issued by the window consumer
    pub polls: u64,

    /// Polls that failed and were treated as empty cycles
    pub poll_errors: u64,

    /// Correlation conflicts raised
    pub conflicts: u64,

    /// Total duration of the run
    pub duration: Duration,

    /// Send / window / verdict aggregator
    pub aggregator: RunStatsAggregator,
}

impl RunStats {
    /// Print detailed summary
    pub fn print_summary(&self, summary: &RunSummary) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                        Run Statistics                        ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Rows: {} total, {} enabled", summary.total, summary.enabled);
        println!("   ├─ Sent OK: {}", summary.sent_ok);
        println!("   ├─ Matched: {}", summary.matched);
        println!("   ├─ Passed: {}", summary.passed);
        println!("   ├─ Failed: {}", summary.failed);
        println!("   ├─ Not found: {}", summary.not_found);
        println!("   ├─ Conflicted: {}", summary.conflicted);
        println!("   └─ Skipped: {}", summary.skipped);

        println!("\nStream");
        println!("   ├─ Polls: {} ({} errors)", self.polls, self.poll_errors);
        println!("   ├─ Unmatched events: {}", summary.unmatched_events);
        println!("   ├─ Correlation conflicts: {}", self.conflicts);
        println!("   ├─ Decode failures: {}", summary.decode_failures);
        println!(
            "   └─ Discarded before run start: {}",
            summary.discarded_before_watermark
        );

        println!("\nDispatch");
        println!("   ├─ Elapsed: {:.2}s", self.dispatch_elapsed.as_secs_f64());
        println!("   └─ Peak in flight: {}", self.peak_in_flight);

        println!("\n{}", self.aggregator.summary());
    }
}
