//! Run orchestration module.

mod orchestrator;
mod stats;

pub use orchestrator::{RunOrchestrator, RunOutcome};
pub use stats::RunStats;
