//! Resolved runtime settings handed to the dispatcher and the window consumer.
//!
//! These are derived from the blueprint (plus CLI overrides) and carry `Duration`s
//! instead of raw integers.

use std::time::Duration;

/// Default global window timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);
/// Default idle poll interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
/// Default max records per poll
pub const DEFAULT_BATCH_SIZE: usize = 100;
/// Default send concurrency
pub const DEFAULT_CONCURRENCY: usize = 4;
/// Default per-send timeout
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Window consumer settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowConfig {
    /// Elapsed time since `run_start` after which pending rows become NotFound
    pub timeout: Duration,

    /// Wait between cycles that yielded nothing eligible
    pub poll_interval: Duration,

    /// Max records requested per poll
    pub batch_size: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Dispatcher settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Max in-flight sends
    pub concurrency: usize,

    /// Upper bound for a single send
    pub send_timeout: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }
}
