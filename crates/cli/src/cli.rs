//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Verifier - send test mails and check the events they produce
#[derive(Parser, Debug)]
#[command(
    name = "verifier",
    author,
    version,
    about = "Mail-to-event verification runner",
    long_about = "Sends one stimulus mail per test row, watches the event stream for the\n\
                  events those mails produce, correlates them back to rows by sender and\n\
                  subject, and reports a verdict per row."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "VERIFIER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "compact",
        global = true,
        env = "VERIFIER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send the suite and verify the resulting events
    Run(RunArgs),

    /// Validate blueprint (and optionally suite) without running
    Validate(ValidateArgs),

    /// Display blueprint and suite information
    Info(InfoArgs),

    /// Write a commented placeholder blueprint
    InitConfig(InitConfigArgs),

    /// Write a suite skeleton with one empty expectation per schema field
    InitSuite(InitSuiteArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to the run blueprint (TOML or JSON)
    #[arg(short, long, default_value = "blueprint.toml", env = "VERIFIER_CONFIG")]
    pub config: PathBuf,

    /// Path to the test suite (TOML or JSON)
    #[arg(short, long, env = "VERIFIER_SUITE")]
    pub suite: PathBuf,

    /// Directory for the results file (default: suite directory)
    #[arg(short, long, env = "VERIFIER_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Validate, mark every row skipped and write the report without sending
    #[arg(long)]
    pub dry_run: bool,

    /// Override the window timeout in seconds
    #[arg(long, env = "VERIFIER_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Override the idle poll interval in milliseconds
    #[arg(long, env = "VERIFIER_POLL_INTERVAL_MS")]
    pub poll_interval_ms: Option<u64>,

    /// Override the send concurrency limit
    #[arg(long, env = "VERIFIER_CONCURRENCY")]
    pub concurrency: Option<usize>,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "VERIFIER_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to the run blueprint to validate
    #[arg(short, long, default_value = "blueprint.toml", env = "VERIFIER_CONFIG")]
    pub config: PathBuf,

    /// Optional test suite to validate against the blueprint
    #[arg(short, long)]
    pub suite: Option<PathBuf>,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to the run blueprint
    #[arg(short, long, default_value = "blueprint.toml", env = "VERIFIER_CONFIG")]
    pub config: PathBuf,

    /// Optional test suite to list
    #[arg(short, long)]
    pub suite: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, conflicts_with = "resolved")]
    pub json: bool,

    /// Print the effective blueprint (defaults filled in) as TOML
    #[arg(long)]
    pub resolved: bool,
}

/// Arguments for the `init-config` command
#[derive(Parser, Debug)]
pub struct InitConfigArgs {
    /// Where to write the blueprint
    #[arg(short, long, default_value = "blueprint.toml")]
    pub output: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the `init-suite` command
#[derive(Parser, Debug)]
pub struct InitSuiteArgs {
    /// Blueprint whose `[schema]` drives the skeleton
    #[arg(short, long, default_value = "blueprint.toml", env = "VERIFIER_CONFIG")]
    pub config: PathBuf,

    /// Where to write the suite
    #[arg(short, long, default_value = "suite.toml")]
    pub output: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    #[default]
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}
