//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::RunBlueprint;
use tokio::sync::watch;
use tracing::{info, warn};

use verifier_cli::{write_report, CliError, RunOrchestrator, RunOutcome};

use crate::cli::RunArgs;

/// Execute the `run` command
pub async fn run_suite(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), suite = %args.suite.display(), "Loading configuration");

    for path in [&args.config, &args.suite] {
        if !path.exists() {
            return Err(CliError::config_not_found(path.display().to_string()).into());
        }
    }

    let mut blueprint = config_loader::ConfigLoader::load_blueprint(&args.config)
        .with_context(|| format!("Failed to load blueprint from {}", args.config.display()))?;
    apply_overrides(&mut blueprint, args);

    let suite = config_loader::ConfigLoader::load_suite(&args.suite, &blueprint)
        .with_context(|| format!("Failed to load suite from {}", args.suite.display()))?;

    info!(
        rows = suite.rows.len(),
        enabled = suite.rows.iter().filter(|row| row.enabled).count(),
        topic = %blueprint.stream.topic,
        sender = ?blueprint.sender.kind,
        timeout_secs = blueprint.stream.timeout_secs,
        "Configuration loaded"
    );

    let orchestrator = RunOrchestrator::new(blueprint);

    let outcome = if args.dry_run {
        info!("Dry run mode - no message is sent, stream is not consumed");
        orchestrator.dry_run(suite.rows)?
    } else {
        execute_live(&orchestrator, suite.rows).await?
    };

    let path = write_report(&outcome.report, &args.suite, args.output_dir.as_deref())?;
    outcome.stats.print_summary(&outcome.report.summary);
    println!("Report: {}", path.display());

    info!("Verifier finished");
    Ok(())
}

async fn execute_live(
    orchestrator: &RunOrchestrator,
    rows: Vec<contracts::ExpectationRow>,
) -> Result<RunOutcome> {
    let blueprint = orchestrator.blueprint();
    let sender = dispatcher::create_sender(&blueprint.sender).context("Failed to create sender")?;
    let source = ingestion::create_source(&blueprint.stream)
        .await
        .context("Failed to open stream source")?;
    let decoder = ingestion::JsonEventDecoder::from_blueprint(blueprint);

    // Operator abort closes the window early; pending rows become NOT_FOUND.
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let signal_task = tokio::spawn(async move {
        shutdown_signal().await;
        warn!("Received shutdown signal, closing the window...");
        let _ = cancel_tx.send(true);
    });

    let result = orchestrator
        .execute(rows, sender, source, decoder, cancel_rx)
        .await;
    signal_task.abort();

    Ok(result?)
}

/// Apply CLI overrides on top of the blueprint
fn apply_overrides(blueprint: &mut RunBlueprint, args: &RunArgs) {
    if let Some(timeout) = args.timeout {
        info!(timeout_secs = timeout, "Overriding window timeout from CLI");
        blueprint.stream.timeout_secs = timeout;
    }
    if let Some(interval) = args.poll_interval_ms {
        info!(poll_interval_ms = interval, "Overriding poll interval from CLI");
        blueprint.stream.poll_interval_ms = interval;
    }
    if let Some(concurrency) = args.concurrency {
        info!(concurrency, "Overriding send concurrency from CLI");
        blueprint.sender.concurrency = concurrency;
    }
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
