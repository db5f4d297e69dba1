//! `init-config` and `init-suite` command implementations.

use std::path::Path;

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::{ExpectationRow, ExpectedField, RunBlueprint, TestSuite};
use tracing::info;

use crate::cli::{InitConfigArgs, InitSuiteArgs};

const BLUEPRINT_SCAFFOLD: &str = r#"# Run blueprint for the mail-to-event verifier.
# Replace the example values below before `verifier run`.

[schema]
# Flattened, dot-separated paths of the event payload, in report order.
# kind: string (default), integer, float, boolean. Tolerances apply to float only.
fields = [
    { path = "mail.from" },
    { path = "mail.subject" },
    { path = "order.total", kind = "float" },
]

[matching]
# Both paths must appear in [schema].
sender_path = "mail.from"
subject_path = "mail.subject"

[mail]
to_address = "inbox@example.com"
# cc = ["audit@example.com"]
# bcc = []

[sender]
# log: only log the message; pickup_dir: write one .eml per row into params.dir
kind = "log"
# concurrency = 8
# send_timeout_secs = 30
# params = { dir = "outbox" }

[stream]
kind = "replay_file"
topic = "events"
# timeout_secs = 600
# poll_interval_ms = 500
# batch_size = 100
params = { path = "events.jsonl" }
"#;

const SUITE_HEADER: &str = "\
# Test suite skeleton. Fill in sender and subject for each row.
# expectation: empty = ignore, MUSS_LEER_SEIN = must be empty,
# `3,14+-0,2` / `3,14+0,2` = tolerance (float fields), anything else = exact match.

";

/// Execute the `init-config` command
pub fn run_init_config(args: &InitConfigArgs) -> Result<()> {
    write_new(&args.output, BLUEPRINT_SCAFFOLD, args.force)?;
    info!(path = %args.output.display(), "Blueprint scaffold written");
    println!("Wrote {}", args.output.display());
    Ok(())
}

/// Execute the `init-suite` command
pub fn run_init_suite(args: &InitSuiteArgs) -> Result<()> {
    let blueprint = ConfigLoader::load_blueprint(&args.config)
        .with_context(|| format!("Failed to load blueprint from {}", args.config.display()))?;

    let toml = ConfigLoader::suite_to_toml(&suite_skeleton(&blueprint))
        .context("Failed to render suite skeleton")?;
    write_new(&args.output, &format!("{SUITE_HEADER}{toml}"), args.force)?;

    info!(
        path = %args.output.display(),
        fields = blueprint.schema.fields.len(),
        "Suite skeleton written"
    );
    println!("Wrote {}", args.output.display());
    Ok(())
}

/// One row with an empty expectation per schema field
fn suite_skeleton(blueprint: &RunBlueprint) -> TestSuite {
    let mut row = ExpectationRow::new("TC-1", "", "");
    row.expected = blueprint
        .field_paths()
        .into_iter()
        .map(|path| ExpectedField::new(path, ""))
        .collect();
    TestSuite { rows: vec![row] }
}

fn write_new(path: &Path, content: &str, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}
