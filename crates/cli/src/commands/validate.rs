//! `validate` command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use contracts::{RunBlueprint, SenderKind, TestSuite};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    suite_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    topic: String,
    field_count: usize,
    sender_kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    row_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    enabled_rows: Option<usize>,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let mut result = ValidationResult {
        valid: false,
        config_path: args.config.display().to_string(),
        suite_path: args.suite.as_ref().map(|p| p.display().to_string()),
        error: None,
        warnings: None,
        summary: None,
    };

    let blueprint = match load_blueprint(&args.config) {
        Ok(blueprint) => blueprint,
        Err(error) => {
            result.error = Some(error);
            return result;
        }
    };

    let suite = match &args.suite {
        Some(path) => match load_suite(path, &blueprint) {
            Ok(suite) => Some(suite),
            Err(error) => {
                result.error = Some(error);
                return result;
            }
        },
        None => None,
    };

    let warnings = collect_warnings(&blueprint, suite.as_ref());
    result.valid = true;
    result.warnings = (!warnings.is_empty()).then_some(warnings);
    result.summary = Some(ConfigSummary {
        version: format!("{:?}", blueprint.version),
        topic: blueprint.stream.topic.clone(),
        field_count: blueprint.schema.fields.len(),
        sender_kind: format!("{:?}", blueprint.sender.kind),
        row_count: suite.as_ref().map(|s| s.rows.len()),
        enabled_rows: suite
            .as_ref()
            .map(|s| s.rows.iter().filter(|row| row.enabled).count()),
    });
    result
}

fn load_blueprint(path: &Path) -> std::result::Result<RunBlueprint, String> {
    if !path.exists() {
        return Err(format!("File not found: {}", path.display()));
    }
    config_loader::ConfigLoader::load_blueprint(path).map_err(|e| e.to_string())
}

/// Suite parse + schema checks + run-start preconditions
fn load_suite(path: &Path, blueprint: &RunBlueprint) -> std::result::Result<TestSuite, String> {
    if !path.exists() {
        return Err(format!("File not found: {}", path.display()));
    }
    let suite =
        config_loader::ConfigLoader::load_suite(path, blueprint).map_err(|e| e.to_string())?;
    matching_engine::preconditions::check_rows(&suite.rows).map_err(|e| e.to_string())?;
    Ok(suite)
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &RunBlueprint, suite: Option<&TestSuite>) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.sender.kind == SenderKind::Log {
        warnings.push("sender.kind is 'log' - no real message will be delivered".to_string());
    }
    if blueprint.stream.topic.is_empty() {
        warnings.push("stream.topic is empty - report metadata will have no topic".to_string());
    }

    if let Some(suite) = suite {
        if suite.rows.iter().all(|row| !row.enabled) {
            warnings.push("No enabled rows - every verdict will be SKIPPED".to_string());
        }
        for row in suite.rows.iter().filter(|row| row.enabled) {
            if row.expected.iter().all(|f| f.expectation.trim().is_empty()) {
                warnings.push(format!(
                    "Row '{}' asserts no field - a match alone yields OK",
                    row.id
                ));
            }
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);
        if let Some(ref suite) = result.suite_path {
            println!("✓ Suite is valid: {}", suite);
        }

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Topic: {}", summary.topic);
            println!("  Schema fields: {}", summary.field_count);
            println!("  Sender: {}", summary.sender_kind);
            if let (Some(rows), Some(enabled)) = (summary.row_count, summary.enabled_rows) {
                println!("  Rows: {} ({} enabled)", rows, enabled);
            }
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
