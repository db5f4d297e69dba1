//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{RunBlueprint, TestSuite};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    schema: Vec<FieldInfo>,
    matching: MatchingInfo,
    mail: MailInfo,
    sender: SenderInfo,
    stream: StreamInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    rows: Vec<RowInfo>,
}

#[derive(Serialize)]
struct FieldInfo {
    path: String,
    kind: String,
}

#[derive(Serialize)]
struct MatchingInfo {
    sender_path: String,
    subject_path: String,
}

#[derive(Serialize)]
struct MailInfo {
    to_address: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    cc: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    bcc: Vec<String>,
}

#[derive(Serialize)]
struct SenderInfo {
    kind: String,
    concurrency: usize,
    send_timeout_secs: u64,
}

#[derive(Serialize)]
struct StreamInfo {
    kind: String,
    topic: String,
    timeout_secs: u64,
    poll_interval_ms: u64,
    batch_size: usize,
}

#[derive(Serialize)]
struct RowInfo {
    id: String,
    enabled: bool,
    sender: String,
    subject: String,
    asserted_fields: usize,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_blueprint(&args.config)
        .with_context(|| format!("Failed to load blueprint from {}", args.config.display()))?;

    let suite = match &args.suite {
        Some(path) => Some(
            config_loader::ConfigLoader::load_suite(path, &blueprint)
                .with_context(|| format!("Failed to load suite from {}", path.display()))?,
        ),
        None => None,
    };

    if args.resolved {
        let toml = config_loader::ConfigLoader::to_toml(&blueprint)
            .context("Failed to render resolved blueprint")?;
        print!("{}", toml);
    } else if args.json {
        let info = build_config_info(&blueprint, suite.as_ref());
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, suite.as_ref());
    }

    Ok(())
}

fn build_config_info(blueprint: &RunBlueprint, suite: Option<&TestSuite>) -> ConfigInfo {
    let rows = suite
        .map(|suite| {
            suite
                .rows
                .iter()
                .map(|row| RowInfo {
                    id: row.id.clone(),
                    enabled: row.enabled,
                    sender: row.sender.clone(),
                    subject: row.subject.clone(),
                    asserted_fields: row
                        .expected
                        .iter()
                        .filter(|f| !f.expectation.trim().is_empty())
                        .count(),
                })
                .collect()
        })
        .unwrap_or_default();

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        schema: blueprint
            .schema
            .fields
            .iter()
            .map(|f| FieldInfo {
                path: f.path.clone(),
                kind: format!("{:?}", f.kind),
            })
            .collect(),
        matching: MatchingInfo {
            sender_path: blueprint.matching.sender_path.clone(),
            subject_path: blueprint.matching.subject_path.clone(),
        },
        mail: MailInfo {
            to_address: blueprint.mail.to_address.clone(),
            cc: blueprint.mail.cc.clone(),
            bcc: blueprint.mail.bcc.clone(),
        },
        sender: SenderInfo {
            kind: format!("{:?}", blueprint.sender.kind),
            concurrency: blueprint.sender.concurrency,
            send_timeout_secs: blueprint.sender.send_timeout_secs,
        },
        stream: StreamInfo {
            kind: format!("{:?}", blueprint.stream.kind),
            topic: blueprint.stream.topic.clone(),
            timeout_secs: blueprint.stream.timeout_secs,
            poll_interval_ms: blueprint.stream.poll_interval_ms,
            batch_size: blueprint.stream.batch_size,
        },
        rows,
    }
}

fn print_config_info(blueprint: &RunBlueprint, suite: Option<&TestSuite>) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                  Verifier Configuration                      ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("Schema ({} fields, {:?})", blueprint.schema.fields.len(), blueprint.version);
    for (i, field) in blueprint.schema.fields.iter().enumerate() {
        let prefix = if i == blueprint.schema.fields.len() - 1 { "└─" } else { "├─" };
        let role = if field.path == blueprint.matching.sender_path {
            " [sender]"
        } else if field.path == blueprint.matching.subject_path {
            " [subject]"
        } else {
            ""
        };
        println!("   {} {} ({:?}){}", prefix, field.path, field.kind, role);
    }

    println!("\nMail");
    println!("   ├─ To: {}", blueprint.mail.to_address);
    println!("   ├─ Cc: {}", blueprint.mail.cc.join(", "));
    println!("   └─ Bcc: {}", blueprint.mail.bcc.join(", "));

    let sender = &blueprint.sender;
    println!("\nSender");
    println!("   ├─ Kind: {:?}", sender.kind);
    println!("   ├─ Concurrency: {}", sender.concurrency);
    println!("   └─ Send timeout: {}s", sender.send_timeout_secs);

    let stream = &blueprint.stream;
    println!("\nStream");
    println!("   ├─ Kind: {:?}", stream.kind);
    println!("   ├─ Topic: {}", stream.topic);
    println!("   ├─ Timeout: {}s", stream.timeout_secs);
    println!("   ├─ Poll interval: {}ms", stream.poll_interval_ms);
    println!("   └─ Batch size: {}", stream.batch_size);

    if let Some(suite) = suite {
        println!("\nRows ({})", suite.rows.len());
        for (i, row) in suite.rows.iter().enumerate() {
            let prefix = if i == suite.rows.len() - 1 { "└─" } else { "├─" };
            let flag = if row.enabled { "" } else { " (disabled)" };
            println!(
                "   {} {}: {} / {}{}",
                prefix, row.id, row.sender, row.subject, flag
            );
        }
    }

    println!();
}
