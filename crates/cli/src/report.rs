//! Run report file output.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use contracts::RunReport;
use tracing::info;

use crate::error::{CliError, Result};

/// `<suite-stem>-results-<yyyymmdd-HHMMSS>.json`
pub fn report_file_name(suite_path: &Path, finished_at: DateTime<Utc>) -> String {
    let stem = suite_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "suite".to_string());
    format!("{}-results-{}.json", stem, finished_at.format("%Y%m%d-%H%M%S"))
}

/// Write the report as pretty JSON; `output_dir` defaults to the suite directory.
pub fn write_report(
    report: &RunReport,
    suite_path: &Path,
    output_dir: Option<&Path>,
) -> Result<PathBuf> {
    let dir = match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => suite_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    let path = dir.join(report_file_name(suite_path, report.metadata.finished_at));

    let json = serde_json::to_string_pretty(report)?;
    std::fs::create_dir_all(&dir)
        .and_then(|_| std::fs::write(&path, json))
        .map_err(|source| CliError::ReportWrite {
            path: path.display().to_string(),
            source,
        })?;

    info!(path = %path.display(), verdicts = report.verdicts.len(), "Report written");
    Ok(path)
}
