//! Run report and end-of-run summary

use chrono::{DateTime, Utc};
use mr_core::{EntryStatus, ManifestStats, MigrationEntry, Mode, RunConfig, RunRange};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use uuid::Uuid;

use crate::conditional::SkipReason;
use crate::error::{RunnerError, RunnerResult};
use crate::logger::RunLogger;

/// Why an entry counted as failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// SQL file does not exist under the repository root
    MissingFile,
    /// Schema inspection for a conditional entry errored
    ConditionalCheck,
    /// SQL file exists but could not be read
    Read,
    /// The database rejected the SQL
    Execution,
}

/// What happened to one manifest entry
#[derive(Debug, Clone, Serialize)]
pub struct EntryOutcome {
    /// 1-based position in the effective manifest
    pub position: usize,
    pub file: String,
    pub status: EntryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<SkipReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// SHA-256 of the SQL text, for entries whose file was read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

impl EntryOutcome {
    pub(crate) fn new(position: usize, entry: &MigrationEntry, status: EntryStatus) -> Self {
        Self {
            position,
            file: entry.file.to_string(),
            status,
            failure: None,
            skip_reason: None,
            duration_ms: None,
            detail: None,
            checksum: None,
        }
    }

    pub(crate) fn failed(
        position: usize,
        entry: &MigrationEntry,
        kind: FailureKind,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            failure: Some(kind),
            detail: Some(detail.into()),
            ..Self::new(position, entry, EntryStatus::Failed)
        }
    }

    pub(crate) fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub(crate) fn with_checksum(mut self, sql: &str) -> Self {
        self.checksum = Some(compute_checksum(sql));
        self
    }

    /// Tag written at the start of the entry's log line
    pub fn label(&self) -> &'static str {
        match self.failure {
            Some(FailureKind::MissingFile) => "ERROR:MISSING",
            _ => self.status.label(),
        }
    }

    /// Skipped because the schema needs an operator's decision
    pub fn needs_manual_check(&self) -> bool {
        self.skip_reason.is_some_and(SkipReason::needs_manual_check)
    }
}

/// Full record of one run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub mode: Mode,
    pub dry_run: bool,
    pub continue_on_error: bool,
    pub include_optional: bool,
    pub backend: String,
    pub range: RunRange,
    pub stats: ManifestStats,
    pub outcomes: Vec<EntryOutcome>,
    /// Set when a failure stopped the run early
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,
}

impl RunReport {
    pub(crate) fn new(config: &RunConfig, range: RunRange, total: usize, backend: &str) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string()[..8].to_string(),
            started_at: config.started_at,
            finished_at: None,
            mode: config.mode,
            dry_run: config.dry_run,
            continue_on_error: config.continue_on_error,
            include_optional: config.include_optional,
            backend: backend.to_string(),
            range,
            stats: ManifestStats::new(total),
            outcomes: Vec::new(),
            aborted: None,
        }
    }

    pub(crate) fn record(&mut self, outcome: EntryOutcome) {
        self.stats.record(outcome.status);
        self.outcomes.push(outcome);
    }

    /// No failures and no early stop
    pub fn succeeded(&self) -> bool {
        self.aborted.is_none() && !self.stats.has_failures()
    }
}

/// SHA-256 hex digest of a SQL file's text
pub fn compute_checksum(sql: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(sql.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Write the summary block to the run log
pub fn log_summary(logger: &mut RunLogger, report: &RunReport) -> RunnerResult<()> {
    let stats = &report.stats;
    logger.log("========== SUMMARY ==========")?;
    logger.log(format!("Total:                {}", stats.total))?;
    logger.log(format!("Executed:             {}", stats.executed))?;
    logger.log(format!("Skipped (optional):   {}", stats.skipped_optional))?;
    logger.log(format!("Skipped (conditional): {}", stats.skipped_conditional))?;
    logger.log(format!("Skipped (range):      {}", stats.skipped_range))?;
    logger.log(format!("Failed:               {}", stats.failed))?;
    if report.dry_run {
        logger.log(format!("Dry run:              {}", stats.dry_run))?;
    }
    if stats.not_attempted() > 0 {
        logger.log(format!("Not attempted:        {}", stats.not_attempted()))?;
    }

    for outcome in report.outcomes.iter().filter(|o| o.needs_manual_check()) {
        logger.log(format!(
            "Manual check required: {} ({})",
            outcome.file,
            outcome.detail.as_deref().unwrap_or_default()
        ))?;
    }
    for outcome in report
        .outcomes
        .iter()
        .filter(|o| o.status == EntryStatus::Failed)
    {
        logger.log(format!(
            "Failed entry: {} - {}",
            outcome.file,
            outcome.detail.as_deref().unwrap_or_default()
        ))?;
    }

    let verdict = match (&report.aborted, stats.has_failures()) {
        (Some(_), _) => "ABORTED",
        (None, true) => "COMPLETED WITH FAILURES",
        (None, false) => "SUCCESS",
    };
    logger.log(format!("Result: {verdict} (run {})", report.run_id))?;
    logger.log("=============================")
}

/// Write `report` as pretty JSON to `path`, creating parent directories
pub fn write_report(report: &RunReport, path: &Path) -> RunnerResult<()> {
    let to_err = |message: String| RunnerError::Report {
        path: path.display().to_string(),
        message,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| to_err(e.to_string()))?;
    }
    let json = serde_json::to_string_pretty(report).map_err(|e| to_err(e.to_string()))?;
    fs::write(path, json).map_err(|e| to_err(e.to_string()))
}
