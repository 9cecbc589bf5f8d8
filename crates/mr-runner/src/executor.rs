//! Manifest executor
//!
//! Entries are decided in a fixed precedence: range skip, optional skip,
//! conditional skip, missing file, dry run, execute. Execution is strictly
//! sequential over a single connection; there is no per-statement timeout
//! and no transaction wrapping beyond what each SQL file declares itself.

use chrono::Utc;
use mr_core::{CoreResult, EntryStatus, MigrationEntry, RunConfig, RunRange};
use mr_db::Database;
use std::time::{Duration, Instant};

use crate::conditional::{should_run_conditional, ConditionalDecision};
use crate::error::RunnerResult;
use crate::logger::RunLogger;
use crate::report::{EntryOutcome, FailureKind, RunReport};

/// Upper bound on waiting for the connection to close
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Effective manifest plus the resolved `--from`/`--to` range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    pub entries: Vec<MigrationEntry>,
    pub range: RunRange,
}

impl ExecutionPlan {
    /// Plan for `config`'s mode and range
    pub fn resolve(config: &RunConfig) -> CoreResult<Self> {
        let entries = config.manifest();
        let range = config.range(&entries)?;
        Ok(Self { entries, range })
    }

    /// Plan over explicit entries
    pub fn new(entries: Vec<MigrationEntry>, from: Option<&str>, to: Option<&str>) -> CoreResult<Self> {
        let range = mr_core::resolve_range(&entries, from, to)?;
        Ok(Self { entries, range })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Walk `plan` against `db`, logging every decision.
///
/// Per-entry failures are recorded in the returned report. Without
/// `continue_on_error` the first failure stops the walk and sets
/// `RunReport::aborted`. An `Err` means the run log itself failed.
/// The connection is left open; see [`run_and_close`].
pub async fn execute_manifest(
    db: &dyn Database,
    plan: &ExecutionPlan,
    config: &RunConfig,
    logger: &mut RunLogger,
) -> RunnerResult<RunReport> {
    let total = plan.len();
    let mut report = RunReport::new(config, plan.range, total, db.db_type());

    logger.log(format!(
        "Manifest run {} started: mode={} backend={} entries={}",
        report.run_id,
        config.mode,
        db.db_type(),
        total
    ))?;
    logger.log(format!(
        "Flags: dry_run={} continue_on_error={} include_optional={}",
        config.dry_run, config.continue_on_error, config.include_optional
    ))?;
    if config.from_entry.is_some() || config.to_entry.is_some() {
        logger.log(format!(
            "Range: #{} ({}) .. #{} ({})",
            plan.range.start + 1,
            config.from_entry.as_deref().unwrap_or("start"),
            plan.range.end + 1,
            config.to_entry.as_deref().unwrap_or("end")
        ))?;
    }
    logger.log(format!("Repository root: {}", config.repo_root.display()))?;
    logger.log(format!("Log file: {}", logger.path().display()))?;

    for (index, entry) in plan.entries.iter().enumerate() {
        let outcome = run_entry(db, plan, config, index, entry).await;
        log_outcome(logger, total, &outcome)?;

        let failed = outcome.status == EntryStatus::Failed;
        let file = outcome.file.clone();
        let detail = outcome.detail.clone().unwrap_or_default();
        report.record(outcome);

        if failed && !config.continue_on_error {
            logger.log(format!(
                "Stopping after failure in {file} (use --continue-on-error to keep going)"
            ))?;
            report.aborted = Some(format!("{file}: {detail}"));
            break;
        }
    }

    report.finished_at = Some(Utc::now());
    Ok(report)
}

/// Run `plan` and then close `db` exactly once, whatever the outcome.
///
/// A close failure is logged but never replaces the run's own result.
pub async fn run_and_close(
    db: &dyn Database,
    plan: &ExecutionPlan,
    config: &RunConfig,
    logger: &mut RunLogger,
) -> RunnerResult<RunReport> {
    let result = execute_manifest(db, plan, config, logger).await;
    close_connection(db, logger, CLOSE_TIMEOUT).await;
    result
}

/// Close `db`, waiting at most `timeout`
pub async fn close_connection(db: &dyn Database, logger: &mut RunLogger, timeout: Duration) {
    let message = match tokio::time::timeout(timeout, db.close()).await {
        Ok(Ok(())) => {
            log::debug!("{} connection closed", db.db_type());
            return;
        }
        Ok(Err(e)) => format!("Failed to close database connection: {e}"),
        Err(_) => format!(
            "Timed out after {}ms closing database connection",
            timeout.as_millis()
        ),
    };
    if let Err(e) = logger.warn(&message) {
        log::warn!("{message} ({e})");
    }
}

/// Decide and, if due, execute one entry
async fn run_entry(
    db: &dyn Database,
    plan: &ExecutionPlan,
    config: &RunConfig,
    index: usize,
    entry: &MigrationEntry,
) -> EntryOutcome {
    let position = index + 1;

    if !plan.range.contains(index) {
        return EntryOutcome::new(position, entry, EntryStatus::SkippedRange);
    }

    if entry.optional && !config.include_optional {
        return EntryOutcome::new(position, entry, EntryStatus::SkippedOptional)
            .with_detail("optional, pass --include-optional to run");
    }

    match should_run_conditional(db, entry).await {
        Ok(ConditionalDecision::Run) => {}
        Ok(ConditionalDecision::Skip(reason)) => {
            let mut outcome = EntryOutcome::new(position, entry, EntryStatus::SkippedConditional)
                .with_detail(reason.to_string());
            outcome.skip_reason = Some(reason);
            return outcome;
        }
        Err(e) => {
            return EntryOutcome::failed(
                position,
                entry,
                FailureKind::ConditionalCheck,
                format!("conditional check failed: {e}"),
            );
        }
    }

    let path = config.entry_path(entry);
    if !path.exists() {
        return EntryOutcome::failed(
            position,
            entry,
            FailureKind::MissingFile,
            format!("file not found: {}", path.display()),
        );
    }

    let sql = match tokio::fs::read_to_string(&path).await {
        Ok(sql) => sql,
        Err(e) => {
            return EntryOutcome::failed(
                position,
                entry,
                FailureKind::Read,
                format!("failed to read {}: {e}", path.display()),
            );
        }
    };

    if config.dry_run {
        return EntryOutcome::new(position, entry, EntryStatus::DryRun)
            .with_detail(format!("would execute {} bytes", sql.len()))
            .with_checksum(&sql);
    }

    let started = Instant::now();
    let result = db.execute_batch(&sql).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    let mut outcome = match result {
        Ok(()) => EntryOutcome::new(position, entry, EntryStatus::Executed),
        Err(e) => EntryOutcome::failed(position, entry, FailureKind::Execution, e.to_string()),
    };
    outcome.duration_ms = Some(elapsed_ms);
    outcome.with_checksum(&sql)
}

fn log_outcome(logger: &mut RunLogger, total: usize, outcome: &EntryOutcome) -> RunnerResult<()> {
    let mut line = format!(
        "[{}/{}] {} {}",
        outcome.position,
        total,
        outcome.label(),
        outcome.file
    );
    if let Some(ms) = outcome.duration_ms {
        line.push_str(&format!(" ({ms}ms)"));
    }
    if let Some(detail) = &outcome.detail {
        line.push_str(&format!(": {detail}"));
    }
    logger.log(line)
}

#[cfg(test)]
#[path = "executor_test.rs"]
mod tests;
