//! Run command implementation
//!
//! Startup order matters: configuration errors are reported before any
//! database connection is opened, and once a connection exists it is closed
//! exactly once whatever happens to the run.

use anyhow::{Context, Result};
use chrono::Utc;
use mr_core::resolve_against_root;
use mr_db::DatabaseUrl;
use mr_runner::logger::timestamp;
use mr_runner::{log_summary, run_and_close, write_report, ExecutionPlan, RunLogger};
use std::fmt::Display;

use crate::cli::{GlobalArgs, RunArgs};
use crate::commands::common::{build_run_config, ExitCode};

/// Execute the run command
pub(crate) async fn execute(args: &RunArgs, global: &GlobalArgs) -> Result<()> {
    execute_with(args, global, true).await
}

async fn execute_with(args: &RunArgs, global: &GlobalArgs, echo: bool) -> Result<()> {
    let Some(raw_url) = global
        .database_url
        .as_deref()
        .filter(|url| !url.trim().is_empty())
    else {
        eprintln!("[{}] [FATAL] DATABASE_URL is not set", timestamp());
        return Err(ExitCode(1).into());
    };
    let url = DatabaseUrl::parse(raw_url).context("Invalid DATABASE_URL")?;

    let config = build_run_config(args, global, Utc::now());
    log::debug!("run config: {config:?}");
    let logger = RunLogger::open(&config.log_file).context("Failed to open run log")?;
    let mut logger = if echo { logger } else { logger.without_echo() };

    let plan = match ExecutionPlan::resolve(&config) {
        Ok(plan) => plan,
        Err(e) => return fatal(&mut logger, e),
    };

    logger.log(format!("Connecting to {url}"))?;
    let db = match mr_db::connect_url(&url).await {
        Ok(db) => db,
        Err(e) => return fatal(&mut logger, e),
    };

    let report = run_and_close(db.as_ref(), &plan, &config, &mut logger).await?;
    log_summary(&mut logger, &report)?;

    if let Some(path) = &args.report_file {
        let path = resolve_against_root(&config.repo_root, path);
        write_report(&report, &path)?;
        logger.log(format!("Report written to {}", path.display()))?;
    }

    if let Some(reason) = &report.aborted {
        logger.fatal(format!("Run aborted: {reason}"))?;
        return Err(ExitCode(1).into());
    }
    if report.stats.has_failures() {
        return Err(ExitCode(1).into());
    }
    Ok(())
}

/// Log `err` as a fatal line and exit non-zero
fn fatal(logger: &mut RunLogger, err: impl Display) -> Result<()> {
    logger.fatal(err.to_string())?;
    Err(ExitCode(1).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mr_core::{MigrationEntry, CORE_EXISTING};
    use std::fs;
    use std::path::Path;

    fn seed_repo(root: &Path, fail_on: Option<&str>) {
        for entry in CORE_EXISTING {
            let path = root.join(entry.file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, sql_for(entry, fail_on)).unwrap();
        }
    }

    fn sql_for(entry: &MigrationEntry, fail_on: Option<&str>) -> String {
        let stem = entry.basename().trim_end_matches(".sql");
        if fail_on == Some(entry.basename()) {
            return "SELECT * FROM no_such_table;".to_string();
        }
        match stem {
            "001_campaign_slug" => {
                "CREATE TABLE IF NOT EXISTS donatur (id INTEGER, no_hp VARCHAR);".to_string()
            }
            "004_donatur_contact_rename" => {
                "ALTER TABLE donatur RENAME COLUMN no_hp TO phone;".to_string()
            }
            _ => format!("CREATE TABLE IF NOT EXISTS t_{stem} (id INTEGER);"),
        }
    }

    fn global(root: &Path, url: Option<String>) -> GlobalArgs {
        GlobalArgs {
            verbose: false,
            project_dir: root.to_path_buf(),
            database_url: url,
        }
    }

    fn duckdb_url(root: &Path) -> Option<String> {
        Some(format!("duckdb://{}", root.join("app.duckdb").display()))
    }

    fn exit_code(result: Result<()>) -> Option<i32> {
        result.err().and_then(|e| e.downcast_ref::<ExitCode>().map(|ec| ec.0))
    }

    fn args_with_log(root: &Path) -> RunArgs {
        RunArgs {
            log_file: Some(root.join("run.log")),
            ..RunArgs::default()
        }
    }

    #[tokio::test]
    async fn test_missing_database_url_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let args = args_with_log(dir.path());
        let result = execute_with(&args, &global(dir.path(), None), false).await;
        assert_eq!(exit_code(result), Some(1));
        // Nothing else happens, not even the log file.
        assert!(!dir.path().join("run.log").exists());
    }

    #[tokio::test]
    async fn test_unsupported_url_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let args = args_with_log(dir.path());
        let url = Some("mysql://root@localhost/app".to_string());
        let result = execute_with(&args, &global(dir.path(), url), false).await;
        let err = result.unwrap_err();
        assert!(format!("{err:#}").contains("mysql"));
    }

    #[tokio::test]
    async fn test_keyvalue_url_goes_to_postgres() {
        let dir = tempfile::tempdir().unwrap();
        seed_repo(dir.path(), None);
        let args = args_with_log(dir.path());
        let url = Some("host=127.0.0.1 port=1 user=app dbname=donasi sslmode=disable".to_string());
        let result = execute_with(&args, &global(dir.path(), url), false).await;

        assert_eq!(exit_code(result), Some(1));
        let log = fs::read_to_string(dir.path().join("run.log")).unwrap();
        assert!(log.contains("Connecting to host=127.0.0.1 port=1"));
        assert!(log.contains("[FATAL] [D001]"));
        assert!(!log.contains("Result: SUCCESS"));
    }

    #[tokio::test]
    async fn test_unknown_range_is_fatal_before_connecting() {
        let dir = tempfile::tempdir().unwrap();
        seed_repo(dir.path(), None);
        let args = RunArgs {
            from: Some("999_missing.sql".to_string()),
            ..args_with_log(dir.path())
        };
        let result = execute_with(&args, &global(dir.path(), duckdb_url(dir.path())), false).await;

        assert_eq!(exit_code(result), Some(1));
        let log = fs::read_to_string(dir.path().join("run.log")).unwrap();
        assert!(log.contains("[FATAL] [M001] --from entry not found in manifest: 999_missing.sql"));
        assert!(!dir.path().join("app.duckdb").exists());
    }

    #[tokio::test]
    async fn test_successful_run_exits_zero_and_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        seed_repo(dir.path(), None);
        let args = RunArgs {
            report_file: Some("reports/run.json".into()),
            ..args_with_log(dir.path())
        };
        let result = execute_with(&args, &global(dir.path(), duckdb_url(dir.path())), false).await;

        assert!(result.is_ok());
        let log = fs::read_to_string(dir.path().join("run.log")).unwrap();
        assert!(log.contains("Connecting to duckdb://"));
        assert!(log.contains("Executed:             9"));
        assert!(log.contains("Result: SUCCESS"));
        assert!(dir.path().join("reports/run.json").exists());
    }

    #[tokio::test]
    async fn test_failures_exit_non_zero_with_continue_on_error() {
        let dir = tempfile::tempdir().unwrap();
        seed_repo(dir.path(), Some("005_revenue_sharing.sql"));
        let args = RunArgs {
            continue_on_error: true,
            ..args_with_log(dir.path())
        };
        let result = execute_with(&args, &global(dir.path(), duckdb_url(dir.path())), false).await;

        assert_eq!(exit_code(result), Some(1));
        let log = fs::read_to_string(dir.path().join("run.log")).unwrap();
        assert!(log.contains("Failed:               1"));
        assert!(log.contains("Executed:             8"));
        assert!(log.contains("Result: COMPLETED WITH FAILURES"));
        assert!(!log.contains("Run aborted"));
    }

    #[tokio::test]
    async fn test_abort_is_logged_fatal() {
        let dir = tempfile::tempdir().unwrap();
        seed_repo(dir.path(), Some("002_mustahiq_master.sql"));
        let args = args_with_log(dir.path());
        let result = execute_with(&args, &global(dir.path(), duckdb_url(dir.path())), false).await;

        assert_eq!(exit_code(result), Some(1));
        let log = fs::read_to_string(dir.path().join("run.log")).unwrap();
        assert!(log.contains("[FATAL] Run aborted: packages/db/migrations/002_mustahiq_master.sql"));
    }

    #[tokio::test]
    async fn test_skips_only_exits_zero() {
        let dir = tempfile::tempdir().unwrap();
        seed_repo(dir.path(), None);
        let args = RunArgs {
            dry_run: true,
            ..args_with_log(dir.path())
        };
        let result = execute_with(&args, &global(dir.path(), duckdb_url(dir.path())), false).await;
        assert!(result.is_ok());
    }
}
