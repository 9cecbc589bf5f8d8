//! Shared utilities for CLI commands

use chrono::{DateTime, Utc};
use mr_core::{resolve_against_root, RunConfig};
use std::fmt;

use crate::cli::{GlobalArgs, RunArgs};

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that the run log and the connection are dropped before exiting.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Control flow only; the reason has already been logged.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Build the run configuration from parsed arguments.
///
/// `--from`/`--to` are carried through unvalidated; they are resolved
/// against the manifest later.
pub(crate) fn build_run_config(
    args: &RunArgs,
    global: &GlobalArgs,
    started_at: DateTime<Utc>,
) -> RunConfig {
    let mut config = RunConfig::new(args.mode(), global.project_dir.clone(), started_at);
    config.include_optional = args.include_optional;
    config.dry_run = args.dry_run;
    config.continue_on_error = args.continue_on_error;
    config.from_entry = args.from.clone();
    config.to_entry = args.to.clone();
    if let Some(log_file) = &args.log_file {
        config.log_file = resolve_against_root(&config.repo_root, log_file);
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mr_core::Mode;
    use std::path::PathBuf;

    fn global(project_dir: &str) -> GlobalArgs {
        GlobalArgs {
            verbose: false,
            project_dir: PathBuf::from(project_dir),
            database_url: None,
        }
    }

    #[test]
    fn test_exit_code_display_is_empty() {
        assert_eq!(ExitCode(1).to_string(), "");
    }

    #[test]
    fn test_build_config_defaults() {
        let started = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let config = build_run_config(&RunArgs::default(), &global("/repo"), started);
        assert_eq!(config.mode, Mode::Existing);
        assert_eq!(config.repo_root, PathBuf::from("/repo"));
        assert_eq!(
            config.log_file,
            PathBuf::from("/repo/packages/db/logs/production-manifest-2024-03-09T14-05-07.000Z.log")
        );
    }

    #[test]
    fn test_build_config_copies_flags() {
        let args = RunArgs {
            fresh: true,
            include_optional: true,
            dry_run: true,
            continue_on_error: true,
            from: Some("001_campaign_slug.sql".to_string()),
            to: Some("unknown.sql".to_string()),
            log_file: Some(PathBuf::from("logs/run.log")),
            ..RunArgs::default()
        };
        let config = build_run_config(&args, &global("/repo"), Utc::now());
        assert_eq!(config.mode, Mode::Fresh);
        assert!(config.include_optional && config.dry_run && config.continue_on_error);
        assert_eq!(config.from_entry.as_deref(), Some("001_campaign_slug.sql"));
        assert_eq!(config.to_entry.as_deref(), Some("unknown.sql"));
        assert_eq!(config.log_file, PathBuf::from("/repo/logs/run.log"));
    }

    #[test]
    fn test_absolute_log_file_kept() {
        let args = RunArgs {
            log_file: Some(PathBuf::from("/var/log/manifest.log")),
            ..RunArgs::default()
        };
        let config = build_run_config(&args, &global("/repo"), Utc::now());
        assert_eq!(config.log_file, PathBuf::from("/var/log/manifest.log"));
    }
}
