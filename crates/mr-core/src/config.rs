//! Run configuration
//!
//! A `RunConfig` is built once from the command line and read-only for the
//! rest of the run.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::CoreResult;
use crate::manifest::{effective_manifest, MigrationEntry, Mode};
use crate::range::{resolve_range, RunRange};

/// Directory (relative to the repository root) that receives run logs
pub const LOGS_DIR: &str = "packages/db/logs";

/// File name prefix of generated run logs
pub const LOG_FILE_PREFIX: &str = "production-manifest-";

/// Settings for one manifest run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunConfig {
    /// Which manifest to walk
    pub mode: Mode,

    /// Run entries marked optional instead of skipping them
    pub include_optional: bool,

    /// Log intended actions without executing SQL
    pub dry_run: bool,

    /// Keep going after a failed entry
    pub continue_on_error: bool,

    /// First entry to attempt, by path or basename
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_entry: Option<String>,

    /// Last entry to attempt, by path or basename
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_entry: Option<String>,

    /// Root that manifest paths resolve against
    pub repo_root: PathBuf,

    /// Where the run log is appended
    pub log_file: PathBuf,

    /// Run start, shared by the default log file name and the report
    pub started_at: DateTime<Utc>,
}

impl RunConfig {
    /// Configuration with default flags for `mode` rooted at `repo_root`,
    /// for a run starting at `started_at`
    pub fn new(mode: Mode, repo_root: impl Into<PathBuf>, started_at: DateTime<Utc>) -> Self {
        let repo_root = repo_root.into();
        let log_file = default_log_file(&repo_root, started_at);
        Self {
            mode,
            include_optional: false,
            dry_run: false,
            continue_on_error: false,
            from_entry: None,
            to_entry: None,
            repo_root,
            log_file,
            started_at,
        }
    }

    /// Effective manifest for this run's mode
    pub fn manifest(&self) -> Vec<MigrationEntry> {
        effective_manifest(self.mode)
    }

    /// Resolve `--from` / `--to` against `entries`
    pub fn range(&self, entries: &[MigrationEntry]) -> CoreResult<RunRange> {
        resolve_range(
            entries,
            self.from_entry.as_deref(),
            self.to_entry.as_deref(),
        )
    }

    /// Absolute location of an entry's SQL file
    pub fn entry_path(&self, entry: &MigrationEntry) -> PathBuf {
        self.repo_root.join(entry.file)
    }
}

/// `packages/db/logs/production-manifest-<timestamp>.log` under `repo_root`.
///
/// The timestamp is ISO-8601 UTC with colons replaced by dashes so the name
/// is valid on every filesystem.
pub fn default_log_file(repo_root: &Path, started_at: DateTime<Utc>) -> PathBuf {
    let stamp = started_at
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace(':', "-");
    repo_root
        .join(LOGS_DIR)
        .join(format!("{LOG_FILE_PREFIX}{stamp}.log"))
}

/// Relative paths are taken relative to `repo_root`; absolute paths are kept
pub fn resolve_against_root(repo_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        repo_root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
    }

    #[test]
    fn test_default_log_file_name() {
        let path = default_log_file(Path::new("/repo"), fixed_time());
        assert_eq!(
            path,
            PathBuf::from("/repo/packages/db/logs/production-manifest-2024-03-09T14-05-07.000Z.log")
        );
    }

    #[test]
    fn test_resolve_relative_against_root() {
        let path = resolve_against_root(Path::new("/repo"), Path::new("logs/run.log"));
        assert_eq!(path, PathBuf::from("/repo/logs/run.log"));
    }

    #[test]
    fn test_resolve_absolute_kept() {
        let path = resolve_against_root(Path::new("/repo"), Path::new("/var/log/run.log"));
        assert_eq!(path, PathBuf::from("/var/log/run.log"));
    }

    #[test]
    fn test_new_config_defaults() {
        let config = RunConfig::new(Mode::Existing, "/repo", fixed_time());
        assert!(!config.include_optional);
        assert!(!config.dry_run);
        assert!(!config.continue_on_error);
        assert!(config.from_entry.is_none());
        assert!(config.log_file.starts_with("/repo/packages/db/logs"));
        assert_eq!(config.started_at, fixed_time());
        assert_eq!(config.manifest().len(), crate::CORE_EXISTING.len());
    }

    #[test]
    fn test_entry_path_joins_root() {
        let config = RunConfig::new(Mode::Fresh, "/repo", fixed_time());
        let entry = MigrationEntry::new("packages/db/drizzle/0000_initial_schema.sql");
        assert_eq!(
            config.entry_path(&entry),
            PathBuf::from("/repo/packages/db/drizzle/0000_initial_schema.sql")
        );
    }

    #[test]
    fn test_range_uses_config_bounds() {
        let mut config = RunConfig::new(Mode::Existing, "/repo", fixed_time());
        config.from_entry = Some("002_mustahiq_master.sql".to_string());
        config.to_entry = Some("005_revenue_sharing.sql".to_string());
        let range = config.range(&config.manifest()).unwrap();
        assert_eq!(range, RunRange { start: 1, end: 4 });
    }
}
