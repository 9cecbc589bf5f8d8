//! Error types for mr-runner

use mr_core::CoreError;
use mr_db::DbError;
use thiserror::Error;

/// Errors that stop a run outright.
///
/// Per-entry failures (missing file, SQL error) are not errors here; they are
/// recorded in the report and counted in the stats.
#[derive(Error, Debug)]
pub enum RunnerError {
    /// R001: Run log could not be created or opened
    #[error("[R001] Failed to open log file {path}: {source}")]
    LogOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// R002: Run log write failed
    #[error("[R002] Failed to write log file {path}: {source}")]
    LogWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// R003: Run report could not be written
    #[error("[R003] Failed to write run report {path}: {message}")]
    Report { path: String, message: String },

    /// Manifest or range configuration error
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Database error outside of a single entry
    #[error(transparent)]
    Db(#[from] DbError),
}

/// Result type alias for RunnerError
pub type RunnerResult<T> = Result<T, RunnerError>;
