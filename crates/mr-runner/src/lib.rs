//! mr-runner - Manifest execution for the manifest runner
//!
//! This crate walks an effective manifest against one open connection:
//! range, optional and conditional skip rules, per-file execution, the
//! timestamped run log and the end-of-run report.

pub mod conditional;
pub mod error;
pub mod executor;
pub mod logger;
pub mod report;

pub use conditional::{
    check_for, decide_column_rename, should_run_conditional, ColumnRename, ConditionalCheck,
    ConditionalDecision, SkipReason,
};
pub use error::{RunnerError, RunnerResult};
pub use executor::{close_connection, execute_manifest, run_and_close, ExecutionPlan, CLOSE_TIMEOUT};
pub use logger::RunLogger;
pub use report::{log_summary, write_report, EntryOutcome, RunReport};
