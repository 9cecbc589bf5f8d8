//! mr-core - Core library for the manifest runner
//!
//! This crate provides the static migration manifests, the run configuration
//! derived from CLI arguments, `--from`/`--to` range resolution and the
//! per-run statistics accumulator shared by the runner and the CLI.

pub mod config;
pub mod error;
pub mod manifest;
pub mod range;
pub mod stats;

pub use config::{default_log_file, resolve_against_root, RunConfig};
pub use error::{CoreError, CoreResult};
pub use manifest::{
    effective_manifest, ConditionalKind, MigrationEntry, Mode, BASELINE_FRESH, CORE_EXISTING,
};
pub use range::{find_index_by_name, resolve_range, RunRange};
pub use stats::{EntryStatus, ManifestStats};
