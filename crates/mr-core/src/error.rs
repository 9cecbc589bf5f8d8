//! Error types for mr-core

use thiserror::Error;

/// Core error type for the manifest runner
#[derive(Error, Debug)]
pub enum CoreError {
    /// M001: `--from` / `--to` value does not name any manifest entry
    #[error("[M001] --{flag} entry not found in manifest: {name}")]
    EntryNotFound { flag: &'static str, name: String },

    /// M002: `--from` resolves to a later position than `--to`
    #[error("[M002] --from entry '{from}' (#{from_position}) is after --to entry '{to}' (#{to_position})")]
    RangeOutOfOrder {
        from: String,
        from_position: usize,
        to: String,
        to_position: usize,
    },

}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
