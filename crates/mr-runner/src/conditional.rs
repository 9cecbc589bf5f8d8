//! Conditional evaluator
//!
//! Conditional entries are checked against the live schema before they run.
//! Each `ConditionalKind` maps to exactly one `ConditionalCheck`; adding a
//! conditional migration means adding a kind and its arm in `check_for`.

use mr_core::{ConditionalKind, MigrationEntry};
use mr_db::{Database, DbResult};
use serde::Serialize;
use std::fmt;

/// Column rename that is only safe to apply once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRename {
    pub table: &'static str,
    pub legacy_column: &'static str,
    pub renamed_column: &'static str,
}

/// Live-schema predicate behind a conditional tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionalCheck {
    ColumnRename(ColumnRename),
}

/// The check registered for `kind`
pub fn check_for(kind: ConditionalKind) -> ConditionalCheck {
    match kind {
        ConditionalKind::DonaturContactRename => ConditionalCheck::ColumnRename(ColumnRename {
            table: "donatur",
            legacy_column: "no_hp",
            renamed_column: "phone",
        }),
    }
}

/// Why a conditional entry was not run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The change is already present
    AlreadyApplied,
    /// Both the old and the new shape exist; an operator has to decide
    Ambiguous,
    /// Neither shape exists
    PreconditionMismatch,
}

impl SkipReason {
    pub fn needs_manual_check(self) -> bool {
        self == SkipReason::Ambiguous
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::AlreadyApplied => write!(f, "already renamed"),
            SkipReason::Ambiguous => write!(f, "ambiguous, needs manual check"),
            SkipReason::PreconditionMismatch => write!(f, "schema does not match precondition"),
        }
    }
}

/// Result of evaluating a conditional entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionalDecision {
    Run,
    Skip(SkipReason),
}

/// Decide a column rename from the table's current column names.
///
/// | legacy | renamed | decision |
/// |--------|---------|----------|
/// | yes    | no      | run |
/// | no     | yes     | skip, already renamed |
/// | yes    | yes     | skip, ambiguous |
/// | no     | no      | skip, precondition mismatch |
pub fn decide_column_rename(columns: &[String], rename: &ColumnRename) -> ConditionalDecision {
    let has = |name: &str| columns.iter().any(|c| c.eq_ignore_ascii_case(name));

    match (has(rename.legacy_column), has(rename.renamed_column)) {
        (true, false) => ConditionalDecision::Run,
        (false, true) => ConditionalDecision::Skip(SkipReason::AlreadyApplied),
        (true, true) => ConditionalDecision::Skip(SkipReason::Ambiguous),
        (false, false) => ConditionalDecision::Skip(SkipReason::PreconditionMismatch),
    }
}

/// Evaluate `entry`'s conditional against the live database.
///
/// Entries without a conditional always run.
pub async fn should_run_conditional(
    db: &dyn Database,
    entry: &MigrationEntry,
) -> DbResult<ConditionalDecision> {
    let Some(kind) = entry.conditional else {
        return Ok(ConditionalDecision::Run);
    };

    match check_for(kind) {
        ConditionalCheck::ColumnRename(rename) => {
            let columns = db.column_names(rename.table).await?;
            log::debug!(
                "{}: columns of {} = {:?}",
                kind,
                rename.table,
                columns
            );
            Ok(decide_column_rename(&columns, &rename))
        }
    }
}

#[cfg(test)]
#[path = "conditional_test.rs"]
mod tests;
