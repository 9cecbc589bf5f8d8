//! Database trait definition

use crate::error::DbResult;
use async_trait::async_trait;

/// Database abstraction trait for the manifest runner
///
/// A value of this trait is one exclusively owned connection.
/// Implementations must be Send + Sync for async operation.
#[async_trait]
pub trait Database: Send + Sync {
    /// Execute an unparameterized batch of one or more SQL statements
    async fn execute_batch(&self, sql: &str) -> DbResult<()>;

    /// Column names of `table` in ordinal order, empty if the table is absent.
    ///
    /// `table` may be schema-qualified; unqualified names resolve against
    /// the connection's current schema.
    async fn column_names(&self, table: &str) -> DbResult<Vec<String>>;

    /// Release the connection. Closing an already closed connection is a no-op.
    ///
    /// Must yield to the runtime while waiting so callers can bound it with a
    /// timeout.
    async fn close(&self) -> DbResult<()>;

    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;
}

/// Split `schema.table` into its parts
pub(crate) fn split_qualified(name: &str) -> (Option<&str>, &str) {
    match name.rfind('.') {
        Some(pos) => (Some(&name[..pos]), &name[pos + 1..]),
        None => (None, name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_qualified() {
        assert_eq!(split_qualified("donatur"), (None, "donatur"));
        assert_eq!(split_qualified("public.donatur"), (Some("public"), "donatur"));
    }
}
