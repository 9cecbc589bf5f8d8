//! Error types for mr-db

use thiserror::Error;

/// Database operation errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// Query execution error (D002)
    #[error("[D002] SQL execution failed: {0}")]
    ExecutionError(String),

    /// Unsupported connection string (D003)
    #[error("[D003] Unsupported DATABASE_URL: {0}")]
    UnsupportedUrl(String),

    /// Connection already closed (D004)
    #[error("[D004] Database connection is closed")]
    Closed,

    /// Mutex poisoned (D005)
    #[error("[D005] Database mutex poisoned: {0}")]
    MutexPoisoned(String),

    /// Internal error (D006)
    #[error("[D006] Internal database error: {0}")]
    Internal(String),
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

impl From<duckdb::Error> for DbError {
    fn from(err: duckdb::Error) -> Self {
        DbError::ExecutionError(err.to_string())
    }
}

impl From<tokio_postgres::Error> for DbError {
    fn from(err: tokio_postgres::Error) -> Self {
        // The server message is more useful than the generic "db error" display.
        match err.as_db_error() {
            Some(db) => DbError::ExecutionError(server_message(
                db.severity(),
                db.code().code(),
                db.message(),
            )),
            None => DbError::ExecutionError(err.to_string()),
        }
    }
}

/// `ERROR (42P01): relation "x" does not exist`
fn server_message(severity: &str, sqlstate: &str, message: &str) -> String {
    format!("{severity} ({sqlstate}): {message}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_message_format() {
        let err = DbError::ExecutionError(server_message(
            "ERROR",
            "42701",
            "column \"phone\" of relation \"donatur\" already exists",
        ));
        assert_eq!(
            err.to_string(),
            "[D002] SQL execution failed: ERROR (42701): column \"phone\" of relation \"donatur\" already exists"
        );
    }

    #[test]
    fn test_duckdb_error_is_execution_error() {
        let conn = duckdb::Connection::open_in_memory().unwrap();
        let err: DbError = conn.execute_batch("SELEKT 1").unwrap_err().into();
        assert!(matches!(err, DbError::ExecutionError(msg) if msg.contains("SELEKT")));
    }
}
