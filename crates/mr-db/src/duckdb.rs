//! DuckDB database backend implementation

use crate::error::{DbError, DbResult};
use crate::traits::{split_qualified, Database};
use async_trait::async_trait;
use duckdb::Connection;
use std::path::Path;
use std::sync::Mutex;

/// DuckDB database backend
pub struct DuckDbBackend {
    conn: Mutex<Option<Connection>>,
}

impl DuckDbBackend {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self::from_connection(conn))
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path).map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self::from_connection(conn))
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(Some(conn)),
        }
    }

    /// Run `f` against the open connection
    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> DbResult<T>) -> DbResult<T> {
        let guard = self
            .conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))?;
        let conn = guard.as_ref().ok_or(DbError::Closed)?;
        f(conn)
    }

    /// Execute batch SQL synchronously
    fn execute_batch_sync(&self, sql: &str) -> DbResult<()> {
        self.with_conn(|conn| conn.execute_batch(sql).map_err(DbError::from))
    }

    /// Read column names synchronously
    fn column_names_sync(&self, name: &str) -> DbResult<Vec<String>> {
        self.with_conn(|conn| {
            let (schema, table) = split_qualified(name);
            let columns = match schema {
                Some(schema) => {
                    let mut stmt = conn.prepare(
                        "SELECT column_name FROM information_schema.columns \
                         WHERE table_schema = ? AND table_name = ? \
                         ORDER BY ordinal_position",
                    )?;
                    let rows = stmt.query_map(duckdb::params![schema, table], |row| {
                        row.get::<_, String>(0)
                    })?;
                    rows.collect::<Result<Vec<_>, _>>()?
                }
                None => {
                    let mut stmt = conn.prepare(
                        "SELECT column_name FROM information_schema.columns \
                         WHERE table_schema = current_schema() AND table_name = ? \
                         ORDER BY ordinal_position",
                    )?;
                    let rows =
                        stmt.query_map(duckdb::params![table], |row| row.get::<_, String>(0))?;
                    rows.collect::<Result<Vec<_>, _>>()?
                }
            };
            Ok(columns)
        })
    }

    /// Detach the open connection, leaving the backend closed
    fn take_conn(&self) -> DbResult<Option<Connection>> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))?;
        Ok(guard.take())
    }
}

#[async_trait]
impl Database for DuckDbBackend {
    async fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.execute_batch_sync(sql)
    }

    async fn column_names(&self, table: &str) -> DbResult<Vec<String>> {
        self.column_names_sync(table)
    }

    /// Closing flushes the database file, so it runs on the blocking pool
    /// where the caller's timeout can still fire.
    async fn close(&self) -> DbResult<()> {
        let Some(conn) = self.take_conn()? else {
            return Ok(());
        };
        tokio::task::spawn_blocking(move || conn.close())
            .await
            .map_err(|e| DbError::Internal(format!("close task failed: {e}")))?
            .map_err(|(_, e)| DbError::ConnectionError(e.to_string()))
    }

    fn db_type(&self) -> &'static str {
        "duckdb"
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
