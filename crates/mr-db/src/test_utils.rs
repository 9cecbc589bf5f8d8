//! Shared test utilities for mr-db consumers

use crate::error::{DbError, DbResult};
use crate::traits::Database;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// In-memory `Database` that records every call.
///
/// Serves scripted column sets for `column_names`, fails any batch containing
/// a registered needle, and counts `close()` calls.
#[derive(Default)]
pub struct RecordingDatabase {
    columns: HashMap<String, Vec<String>>,
    failures: Vec<(String, String)>,
    column_errors: Vec<String>,
    executed: Mutex<Vec<String>>,
    column_queries: AtomicUsize,
    closes: AtomicUsize,
}

impl RecordingDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `columns` for `table`
    pub fn with_columns(mut self, table: &str, columns: &[&str]) -> Self {
        self.columns.insert(
            table.to_string(),
            columns.iter().map(|c| c.to_string()).collect(),
        );
        self
    }

    /// Fail any batch whose SQL contains `needle` with `message`
    pub fn fail_on(mut self, needle: &str, message: &str) -> Self {
        self.failures.push((needle.to_string(), message.to_string()));
        self
    }

    /// Fail `column_names` for `table`
    pub fn fail_columns(mut self, table: &str) -> Self {
        self.column_errors.push(table.to_string());
        self
    }

    /// Every batch passed to `execute_batch`, in call order
    pub fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn column_query_count(&self) -> usize {
        self.column_queries.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Database for RecordingDatabase {
    async fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.executed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(sql.to_string());
        match self.failures.iter().find(|(needle, _)| sql.contains(needle)) {
            Some((_, message)) => Err(DbError::ExecutionError(message.clone())),
            None => Ok(()),
        }
    }

    async fn column_names(&self, table: &str) -> DbResult<Vec<String>> {
        self.column_queries.fetch_add(1, Ordering::SeqCst);
        if self.column_errors.iter().any(|t| t == table) {
            return Err(DbError::ExecutionError(format!(
                "permission denied for table {table}"
            )));
        }
        Ok(self.columns.get(table).cloned().unwrap_or_default())
    }

    async fn close(&self) -> DbResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn db_type(&self) -> &'static str {
        "recording"
    }
}
