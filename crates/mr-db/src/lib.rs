//! mr-db - Database abstraction layer for the manifest runner
//!
//! This crate provides the `Database` trait, a DuckDB backend, a PostgreSQL
//! backend with rustls transport and `DATABASE_URL` dispatch between them.

pub mod connect;
pub mod duckdb;
pub mod error;
pub mod postgres;
pub mod tls;
pub mod traits;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;

pub use self::connect::{connect, connect_url, DatabaseUrl};
pub use self::duckdb::DuckDbBackend;
pub use self::error::{DbError, DbResult};
pub use self::postgres::PostgresBackend;
pub use self::traits::Database;
