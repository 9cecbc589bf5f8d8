//! `DATABASE_URL` parsing and backend dispatch

use crate::duckdb::DuckDbBackend;
use crate::error::{DbError, DbResult};
use crate::postgres::PostgresBackend;
use crate::traits::Database;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tokio_postgres::Config;
use url::Url;

/// A parsed `DATABASE_URL`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseUrl {
    /// `postgres://` or `postgresql://` connection string
    Postgres(String),
    /// DuckDB database file path, or `:memory:`
    DuckDb(String),
}

impl DatabaseUrl {
    /// Classify a connection string.
    ///
    /// `postgres://` and `postgresql://` URLs and libpq key/value strings
    /// (`host=db user=app dbname=donasi`) select PostgreSQL. DuckDB needs an
    /// explicit `duckdb://<path>` or `duckdb:<path>`, `:memory:`, or a bare
    /// path ending in `.duckdb` or `.db`. Anything else is rejected.
    pub fn parse(raw: &str) -> DbResult<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(DbError::UnsupportedUrl("empty connection string".to_string()));
        }

        if raw.starts_with("postgres://") || raw.starts_with("postgresql://") {
            Url::parse(raw).map_err(|e| DbError::UnsupportedUrl(format!("{e}: {}", redact(raw))))?;
            return Ok(DatabaseUrl::Postgres(raw.to_string()));
        }

        if let Some(path) = raw
            .strip_prefix("duckdb://")
            .or_else(|| raw.strip_prefix("duckdb:"))
        {
            if path.is_empty() {
                return Err(DbError::UnsupportedUrl(
                    "duckdb URL is missing a path".to_string(),
                ));
            }
            return Ok(DatabaseUrl::DuckDb(path.to_string()));
        }

        if let Some((scheme, _)) = raw.split_once("://") {
            return Err(DbError::UnsupportedUrl(format!(
                "scheme '{scheme}' is not supported (use postgres:// or duckdb://)"
            )));
        }

        if raw.contains('=') {
            return match Config::from_str(raw) {
                Ok(_) => Ok(DatabaseUrl::Postgres(raw.to_string())),
                Err(e) => Err(DbError::UnsupportedUrl(format!(
                    "{e}: {}",
                    redact_key_value(raw)
                ))),
            };
        }

        if raw == ":memory:" || is_duckdb_file(raw) {
            return Ok(DatabaseUrl::DuckDb(raw.to_string()));
        }

        Err(DbError::UnsupportedUrl(format!(
            "'{raw}' is not a connection string (use postgres://, host=... key/value pairs, \
             duckdb://<path> or a .duckdb file)"
        )))
    }

    /// Backend name used in logs
    pub fn backend(&self) -> &'static str {
        match self {
            DatabaseUrl::Postgres(_) => "postgres",
            DatabaseUrl::DuckDb(_) => "duckdb",
        }
    }
}

impl fmt::Display for DatabaseUrl {
    /// Connection string with any password masked
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseUrl::Postgres(raw) if raw.contains("://") => f.write_str(&redact(raw)),
            DatabaseUrl::Postgres(raw) => f.write_str(&redact_key_value(raw)),
            DatabaseUrl::DuckDb(path) => write!(f, "duckdb://{path}"),
        }
    }
}

fn is_duckdb_file(raw: &str) -> bool {
    Path::new(raw)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("duckdb") || ext.eq_ignore_ascii_case("db"))
}

fn redact(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) if url.password().is_some() => {
            // set_password only fails for cannot-be-a-base URLs, which have no password.
            let _ = url.set_password(Some("***"));
            url.to_string()
        }
        Ok(url) => url.to_string(),
        Err(_) => "<unparseable url>".to_string(),
    }
}

/// Mask the value of any `password=` pair in a libpq key/value string.
///
/// Values may be single-quoted with backslash escapes.
fn redact_key_value(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while !rest.is_empty() {
        let trimmed = rest.trim_start();
        out.push_str(&rest[..rest.len() - trimmed.len()]);
        rest = trimmed;
        if rest.is_empty() {
            break;
        }

        let Some(eq) = rest.find('=') else {
            out.push_str(rest);
            break;
        };
        let key = rest[..eq].trim();
        out.push_str(&rest[..=eq]);
        rest = &rest[eq + 1..];

        let value_start = rest.len() - rest.trim_start().len();
        out.push_str(&rest[..value_start]);
        rest = &rest[value_start..];
        let len = value_len(rest);

        if key == "password" {
            out.push_str("***");
        } else {
            out.push_str(&rest[..len]);
        }
        rest = &rest[len..];
    }

    out
}

/// Byte length of the key/value value at the start of `s`
fn value_len(s: &str) -> usize {
    let mut chars = s.char_indices();
    if s.starts_with('\'') {
        chars.next();
        let mut escaped = false;
        for (i, c) in chars {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '\'' => return i + 1,
                _ => {}
            }
        }
        s.len()
    } else {
        chars
            .find(|(_, c)| c.is_whitespace())
            .map_or(s.len(), |(i, _)| i)
    }
}

/// Open a connection for an already parsed URL
pub async fn connect_url(url: &DatabaseUrl) -> DbResult<Box<dyn Database>> {
    log::debug!("opening {} connection to {}", url.backend(), url);
    match url {
        DatabaseUrl::Postgres(raw) => Ok(Box::new(PostgresBackend::connect(raw).await?)),
        DatabaseUrl::DuckDb(path) => Ok(Box::new(DuckDbBackend::new(path)?)),
    }
}

/// Parse `raw` and open a connection
pub async fn connect(raw: &str) -> DbResult<Box<dyn Database>> {
    connect_url(&DatabaseUrl::parse(raw)?).await
}
