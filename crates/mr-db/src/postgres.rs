//! PostgreSQL database backend implementation

use crate::error::{DbError, DbResult};
use crate::traits::{split_qualified, Database};
use crate::tls::MakeRustlsConnect;
use async_trait::async_trait;
use std::str::FromStr;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_postgres::config::SslMode;
use tokio_postgres::{Client, Config, Connection, NoTls, Socket};

/// Client plus the task driving its socket
struct Session {
    client: Client,
    handle: JoinHandle<()>,
}

/// PostgreSQL database backend over a single tokio-postgres connection
pub struct PostgresBackend {
    session: Mutex<Option<Session>>,
}

impl PostgresBackend {
    /// Connect using a libpq-style URL or key/value connection string.
    ///
    /// `sslmode=disable` connects in plain text. `prefer` (the default) and
    /// `require` negotiate TLS through rustls.
    pub async fn connect(conn_str: &str) -> DbResult<Self> {
        let config =
            Config::from_str(conn_str).map_err(|e| DbError::ConnectionError(e.to_string()))?;

        let session = if uses_tls(&config) {
            let (client, connection) = config
                .connect(MakeRustlsConnect::from_env()?)
                .await
                .map_err(|e| DbError::ConnectionError(e.to_string()))?;
            Session::spawn(client, connection)
        } else {
            let (client, connection) = config
                .connect(NoTls)
                .await
                .map_err(|e| DbError::ConnectionError(e.to_string()))?;
            Session::spawn(client, connection)
        };

        Ok(Self {
            session: Mutex::new(Some(session)),
        })
    }
}

impl Session {
    fn spawn<T>(client: Client, connection: Connection<Socket, T>) -> Self
    where
        T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            if let Err(e) = connection.await {
                log::warn!("postgres connection error: {}", e);
            }
        });
        Self { client, handle }
    }
}

/// Whether `config` negotiates TLS
fn uses_tls(config: &Config) -> bool {
    !matches!(config.get_ssl_mode(), SslMode::Disable)
}

#[async_trait]
impl Database for PostgresBackend {
    async fn execute_batch(&self, sql: &str) -> DbResult<()> {
        let guard = self.session.lock().await;
        let session = guard.as_ref().ok_or(DbError::Closed)?;
        session.client.batch_execute(sql).await?;
        Ok(())
    }

    async fn column_names(&self, name: &str) -> DbResult<Vec<String>> {
        let guard = self.session.lock().await;
        let session = guard.as_ref().ok_or(DbError::Closed)?;
        let (schema, table) = split_qualified(name);

        let rows = match schema {
            Some(schema) => {
                session
                    .client
                    .query(
                        "SELECT column_name::text FROM information_schema.columns \
                         WHERE table_schema::text = $1::text AND table_name::text = $2::text \
                         ORDER BY ordinal_position",
                        &[&schema, &table],
                    )
                    .await?
            }
            None => {
                session
                    .client
                    .query(
                        "SELECT column_name::text FROM information_schema.columns \
                         WHERE table_schema::text = current_schema() AND table_name::text = $1::text \
                         ORDER BY ordinal_position",
                        &[&table],
                    )
                    .await?
            }
        };

        rows.iter()
            .map(|row| row.try_get::<_, String>(0).map_err(DbError::from))
            .collect()
    }

    async fn close(&self) -> DbResult<()> {
        let session = self.session.lock().await.take();
        if let Some(Session { client, handle }) = session {
            // Dropping the client ends the connection future.
            drop(client);
            handle
                .await
                .map_err(|e| DbError::Internal(format!("connection task failed: {e}")))?;
        }
        Ok(())
    }

    fn db_type(&self) -> &'static str {
        "postgres"
    }
}

#[cfg(test)]
#[path = "postgres_test.rs"]
mod tests;
