//! rustls transport for tokio-postgres
//!
//! Server certificates are verified against the platform trust store, plus
//! any PEM bundle named by `PGSSLROOTCERT` (the libpq variable).

use crate::error::{DbError, DbResult};
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use std::fs::File;
use std::future::Future;
use std::io::{self, BufReader};
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio_postgres::tls::{ChannelBinding, MakeTlsConnect, TlsConnect, TlsStream};
use tokio_rustls::TlsConnector;

/// Environment variable naming an extra PEM root certificate bundle
pub const ROOT_CERT_ENV: &str = "PGSSLROOTCERT";

/// Builds a TLS connector per connection attempt
#[derive(Clone)]
pub struct MakeRustlsConnect {
    config: Arc<ClientConfig>,
}

impl MakeRustlsConnect {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Native roots plus `PGSSLROOTCERT`, when set
    pub fn from_env() -> DbResult<Self> {
        let extra = std::env::var_os(ROOT_CERT_ENV).filter(|v| !v.is_empty());
        Ok(Self::new(client_config(extra.as_deref().map(Path::new))?))
    }
}

/// Client config trusting the platform roots and the certificates in `extra_roots`
pub fn client_config(extra_roots: Option<&Path>) -> DbResult<ClientConfig> {
    let mut roots = RootCertStore::empty();

    let native = rustls_native_certs::load_native_certs();
    for err in &native.errors {
        log::warn!("skipping platform certificate: {}", err);
    }
    let (added, ignored) = roots.add_parsable_certificates(native.certs);
    log::debug!("loaded {} platform root certificates ({} ignored)", added, ignored);

    if let Some(path) = extra_roots {
        add_pem_roots(&mut roots, path)?;
    }

    Ok(ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth())
}

fn add_pem_roots(roots: &mut RootCertStore, path: &Path) -> DbResult<()> {
    let tls_err = |msg: String| DbError::ConnectionError(format!("{}: {}", path.display(), msg));

    let file = File::open(path).map_err(|e| tls_err(e.to_string()))?;
    let mut added = 0;
    for cert in rustls_pemfile::certs(&mut BufReader::new(file)) {
        let cert = cert.map_err(|e| tls_err(format!("could not load PEM file: {e}")))?;
        roots
            .add(cert)
            .map_err(|e| tls_err(format!("invalid root certificate: {e}")))?;
        added += 1;
    }
    if added == 0 {
        return Err(tls_err("no certificates found".to_string()));
    }
    Ok(())
}

impl<S> MakeTlsConnect<S> for MakeRustlsConnect
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    type Stream = RustlsStream<S>;
    type TlsConnect = RustlsConnect;
    type Error = io::Error;

    fn make_tls_connect(&mut self, domain: &str) -> io::Result<RustlsConnect> {
        Ok(RustlsConnect {
            domain: domain.to_string(),
            connector: TlsConnector::from(Arc::clone(&self.config)),
        })
    }
}

/// One pending TLS handshake.
///
/// The host name is checked only when a handshake starts. Unix socket hosts
/// have none, and the server declines TLS on them before that point.
pub struct RustlsConnect {
    domain: String,
    connector: TlsConnector,
}

fn server_name(domain: &str) -> io::Result<ServerName<'static>> {
    ServerName::try_from(domain.to_string())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, format!("{domain:?}: {e}")))
}

impl<S> TlsConnect<S> for RustlsConnect
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    type Stream = RustlsStream<S>;
    type Error = io::Error;
    type Future = Pin<Box<dyn Future<Output = io::Result<RustlsStream<S>>> + Send>>;

    fn connect(self, stream: S) -> Self::Future {
        Box::pin(async move {
            let domain = server_name(&self.domain)?;
            let stream = self.connector.connect(domain, stream).await?;
            Ok(RustlsStream(Box::new(stream)))
        })
    }
}

/// Encrypted socket handed to tokio-postgres
pub struct RustlsStream<S>(Box<tokio_rustls::client::TlsStream<S>>);

impl<S> AsyncRead for RustlsStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut *self.0).poll_read(cx, buf)
    }
}

impl<S> AsyncWrite for RustlsStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut *self.0).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut *self.0).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut *self.0).poll_shutdown(cx)
    }
}

impl<S> TlsStream for RustlsStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn channel_binding(&self) -> ChannelBinding {
        ChannelBinding::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tokio_postgres::Socket;

    #[test]
    fn test_client_config_without_extra_roots() {
        assert!(client_config(None).is_ok());
    }

    #[test]
    fn test_missing_root_cert_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = client_config(Some(&dir.path().join("root.crt"))).unwrap_err();
        assert!(matches!(err, DbError::ConnectionError(msg) if msg.contains("root.crt")));
    }

    #[test]
    fn test_root_cert_file_without_certificates_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("root.crt");
        fs::write(&path, "not a certificate\n").unwrap();
        let err = client_config(Some(&path)).unwrap_err();
        assert!(matches!(err, DbError::ConnectionError(msg) if msg.contains("no certificates found")));
    }

    #[test]
    fn test_server_name_accepts_hosts_and_addresses() {
        assert!(server_name("db.internal").is_ok());
        assert!(server_name("10.0.0.12").is_ok());
        assert!(server_name("not a host").is_err());
        assert!(server_name("").is_err());
    }

    #[test]
    fn test_make_tls_connect_defers_host_check() {
        let mut tls = MakeRustlsConnect::new(client_config(None).unwrap());
        assert!(MakeTlsConnect::<Socket>::make_tls_connect(&mut tls, "").is_ok());
    }
}
