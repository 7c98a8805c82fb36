//! Transport setup and authentication
//!
//! Provides the low-level `connect()`, `login()` and `logout()`
//! functions that [`Session`](crate::Session) is built on. TLS uses
//! rustls with the bundled web PKI roots, optionally extended by a PEM
//! file of extra trust anchors.

use crate::config::{ImapConfig, Security};
use crate::error::{Error, Result};
use futures::io::{AsyncRead, AsyncWrite};
use rustls::RootCertStore;
use rustls::pki_types::{CertificateDer, ServerName};
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_util::compat::TokioAsyncReadCompatExt;
use tracing::{debug, info};

/// Byte stream an IMAP client can run over, TLS-wrapped or not.
pub trait ImapStream: AsyncRead + AsyncWrite + Unpin + Send + fmt::Debug {}

impl<T> ImapStream for T where T: AsyncRead + AsyncWrite + Unpin + Send + fmt::Debug {}

/// A connected, not yet authenticated IMAP client.
pub type ImapClient = async_imap::Client<Box<dyn ImapStream>>;

/// An authenticated IMAP session.
pub type ImapSession = async_imap::Session<Box<dyn ImapStream>>;

/// Build a TLS connector that validates against the web PKI roots plus
/// any certificates in `ca_file`.
fn tls_connector(ca_file: Option<&Path>) -> Result<TlsConnector> {
    let mut roots = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };

    if let Some(path) = ca_file {
        for cert in load_certs(path)? {
            roots.add(cert).map_err(|e| {
                Error::Config(format!("Invalid certificate in {}: {e}", path.display()))
            })?;
        }
    }

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| Error::Config(format!("TLS setup failed: {e}")))?
        .with_root_certificates(roots)
        .with_no_client_auth();

    Ok(TlsConnector::from(Arc::new(config)))
}

/// Read every PEM certificate from `path`.
fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let read_err =
        |e: std::io::Error| Error::Config(format!("Failed to read CA file {}: {e}", path.display()));

    let mut reader = BufReader::new(File::open(path).map_err(read_err)?);
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(read_err)?;

    if certs.is_empty() {
        return Err(Error::Config(format!(
            "No certificates found in CA file {}",
            path.display()
        )));
    }
    Ok(certs)
}

/// Open the transport to `config.server` and consume the greeting.
///
/// With [`Security::Tls`] the TLS handshake happens before any IMAP
/// traffic, and certificate validation failures end the attempt here.
///
/// # Errors
///
/// Returns [`Error::Connect`] if the TCP connection, TLS handshake or
/// greeting fails, and [`Error::Config`] if the CA file is unusable.
pub async fn connect(config: &ImapConfig) -> Result<ImapClient> {
    let addr = config.address();

    let stream: Box<dyn ImapStream> = match config.security {
        Security::Tls => {
            debug!("Connect to {:?}", addr);
            let connector = tls_connector(config.ca_file.as_deref())?;
            let server_name = ServerName::try_from(config.host().to_string())
                .map_err(|e| Error::connect(&config.server, format!("Invalid server name: {e}")))?;

            let tcp_stream = TcpStream::connect(&addr)
                .await
                .map_err(|e| Error::connect(&config.server, e))?;
            let tls_stream = connector
                .connect(server_name, tcp_stream)
                .await
                .map_err(|e| Error::connect(&config.server, e))?;
            Box::new(tls_stream.compat())
        }
        Security::Plaintext => {
            debug!("Connect to {:?} (no TLS)", addr);
            let tcp_stream = TcpStream::connect(&addr)
                .await
                .map_err(|e| Error::connect(&config.server, e))?;
            Box::new(tcp_stream.compat())
        }
    };

    let mut client = async_imap::Client::new(stream);
    client
        .read_response()
        .await
        .map_err(|e| Error::connect(&config.server, e))?
        .ok_or_else(|| Error::connect(&config.server, "server sent no greeting"))?;

    Ok(client)
}

/// LOGIN with the configured credentials.
///
/// If the server refuses, the connection is still closed with a
/// best-effort LOGOUT before the error is returned.
///
/// # Errors
///
/// Returns [`Error::Auth`] with the server's reason.
pub async fn login(client: ImapClient, config: &ImapConfig) -> Result<ImapSession> {
    debug!("Log in as {:?}", config.username);

    match client.login(&config.username, &config.password).await {
        Ok(session) => {
            info!("Connected to {} as {}", config.server, config.username);
            Ok(session)
        }
        Err((e, mut client)) => {
            if let Err(err) = client.run_command_and_check_ok("LOGOUT", None).await {
                debug!("Logout after failed login: {}", err);
            }
            Err(Error::Auth(e.to_string()))
        }
    }
}

/// LOGOUT on an authenticated session.
///
/// # Errors
///
/// Returns the protocol error; callers log it and carry on.
pub async fn logout(session: &mut ImapSession) -> std::result::Result<(), async_imap::error::Error> {
    debug!("Logging out");
    session.logout().await
}
