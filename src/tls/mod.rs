//! TLS certificate chain retrieval.
//!
//! This module connects to a TLS endpoint and returns the certificate chain the
//! server presents, leaf first, as raw DER:
//! - TCP connect (including name resolution) under a connect timeout
//! - TLS handshake under a handshake timeout
//! - Peer certificates as presented, no trust decision
//!
//! Uses `tokio-rustls` for async TLS connections. The handshake accepts any
//! certificate; see [`danger`].

mod danger;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use tokio::net::TcpStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{self, ClientConfig};
use tokio_rustls::TlsConnector;

use crate::error_handling::{FetchError, InitializationError};

/// Retrieves the certificate chain presented by `host:port`.
///
/// Implemented by [`TlsChainFetcher`]; tests substitute canned chains.
pub trait ChainFetcher: Send + Sync {
    fn fetch(
        &self,
        host: &str,
        port: u16,
    ) -> impl Future<Output = Result<Vec<Vec<u8>>, FetchError>> + Send;
}

/// Network fetcher backed by `tokio-rustls`.
#[derive(Clone)]
pub struct TlsChainFetcher {
    connector: TlsConnector,
    connect_timeout: Duration,
    handshake_timeout: Duration,
}

impl std::fmt::Debug for TlsChainFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsChainFetcher")
            .field("connect_timeout", &self.connect_timeout)
            .field("handshake_timeout", &self.handshake_timeout)
            .finish()
    }
}

impl TlsChainFetcher {
    /// Builds a fetcher using the `ring` crypto provider.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider does not support the default protocol versions.
    pub fn new(
        connect_timeout: Duration,
        handshake_timeout: Duration,
    ) -> Result<Self, InitializationError> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let config = ClientConfig::builder_with_provider(provider.clone())
            .with_safe_default_protocol_versions()?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(danger::AcceptAnyServerCert::new(
                provider,
            )))
            .with_no_client_auth();

        Ok(Self {
            connector: TlsConnector::from(Arc::new(config)),
            connect_timeout,
            handshake_timeout,
        })
    }

    async fn fetch_chain(&self, host: &str, port: u16) -> Result<Vec<Vec<u8>>, FetchError> {
        debug!("Fetching certificate chain for {host}:{port}");

        let server_name = ServerName::try_from(host.to_string()).map_err(|e| {
            FetchError::HandshakeFailed {
                host: host.to_string(),
                port,
                reason: format!("invalid server name: {e}"),
            }
        })?;

        let sock = match tokio::time::timeout(
            self.connect_timeout,
            TcpStream::connect((host, port)),
        )
        .await
        {
            Ok(Ok(sock)) => sock,
            Ok(Err(e)) => {
                warn!("Failed to connect to {host}:{port} - {e}");
                return Err(FetchError::Unreachable {
                    host: host.to_string(),
                    port,
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                warn!("TCP connection timeout for {host}:{port}");
                return Err(FetchError::Timeout {
                    host: host.to_string(),
                    port,
                    stage: "TCP connection",
                    secs: self.connect_timeout.as_secs(),
                });
            }
        };

        let tls_stream = match tokio::time::timeout(
            self.handshake_timeout,
            self.connector.connect(server_name, sock),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                warn!("TLS handshake failed for {host}:{port}: {e}");
                return Err(FetchError::HandshakeFailed {
                    host: host.to_string(),
                    port,
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                warn!("TLS handshake timeout for {host}:{port}");
                return Err(FetchError::Timeout {
                    host: host.to_string(),
                    port,
                    stage: "TLS handshake",
                    secs: self.handshake_timeout.as_secs(),
                });
            }
        };

        let chain: Vec<Vec<u8>> = tls_stream
            .get_ref()
            .1
            .peer_certificates()
            .map(|certs| certs.iter().map(|cert| cert.as_ref().to_vec()).collect())
            .unwrap_or_default();
        if chain.is_empty() {
            return Err(FetchError::HandshakeFailed {
                host: host.to_string(),
                port,
                reason: "server presented no certificates".to_string(),
            });
        }

        debug!(
            "Received {} certificate(s) from {host}:{port}",
            chain.len()
        );
        Ok(chain)
    }
}

impl ChainFetcher for TlsChainFetcher {
    fn fetch(
        &self,
        host: &str,
        port: u16,
    ) -> impl Future<Output = Result<Vec<Vec<u8>>, FetchError>> + Send {
        self.fetch_chain(host, port)
    }
}
