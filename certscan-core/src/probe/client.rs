use std::net::{IpAddr, SocketAddr};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use native_tls::TlsConnector;
use tokio::net::TcpStream;
use tracing::{debug, instrument};

use super::types::{ProbeOptions, ProbeResult};
use crate::error::{Result, ScanError};

/// Reads the leaf certificate expiry of a host.
///
/// Implementations absorb every network and TLS failure into the returned
/// [`ProbeResult`] and must respect their own timeout.
#[async_trait]
pub trait CertificateProber: Send + Sync {
    async fn probe(&self, hostname: &str, address: Option<IpAddr>) -> ProbeResult;
}

/// TLS prober built on native-tls
#[derive(Clone)]
pub struct CertificateProbe {
    options: ProbeOptions,
    connector: tokio_native_tls::TlsConnector,
}

impl CertificateProbe {
    /// Create a prober with default options (1s timeout, port 443, no chain validation)
    pub fn new() -> Result<Self> {
        Self::with_options(ProbeOptions::default())
    }

    pub fn with_options(options: ProbeOptions) -> Result<Self> {
        let connector = TlsConnector::builder()
            .danger_accept_invalid_certs(!options.verify_chain)
            .danger_accept_invalid_hostnames(!options.verify_chain)
            .build()
            .map_err(|e| ScanError::Config(format!("TLS connector: {}", e)))?;

        Ok(Self {
            options,
            connector: tokio_native_tls::TlsConnector::from(connector),
        })
    }

    pub fn options(&self) -> &ProbeOptions {
        &self.options
    }

    async fn fetch_expiry(&self, hostname: &str, address: Option<IpAddr>) -> ProbeResult {
        let port = self.options.port;
        let connected = match address {
            Some(ip) => TcpStream::connect(SocketAddr::new(ip, port)).await,
            None => TcpStream::connect((hostname, port)).await,
        };

        let stream = match connected {
            Ok(stream) => stream,
            Err(e) => {
                debug!(error = %e, "TCP connect failed");
                return ProbeResult::ConnectionFailed;
            }
        };

        // Anything that accepts TCP but cannot complete a handshake is not serving a certificate.
        let tls_stream = match self.connector.connect(hostname, stream).await {
            Ok(tls_stream) => tls_stream,
            Err(e) => {
                debug!(error = %e, "TLS handshake failed");
                return ProbeResult::NoCertificate;
            }
        };

        let der = match tls_stream.get_ref().peer_certificate() {
            Ok(Some(cert)) => cert.to_der(),
            Ok(None) => {
                debug!("Handshake completed without a peer certificate");
                return ProbeResult::NoCertificate;
            }
            Err(e) => {
                debug!(error = %e, "Peer certificate unavailable");
                return ProbeResult::NoCertificate;
            }
        };

        match der.ok().as_deref().and_then(expiry_from_der) {
            Some(expiry) => ProbeResult::Success(expiry),
            None => ProbeResult::NoCertificate,
        }
    }
}

#[async_trait]
impl CertificateProber for CertificateProbe {
    #[instrument(skip(self), fields(hostname = %hostname))]
    async fn probe(&self, hostname: &str, address: Option<IpAddr>) -> ProbeResult {
        match tokio::time::timeout(self.options.timeout, self.fetch_expiry(hostname, address)).await
        {
            Ok(result) => {
                debug!(result = ?result, "Probe finished");
                result
            }
            Err(_) => {
                debug!(
                    timeout_ms = self.options.timeout.as_millis() as u64,
                    "Probe timed out"
                );
                ProbeResult::Timeout
            }
        }
    }
}

/// Extract the "not after" instant of a DER-encoded certificate.
///
/// Returns `None` for unparseable input and for expiries before the Unix
/// epoch, which only show up as placeholder values.
pub(crate) fn expiry_from_der(der: &[u8]) -> Option<DateTime<Utc>> {
    let (_, cert) = x509_parser::parse_x509_certificate(der).ok()?;
    let timestamp = cert.validity().not_after.timestamp();
    if timestamp < 0 {
        return None;
    }
    DateTime::from_timestamp(timestamp, 0)
}
