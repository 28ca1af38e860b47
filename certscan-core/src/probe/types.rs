use std::time::Duration;

use chrono::{DateTime, Utc};

/// Default hard limit for connect + TLS handshake with one host.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_TLS_PORT: u16 = 443;

/// Outcome of a single TLS probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    /// Handshake completed and the leaf certificate expires at this instant
    Success(DateTime<Utc>),
    /// The port answered but no usable certificate came back
    NoCertificate,
    /// DNS failure, refused or reset connection
    ConnectionFailed,
    /// Nothing happened within the probe timeout
    Timeout,
}

impl ProbeResult {
    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        match self {
            ProbeResult::Success(expiry) => Some(*expiry),
            _ => None,
        }
    }
}

/// Settings for [`CertificateProbe`](super::CertificateProbe)
#[derive(Debug, Clone)]
pub struct ProbeOptions {
    /// Upper bound on connect plus handshake.
    pub timeout: Duration,
    /// Port to dial, 443 unless overridden.
    pub port: u16,
    /// Validate the chain and hostname. Off by default: the point is to read
    /// the expiry of whatever certificate a host presents, trusted or not.
    pub verify_chain: bool,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_PROBE_TIMEOUT,
            port: DEFAULT_TLS_PORT,
            verify_chain: false,
        }
    }
}

impl ProbeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Turns chain and hostname validation on. Hosts whose certificate does
    /// not validate are then reported as having no certificate.
    pub fn with_verify_chain(mut self, verify: bool) -> Self {
        self.verify_chain = verify;
        self
    }
}
