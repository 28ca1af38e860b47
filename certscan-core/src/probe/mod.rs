//! TLS certificate probing
//!
//! Connects to a host, completes a TLS handshake without trusting anything,
//! and reports when the presented leaf certificate expires.

mod client;
mod types;

pub use client::{CertificateProbe, CertificateProber};
pub use types::{ProbeOptions, ProbeResult, DEFAULT_PROBE_TIMEOUT, DEFAULT_TLS_PORT};
