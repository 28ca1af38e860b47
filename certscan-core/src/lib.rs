//! Subdomain TLS certificate expiry scanning.
//!
//! Hostnames from an external enumeration source are resolved, probed over
//! TLS and bucketed as active, expired or unreachable, with every result
//! streamed into a plain-text report.

pub mod classify;
pub mod colors;
pub mod dns;
pub mod error;
pub mod output;
pub mod probe;
pub mod report;
pub mod scan;
pub mod source;
pub mod validation;

pub use error::{Result, ScanError};
pub use validation::{is_valid_hostname, normalize_domain};

pub use classify::{classify, CertStatus, Classification};
pub use dns::{DnsResolver, HostResolver};
pub use probe::{CertificateProbe, CertificateProber, ProbeOptions, ProbeResult};
pub use report::{ReportLine, ReportSink, ScanOutcome, ScanSummary};
pub use scan::{LineCallback, Scanner};

pub use output::{OutputFormat, OutputFormatter};
