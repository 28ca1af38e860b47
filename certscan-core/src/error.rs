use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Invalid domain name: {0}")]
    InvalidDomain(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("No subdomains found for {0}")]
    NoSubdomains(String),

    #[error("Subdomain source failed: {0}")]
    SourceFailed(String),

    #[error("Unable to write report {}: {source}", .path.display())]
    Report {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    pub(crate) fn report(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ScanError::Report {
            path: path.into(),
            source,
        }
    }

    /// Whether this error means the enumeration step produced nothing usable.
    pub fn is_enumeration(&self) -> bool {
        matches!(self, ScanError::NoSubdomains(_) | ScanError::SourceFailed(_))
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
