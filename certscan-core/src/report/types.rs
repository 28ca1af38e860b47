use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::{CertStatus, Classification};

/// One processed host, as written to the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportLine {
    pub hostname: String,
    /// First A record, if the host resolved
    pub address: Option<IpAddr>,
    pub classification: Classification,
}

impl ReportLine {
    pub fn status(&self) -> CertStatus {
        self.classification.status
    }

    /// Address in report form, empty when the host did not resolve.
    pub fn address_display(&self) -> String {
        self.address.map(|ip| ip.to_string()).unwrap_or_default()
    }
}

impl fmt::Display for ReportLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}), {}, {}",
            self.hostname,
            self.address_display(),
            self.classification.display_date(),
            self.classification.status
        )
    }
}

/// Per-status counts for a scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub total: usize,
    pub expired: usize,
    pub active: usize,
    pub unreachable: usize,
}

impl ScanSummary {
    pub fn record(&mut self, status: CertStatus) {
        self.total += 1;
        match status {
            CertStatus::Expired => self.expired += 1,
            CertStatus::Active => self.active += 1,
            CertStatus::Unreachable => self.unreachable += 1,
        }
    }

    /// Fold a set of report lines into their counts.
    pub fn tally<'a>(lines: impl IntoIterator<Item = &'a ReportLine>) -> Self {
        lines.into_iter().fold(Self::default(), |mut summary, line| {
            summary.record(line.status());
            summary
        })
    }

    pub fn is_consistent(&self) -> bool {
        self.total == self.expired + self.active + self.unreachable
    }
}

/// Result of a finished (or interrupted) scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub domain: String,
    pub started_at: DateTime<Utc>,
    pub report_path: PathBuf,
    pub summary: ScanSummary,
    /// True when the scan stopped dispatching hosts before the source ran dry
    pub interrupted: bool,
}
