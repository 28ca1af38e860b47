//! Certificate status classification

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::probe::ProbeResult;

/// Date shown for hosts without a usable certificate.
pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertStatus {
    Active,
    Expired,
    Unreachable,
}

impl fmt::Display for CertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CertStatus::Active => "Active",
            CertStatus::Expired => "Expired",
            CertStatus::Unreachable => "Unreachable",
        };
        f.write_str(label)
    }
}

/// Status of one host plus the expiry it was derived from.
///
/// `expires_at` is `Some` exactly when the status is `Active` or `Expired`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub status: CertStatus,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Classification {
    pub fn unreachable() -> Self {
        Self {
            status: CertStatus::Unreachable,
            expires_at: None,
        }
    }

    /// Expiry as `YYYY-MM-DD`, or `N/A`.
    pub fn display_date(&self) -> String {
        self.expires_at
            .map(|expiry| expiry.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }
}

/// Bucket a probe outcome relative to `now`.
///
/// A certificate expiring exactly at `now` still counts as active.
pub fn classify(probe: &ProbeResult, now: DateTime<Utc>) -> Classification {
    match probe {
        ProbeResult::Success(expiry) => Classification {
            status: if *expiry < now {
                CertStatus::Expired
            } else {
                CertStatus::Active
            },
            expires_at: Some(*expiry),
        },
        ProbeResult::NoCertificate | ProbeResult::ConnectionFailed | ProbeResult::Timeout => {
            Classification::unreachable()
        }
    }
}
