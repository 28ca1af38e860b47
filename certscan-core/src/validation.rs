//! Domain and hostname validation

use crate::error::{Result, ScanError};

/// Maximum length of a single DNS label.
const MAX_LABEL_LEN: usize = 63;
/// Maximum length of a full hostname in presentation form.
const MAX_HOSTNAME_LEN: usize = 253;

/// Normalize and validate the root domain of a scan
///
/// This function:
/// - Removes http:// and https:// prefixes
/// - Removes trailing slashes and paths
/// - Removes a trailing root dot
/// - Converts to lowercase
/// - Validates format (must contain dots, only alphanumeric/hyphens/dots)
pub fn normalize_domain(domain: &str) -> Result<String> {
    let domain = domain.trim().to_lowercase();

    let domain = domain
        .strip_prefix("http://")
        .or_else(|| domain.strip_prefix("https://"))
        .unwrap_or(&domain);

    let domain = domain.split('/').next().unwrap_or(domain);
    let domain = domain.strip_suffix('.').unwrap_or(domain);

    if domain.is_empty() || !domain.contains('.') || !is_valid_hostname(domain) {
        return Err(ScanError::InvalidDomain(domain.to_string()));
    }

    Ok(domain.to_string())
}

/// Check that a hostname follows DNS label rules.
///
/// Underscores are tolerated because enumeration sources routinely report
/// service names such as `_dmarc.example.com`.
pub fn is_valid_hostname(hostname: &str) -> bool {
    if hostname.is_empty() || hostname.len() > MAX_HOSTNAME_LEN {
        return false;
    }

    hostname.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= MAX_LABEL_LEN
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    })
}
