//! DNS name helpers
//!
//! Basic RFC 1035 checks and the mapping from device names to record names.

use crate::error::{Error, Result};

/// Maximum length of a full domain name
const MAX_DOMAIN_LEN: usize = 253;

/// Maximum length of a single label
const MAX_LABEL_LEN: usize = 63;

/// Validate a single DNS label (e.g. a device host name)
pub fn validate_label(label: &str) -> Result<()> {
    if label.is_empty() {
        return Err(Error::invalid_input("DNS label cannot be empty"));
    }

    if label.len() > MAX_LABEL_LEN {
        return Err(Error::invalid_input(format!(
            "DNS label too long: {} chars (max {}). Label: '{}'",
            label.len(),
            MAX_LABEL_LEN,
            label
        )));
    }

    if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(Error::invalid_input(format!(
            "DNS label contains invalid characters. Label: '{}'. \
            Valid: alphanumeric and hyphen only.",
            label
        )));
    }

    if label.starts_with('-') || label.ends_with('-') {
        return Err(Error::invalid_input(format!(
            "DNS label cannot start or end with hyphen. Label: '{}'",
            label
        )));
    }

    Ok(())
}

/// Validate a dotted domain name
pub fn validate_domain_name(domain: &str) -> Result<()> {
    if domain.is_empty() {
        return Err(Error::invalid_input("Domain name cannot be empty"));
    }

    if domain.len() > MAX_DOMAIN_LEN {
        return Err(Error::invalid_input(format!(
            "Domain name too long: {} chars (max {}). Got: {}",
            domain.len(),
            MAX_DOMAIN_LEN,
            domain
        )));
    }

    for label in domain.split('.') {
        validate_label(label).map_err(|e| {
            Error::invalid_input(format!("Invalid domain name '{}': {}", domain, e))
        })?;
    }

    Ok(())
}

/// Normalize a name for comparison: lowercase, no trailing dot
pub fn normalize(name: &str) -> String {
    name.trim_end_matches('.').to_ascii_lowercase()
}

/// Build the record name for a device
///
/// `alice` in zone `example.com` becomes `alice.example.com`, or
/// `alice.ts.example.com` when the subdomain `ts` is set.
pub fn record_name(device: &str, zone: &str, subdomain: Option<&str>) -> String {
    match subdomain {
        Some(sub) => normalize(&format!("{}.{}.{}", device, sub, zone)),
        None => normalize(&format!("{}.{}", device, zone)),
    }
}

/// Suffix that every managed record name ends with (leading dot included)
pub fn managed_suffix(zone: &str, subdomain: Option<&str>) -> String {
    match subdomain {
        Some(sub) => format!(".{}", normalize(&format!("{}.{}", sub, zone))),
        None => format!(".{}", normalize(zone)),
    }
}
