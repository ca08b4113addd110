//! Validation for identifiers and values that cross an API boundary.
//!
//! Upstream responses are decoded into typed structs, but some values are later spliced into
//! request paths or URLs. These checks run before that happens.

use anyhow::{anyhow, Result};
use std::time::{SystemTime, UNIX_EPOCH};

/// Maximum length for resource IDs (camera_id, lease id, layer id)
pub const MAX_ID_LENGTH: usize = 256;

/// Maximum length for URLs handed to the lease registry
pub const MAX_URL_LENGTH: usize = 4096;

/// Get current Unix timestamp in seconds, safely handling clock errors
pub fn safe_unix_timestamp() -> u64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(duration) => duration.as_secs(),
        Err(e) => {
            tracing::warn!(
                error = %e,
                "system clock is before UNIX epoch, using timestamp 0"
            );
            0
        }
    }
}

/// Validate string length against a maximum
pub fn validate_length(value: &str, max_length: usize, field_name: &str) -> Result<()> {
    if value.len() > max_length {
        return Err(anyhow!(
            "{} exceeds maximum length of {} bytes (got {})",
            field_name,
            max_length,
            value.len()
        ));
    }
    Ok(())
}

/// Validate non-empty string
pub fn validate_non_empty(value: &str, field_name: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(anyhow!("{} cannot be empty", field_name));
    }
    Ok(())
}

/// Validate an identifier that will be used as a single URL path segment
pub fn validate_id(id: &str, field_name: &str) -> Result<()> {
    validate_non_empty(id, field_name)?;
    validate_length(id, MAX_ID_LENGTH, field_name)?;

    if id.contains("..") || id.contains('/') || id.contains('\\') {
        return Err(anyhow!(
            "{} contains invalid characters (no path separators or '..' allowed)",
            field_name
        ));
    }

    if id.chars().any(|c| c.is_control() || c == '?' || c == '#') {
        return Err(anyhow!("{} contains reserved URL characters", field_name));
    }

    Ok(())
}

/// Validate an absolute http(s) URL
pub fn validate_http_url(url: &str, field_name: &str) -> Result<()> {
    validate_non_empty(url, field_name)?;
    validate_length(url, MAX_URL_LENGTH, field_name)?;

    if !(url.starts_with("https://") || url.starts_with("http://")) {
        return Err(anyhow!("{} must be an http(s) URL", field_name));
    }

    if url.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(anyhow!("{} contains whitespace", field_name));
    }

    Ok(())
}

/// Validate value is within range
pub fn validate_range<T: PartialOrd + std::fmt::Display>(
    value: T,
    min: T,
    max: T,
    field_name: &str,
) -> Result<()> {
    if value < min || value > max {
        return Err(anyhow!(
            "{} must be between {} and {}, got {}",
            field_name,
            min,
            max,
            value
        ));
    }
    Ok(())
}
