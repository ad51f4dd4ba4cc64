//! Validation helpers and parsing utilities for raw configuration values.

use std::time::Duration;

use url::Url;

use crate::defaults::MAX_PER_PAGE;
use crate::error::{ConfigError, ConfigResult};

pub(crate) fn parse_u64(section: &'static str, field: &'static str, raw: &str) -> ConfigResult<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidField {
            section,
            field,
            value: Some(raw.to_string()),
            message: "must be a non-negative integer".to_string(),
        })
}

/// Parse a page size, rejecting zero and values above the supported maximum.
///
/// # Errors
/// Returns [`ConfigError::InvalidField`] when the value is not an integer in
/// `1..=MAX_PER_PAGE`.
pub fn parse_per_page(raw: &str) -> ConfigResult<u32> {
    let value = parse_u64("controller", "per_page", raw)?;
    let per_page = u32::try_from(value).unwrap_or(u32::MAX);
    if per_page == 0 || per_page > MAX_PER_PAGE {
        return Err(ConfigError::InvalidField {
            section: "controller",
            field: "per_page",
            value: Some(raw.to_string()),
            message: format!("must be between 1 and {MAX_PER_PAGE}"),
        });
    }
    Ok(per_page)
}

/// Parse a millisecond duration.
///
/// # Errors
/// Returns [`ConfigError::InvalidField`] when the value is not an integer.
pub fn parse_millis(
    section: &'static str,
    field: &'static str,
    raw: &str,
) -> ConfigResult<Duration> {
    parse_u64(section, field, raw).map(Duration::from_millis)
}

/// Parse a request timeout in seconds; zero is rejected because it would
/// leave hung requests unbounded.
///
/// # Errors
/// Returns [`ConfigError::InvalidField`] for zero or non-numeric values.
pub fn parse_timeout_secs(raw: &str) -> ConfigResult<Duration> {
    let secs = parse_u64("client", "request_timeout", raw)?;
    if secs == 0 {
        return Err(ConfigError::InvalidField {
            section: "client",
            field: "request_timeout",
            value: Some(raw.to_string()),
            message: "must be at least one second".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

/// Parse and normalise the API base URL (always ending with `/`).
///
/// # Errors
/// Returns [`ConfigError::InvalidBaseUrl`] for unparseable or non-HTTP URLs.
pub fn parse_base_url(raw: &str) -> ConfigResult<Url> {
    let trimmed = raw.trim();
    let mut url = Url::parse(trimmed).map_err(|err| ConfigError::InvalidBaseUrl {
        value: raw.to_string(),
        message: err.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidBaseUrl {
            value: raw.to_string(),
            message: "scheme must be http or https".to_string(),
        });
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Validate a session-store key.
///
/// # Errors
/// Returns [`ConfigError::InvalidField`] when the key is blank.
pub fn parse_token_key(raw: &str) -> ConfigResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::InvalidField {
            section: "client",
            field: "token_key",
            value: None,
            message: "must not be empty".to_string(),
        });
    }
    Ok(trimmed.to_string())
}
