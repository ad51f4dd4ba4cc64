//! Environment-driven configuration loading.
//!
//! # Design
//! - Start from defaults and override only the variables that are present.
//! - Route lookups through a closure so tests never mutate process env.

use std::path::PathBuf;

use tracing::debug;

use crate::defaults::ENV_PREFIX;
use crate::error::ConfigResult;
use crate::model::RosterConfig;
use crate::validate::{
    parse_base_url, parse_millis, parse_per_page, parse_timeout_secs, parse_token_key, parse_u64,
};

/// Load configuration from `ROSTER_*` process environment variables.
///
/// # Errors
/// Returns the first validation failure encountered.
pub fn load_from_env() -> ConfigResult<RosterConfig> {
    load_with(|key| std::env::var(key).ok())
}

/// Load configuration using the supplied variable lookup.
///
/// Recognised variables (all prefixed with `ROSTER_`): `API_URL`, `PER_PAGE`,
/// `DEBOUNCE_MS`, `TOAST_DURATION_MS`, `TOAST_CAPACITY`, `HTTP_TIMEOUT_SECS`,
/// `TOKEN_FILE`, `TOKEN_KEY`.
///
/// # Errors
/// Returns the first validation failure encountered.
pub fn load_with<F>(lookup: F) -> ConfigResult<RosterConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| {
        lookup(&format!("{ENV_PREFIX}{name}")).filter(|value| !value.trim().is_empty())
    };
    let mut config = RosterConfig::default();

    if let Some(raw) = var("API_URL") {
        config.client.base_url = parse_base_url(&raw)?;
    }
    if let Some(raw) = var("PER_PAGE") {
        config.controller.per_page = parse_per_page(&raw)?;
    }
    if let Some(raw) = var("DEBOUNCE_MS") {
        config.controller.debounce = parse_millis("controller", "debounce", &raw)?;
    }
    if let Some(raw) = var("TOAST_DURATION_MS") {
        config.controller.toast_duration = parse_millis("controller", "toast_duration", &raw)?;
    }
    if let Some(raw) = var("TOAST_CAPACITY") {
        let capacity = parse_u64("controller", "toast_capacity", &raw)?;
        config.controller.toast_capacity = usize::try_from(capacity).unwrap_or(usize::MAX);
    }
    if let Some(raw) = var("HTTP_TIMEOUT_SECS") {
        config.client.request_timeout = parse_timeout_secs(&raw)?;
    }
    if let Some(raw) = var("TOKEN_FILE") {
        config.client.token_file = PathBuf::from(raw.trim());
    }
    if let Some(raw) = var("TOKEN_KEY") {
        config.client.token_key = parse_token_key(&raw)?;
    }

    debug!(
        base_url = %config.client.base_url,
        per_page = config.controller.per_page,
        debounce_ms = u64::try_from(config.controller.debounce.as_millis()).unwrap_or(u64::MAX),
        "configuration loaded"
    );
    Ok(config)
}
