//! Baseline values for controller and client configuration.
//!
//! # Design
//! - Centralize defaults so the controller, CLI, and tests agree on them.
//! - Keep time-based defaults in milliseconds/seconds for env parity.

/// Default page size requested from list endpoints.
pub const PER_PAGE: u32 = 20;
/// Largest page size accepted by validation.
pub const MAX_PER_PAGE: u32 = 500;
/// Quiet period before a filter edit is committed.
pub const DEBOUNCE_MS: u64 = 500;
/// Lifetime of a non-sticky toast.
pub const TOAST_DURATION_MS: u64 = 5_000;
/// Maximum number of toasts kept visible at once.
pub const TOAST_CAPACITY: usize = 5;
/// Transport timeout applied to every outbound request.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;
/// API base URL used when none is configured.
pub const BASE_URL: &str = "http://127.0.0.1:8080";
/// Key under which the bearer token is persisted in the session store.
pub const TOKEN_KEY: &str = "auth_token";
/// Session store file name, relative to the working directory.
pub const TOKEN_FILE: &str = ".roster-session.json";
/// Environment variable prefix for all settings.
pub const ENV_PREFIX: &str = "ROSTER_";
