//! Typed configuration models.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::defaults;

/// Behavioural knobs for a resource controller instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Page size sent as `per_page` on list requests.
    pub per_page: u32,
    /// Quiet period before filter edits are committed.
    pub debounce: Duration,
    /// Default lifetime of non-sticky toasts.
    pub toast_duration: Duration,
    /// Maximum number of toasts kept in the queue; zero disables the cap.
    pub toast_capacity: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            per_page: defaults::PER_PAGE,
            debounce: Duration::from_millis(defaults::DEBOUNCE_MS),
            toast_duration: Duration::from_millis(defaults::TOAST_DURATION_MS),
            toast_capacity: defaults::TOAST_CAPACITY,
        }
    }
}

/// Transport and session settings for the HTTP client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// API root every resource path is joined onto.
    pub base_url: Url,
    /// Transport timeout for a single request.
    pub request_timeout: Duration,
    /// Session store holding the bearer token.
    pub token_file: PathBuf,
    /// Key of the bearer token inside the session store.
    pub token_key: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout: Duration::from_secs(defaults::REQUEST_TIMEOUT_SECS),
            token_file: PathBuf::from(defaults::TOKEN_FILE),
            token_key: defaults::TOKEN_KEY.to_string(),
        }
    }
}

/// Complete configuration snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RosterConfig {
    /// Controller settings.
    pub controller: ControllerConfig,
    /// Client settings.
    pub client: ClientConfig,
}

#[allow(clippy::expect_used)]
fn default_base_url() -> Url {
    Url::parse(defaults::BASE_URL).expect("default base URL is valid")
}
