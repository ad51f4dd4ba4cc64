//! Error types for configuration loading and validation.

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Field contained an invalid value.
    #[error("invalid value for '{field}' in '{section}': {message}")]
    InvalidField {
        /// Section that failed validation.
        section: &'static str,
        /// Field that failed validation.
        field: &'static str,
        /// Offending value when available.
        value: Option<String>,
        /// Human-readable error description.
        message: String,
    },
    /// The configured API base URL could not be parsed.
    #[error("invalid base URL '{value}': {message}")]
    InvalidBaseUrl {
        /// Raw URL payload provided by the caller.
        value: String,
        /// Parser error detail.
        message: String,
    },
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
