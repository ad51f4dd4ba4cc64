//! Error taxonomy for outbound API calls.

use thiserror::Error;

/// Failure of a single API call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// No bearer token was available; the call was never issued.
    #[error("no active session")]
    NoSession,
    /// The server rejected the credentials (HTTP 401).
    #[error("session rejected: {message}")]
    Unauthorized {
        /// Server-provided or generic message.
        message: String,
    },
    /// A 4xx response carrying a structured message.
    #[error("{message}")]
    Validation {
        /// HTTP status code.
        status: u16,
        /// Message shown verbatim to the user.
        message: String,
    },
    /// A 5xx response, or any error response without a parseable body.
    #[error("{message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Server message or `HTTP <status>`.
        message: String,
    },
    /// The request never produced a response (connect failure, timeout).
    #[error("network error: {message}")]
    Network {
        /// Transport error detail.
        message: String,
    },
    /// A success response whose body did not match the expected shape.
    #[error("unexpected response body: {message}")]
    Decode {
        /// Decoder error detail.
        message: String,
    },
}

impl ApiError {
    /// Whether this failure must be routed to the session-expired signal
    /// instead of normal error display.
    #[must_use]
    pub const fn is_session_error(&self) -> bool {
        matches!(self, Self::NoSession | Self::Unauthorized { .. })
    }

    /// HTTP status associated with the failure, when a response was received.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { .. } => Some(401),
            Self::Validation { status, .. } | Self::Server { status, .. } => Some(*status),
            Self::NoSession | Self::Network { .. } | Self::Decode { .. } => None,
        }
    }

    /// Text suitable for a toast or inline error.
    ///
    /// Validation messages are shown verbatim; server-side failures collapse
    /// to a generic description.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NoSession => "Your session has ended. Please sign in again.".to_string(),
            Self::Unauthorized { .. } => "Your session has expired. Please sign in again.".to_string(),
            Self::Validation { message, .. } => message.clone(),
            Self::Server { status, .. } => {
                format!("The server could not complete the request (HTTP {status}).")
            }
            Self::Decode { .. } => "The server returned an unexpected response.".to_string(),
            Self::Network { .. } => "Unable to reach the server. Check your connection.".to_string(),
        }
    }
}

/// Convenience alias for API call results.
pub type ApiResult<T> = Result<T, ApiError>;
