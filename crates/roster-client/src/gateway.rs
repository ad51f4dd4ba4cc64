//! Bearer-token gateway and session-expiry signal.
//!
//! # Design
//! - Attach credentials at the edge; callers never see the raw token.
//! - Notify subscribers on session loss and let them decide what to do
//!   (redirect, clear storage); the gateway itself has no UI knowledge.

use std::sync::Arc;

use reqwest::RequestBuilder;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::token::TokenStore;

const SESSION_CHANNEL_CAPACITY: usize = 16;

/// Why the session is considered over.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionExpired {
    /// No token was present when a call was attempted.
    MissingToken,
    /// The server answered a call with HTTP 401.
    Rejected {
        /// Server-provided message.
        message: String,
    },
}

/// Wraps outbound requests with an `Authorization` header and publishes
/// session-expired events.
#[derive(Clone)]
pub struct TokenGateway {
    store: Arc<dyn TokenStore>,
    events: broadcast::Sender<SessionExpired>,
}

impl TokenGateway {
    /// Create a gateway reading tokens from `store`.
    #[must_use]
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        let (events, _) = broadcast::channel(SESSION_CHANNEL_CAPACITY);
        Self { store, events }
    }

    /// Subscribe to session-expired events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionExpired> {
        self.events.subscribe()
    }

    /// Attach the current bearer token to `request`.
    ///
    /// # Errors
    /// Returns [`ApiError::NoSession`] (after emitting
    /// [`SessionExpired::MissingToken`]) when the store has no token.
    pub fn authorize(&self, request: RequestBuilder) -> ApiResult<RequestBuilder> {
        let Some(token) = self.store.token() else {
            self.emit(SessionExpired::MissingToken);
            return Err(ApiError::NoSession);
        };
        Ok(request.bearer_auth(token))
    }

    /// Publish that the server rejected the session.
    pub fn notify_unauthorized(&self, message: &str) {
        self.emit(SessionExpired::Rejected {
            message: message.to_string(),
        });
    }

    fn emit(&self, event: SessionExpired) {
        info!(reason = ?event, "session expired");
        if self.events.send(event).is_err() {
            debug!("session expired with no subscribers");
        }
    }
}
