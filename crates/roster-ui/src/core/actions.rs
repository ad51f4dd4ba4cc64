//! Per-action loading and error tracking.
//!
//! A key like `delete:42` is either idle, in flight, or holding the error of
//! its last attempt. Starting a key that is already in flight is a no-op, so
//! a double click never issues a second request.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::future::Future;
use std::sync::Mutex;

use futures_util::future::join_all;
use roster_api_models::{BulkActionResponse, ResourceId};
use roster_client::{ApiError, ApiResult};
use tracing::{debug, warn};

use crate::core::lock;

/// Identifier of an in-flight action, formatted `verb:target`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionKey(String);

impl ActionKey {
    /// Key for `verb` applied to a single item.
    #[must_use]
    pub fn item(verb: &str, id: &ResourceId) -> Self {
        Self(format!("{verb}:{id}"))
    }

    /// Key for creating a new item.
    #[must_use]
    pub fn create() -> Self {
        Self("create:new".to_string())
    }

    /// Key for a bulk `action`.
    #[must_use]
    pub fn bulk(action: &str) -> Self {
        Self(format!("bulk:{action}"))
    }

    /// Key text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ActionKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl From<&str> for ActionKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Loading/error state of one key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionState {
    /// Whether the action is in flight.
    pub loading: bool,
    /// User-facing error of the last attempt.
    pub error: Option<String>,
}

/// Result of [`ActionTracker::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome<R> {
    /// The operation succeeded.
    Done(R),
    /// The operation failed; the error is recorded against the key.
    Failed(ApiError),
    /// The key was already in flight; nothing was issued.
    Skipped,
}

impl<R> RunOutcome<R> {
    /// Whether the operation ran and succeeded.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    /// Whether the call was suppressed as a duplicate.
    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }

    /// Transform the success value.
    pub fn map<U>(self, f: impl FnOnce(R) -> U) -> RunOutcome<U> {
        match self {
            Self::Done(value) => RunOutcome::Done(f(value)),
            Self::Failed(error) => RunOutcome::Failed(error),
            Self::Skipped => RunOutcome::Skipped,
        }
    }
}

/// One item that failed inside a bulk operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItemFailure {
    /// Failed id.
    pub id: ResourceId,
    /// User-facing reason.
    pub error: String,
}

/// Aggregate outcome of a bulk operation; every requested id lands in
/// exactly one list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkReport {
    /// Ids that succeeded.
    pub succeeded: Vec<ResourceId>,
    /// Ids that failed, with reasons.
    pub failed: Vec<BulkItemFailure>,
    /// Whether any item failed because the session ended.
    pub session_lost: bool,
}

impl BulkReport {
    /// Collect per-item results from a fan-out.
    #[must_use]
    pub fn from_results(results: Vec<(ResourceId, ApiResult<()>)>) -> Self {
        let mut report = Self::default();
        for (id, result) in results {
            match result {
                Ok(()) => report.succeeded.push(id),
                Err(error) => {
                    report.session_lost |= error.is_session_error();
                    report.failed.push(BulkItemFailure {
                        id,
                        error: error.user_message(),
                    });
                }
            }
        }
        report
    }

    /// Interpret a bulk endpoint response for `requested` ids.
    ///
    /// A response without itemised lists counts every id as succeeded. When
    /// only one list is present the other is derived from `requested`.
    #[must_use]
    pub fn from_response(requested: &[ResourceId], response: BulkActionResponse) -> Self {
        let fallback = response
            .message
            .clone()
            .unwrap_or_else(|| "not processed".to_string());
        let (succeeded, failed) = match (response.succeeded, response.failed) {
            (None, None) => (requested.to_vec(), Vec::new()),
            (Some(succeeded), Some(failed)) => (succeeded, failed),
            (Some(succeeded), None) => {
                let failed = requested
                    .iter()
                    .filter(|id| !succeeded.contains(id))
                    .map(|id| roster_api_models::BulkFailure {
                        id: id.clone(),
                        error: fallback.clone(),
                    })
                    .collect();
                (succeeded, failed)
            }
            (None, Some(failed)) => {
                let succeeded = requested
                    .iter()
                    .filter(|id| !failed.iter().any(|failure| &failure.id == *id))
                    .cloned()
                    .collect();
                (succeeded, failed)
            }
        };
        Self {
            succeeded,
            failed: failed
                .into_iter()
                .map(|failure| BulkItemFailure {
                    id: failure.id,
                    error: failure.error,
                })
                .collect(),
            session_lost: false,
        }
    }

    /// Every requested id failed with `error`.
    #[must_use]
    pub fn all_failed(requested: &[ResourceId], error: &ApiError) -> Self {
        Self {
            succeeded: Vec::new(),
            failed: requested
                .iter()
                .map(|id| BulkItemFailure {
                    id: id.clone(),
                    error: error.user_message(),
                })
                .collect(),
            session_lost: error.is_session_error(),
        }
    }

    /// `"<n> succeeded, <m> failed"`.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} succeeded, {} failed",
            self.succeeded.len(),
            self.failed.len()
        )
    }
}

/// Tracks loading and error state per [`ActionKey`].
#[derive(Default)]
pub struct ActionTracker {
    states: Mutex<BTreeMap<ActionKey, ActionState>>,
}

impl ActionTracker {
    /// Empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `op` under `key`. Returns [`RunOutcome::Skipped`] without calling
    /// `op` if the key is already in flight.
    pub async fn run<F, Fut, R>(&self, key: ActionKey, op: F) -> RunOutcome<R>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<R>>,
    {
        let Some(guard) = self.try_begin(&key) else {
            debug!(key = %key, "action already in flight");
            return RunOutcome::Skipped;
        };
        match op().await {
            Ok(value) => {
                guard.settle(None);
                RunOutcome::Done(value)
            }
            Err(error) => {
                warn!(key = %key, error = %error, "action failed");
                guard.settle(Some(error.user_message()));
                RunOutcome::Failed(error)
            }
        }
    }

    /// Run `op` for every id concurrently while holding `base_key`.
    ///
    /// Individual failures never cancel siblings. The base key records an
    /// error when any item failed.
    pub async fn run_bulk<F, Fut>(
        &self,
        base_key: ActionKey,
        ids: Vec<ResourceId>,
        op: F,
    ) -> RunOutcome<BulkReport>
    where
        F: Fn(ResourceId) -> Fut,
        Fut: Future<Output = ApiResult<()>>,
    {
        let Some(guard) = self.try_begin(&base_key) else {
            debug!(key = %base_key, "bulk action already in flight");
            return RunOutcome::Skipped;
        };
        let calls = ids.into_iter().map(|id| {
            let call = op(id.clone());
            async move { (id, call.await) }
        });
        let report = BulkReport::from_results(join_all(calls).await);
        let error = (!report.failed.is_empty()).then(|| report.summary());
        guard.settle(error);
        RunOutcome::Done(report)
    }

    /// State of `key`; idle keys report the default state.
    #[must_use]
    pub fn state(&self, key: &ActionKey) -> ActionState {
        lock(&self.states).get(key).cloned().unwrap_or_default()
    }

    /// Whether `key` is in flight.
    #[must_use]
    pub fn is_loading(&self, key: &ActionKey) -> bool {
        lock(&self.states).get(key).is_some_and(|state| state.loading)
    }

    /// Forget the error recorded for `key`.
    pub fn clear_error(&self, key: &ActionKey) {
        let mut states = lock(&self.states);
        if states.get(key).is_some_and(|state| !state.loading) {
            states.remove(key);
        }
    }

    /// Every non-idle key.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<ActionKey, ActionState> {
        lock(&self.states).clone()
    }

    fn try_begin(&self, key: &ActionKey) -> Option<InFlight<'_>> {
        let mut states = lock(&self.states);
        if states.get(key).is_some_and(|state| state.loading) {
            return None;
        }
        states.insert(
            key.clone(),
            ActionState {
                loading: true,
                error: None,
            },
        );
        Some(InFlight {
            tracker: self,
            key: key.clone(),
            settled: false,
        })
    }
}

/// Releases the loading flag when the owning future completes or is dropped.
struct InFlight<'a> {
    tracker: &'a ActionTracker,
    key: ActionKey,
    settled: bool,
}

impl InFlight<'_> {
    fn settle(mut self, error: Option<String>) {
        let mut states = lock(&self.tracker.states);
        match error {
            Some(error) => {
                states.insert(
                    self.key.clone(),
                    ActionState {
                        loading: false,
                        error: Some(error),
                    },
                );
            }
            None => {
                states.remove(&self.key);
            }
        }
        self.settled = true;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            lock(&self.tracker.states).remove(&self.key);
        }
    }
}
