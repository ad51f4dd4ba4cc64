//! Single-slot confirmation gate for destructive actions.

use std::sync::Mutex;

use thiserror::Error;

use crate::core::lock;

/// Gate transition failures.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum GateError {
    /// A confirmation is already pending.
    #[error("a confirmation is already pending")]
    Busy,
    /// Nothing is pending.
    #[error("no confirmation is pending")]
    Idle,
}

/// Boxed callback for gates that store plain closures.
pub type ConfirmCallback = Box<dyn FnOnce() + Send + 'static>;

struct PendingConfirmation<A> {
    message: String,
    action: A,
}

/// Holds at most one pending action awaiting user confirmation.
///
/// `confirm` returns the stored action after the gate is back to idle, so
/// the action may itself open a new confirmation.
pub struct ConfirmationGate<A> {
    pending: Mutex<Option<PendingConfirmation<A>>>,
}

impl<A> Default for ConfirmationGate<A> {
    fn default() -> Self {
        Self {
            pending: Mutex::new(None),
        }
    }
}

impl<A> ConfirmationGate<A> {
    /// Idle gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Park `action` behind `message`.
    ///
    /// # Errors
    /// [`GateError::Busy`] if another confirmation is pending.
    pub fn request(&self, message: impl Into<String>, action: A) -> Result<(), GateError> {
        let mut pending = lock(&self.pending);
        if pending.is_some() {
            return Err(GateError::Busy);
        }
        *pending = Some(PendingConfirmation {
            message: message.into(),
            action,
        });
        Ok(())
    }

    /// Return to idle and hand back the pending action.
    ///
    /// # Errors
    /// [`GateError::Idle`] if nothing is pending.
    pub fn confirm(&self) -> Result<A, GateError> {
        lock(&self.pending)
            .take()
            .map(|pending| pending.action)
            .ok_or(GateError::Idle)
    }

    /// Return to idle, dropping the pending action.
    ///
    /// # Errors
    /// [`GateError::Idle`] if nothing is pending.
    pub fn cancel(&self) -> Result<(), GateError> {
        lock(&self.pending)
            .take()
            .map(|_| ())
            .ok_or(GateError::Idle)
    }

    /// Prompt text of the pending confirmation.
    #[must_use]
    pub fn pending_message(&self) -> Option<String> {
        lock(&self.pending)
            .as_ref()
            .map(|pending| pending.message.clone())
    }

    /// Whether a confirmation is pending.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        lock(&self.pending).is_some()
    }
}

impl ConfirmationGate<ConfirmCallback> {
    /// Confirm and invoke the stored callback.
    ///
    /// # Errors
    /// [`GateError::Idle`] if nothing is pending.
    pub fn confirm_and_invoke(&self) -> Result<(), GateError> {
        let callback = self.confirm()?;
        callback();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn second_request_while_pending_is_rejected() {
        let gate = ConfirmationGate::new();
        gate.request("Delete item 1?", 1).unwrap();
        assert_eq!(gate.request("Delete item 2?", 2), Err(GateError::Busy));
        assert_eq!(gate.pending_message().as_deref(), Some("Delete item 1?"));
        assert_eq!(gate.confirm(), Ok(1));
        assert!(!gate.is_pending());
    }

    #[test]
    fn confirm_and_cancel_require_pending() {
        let gate = ConfirmationGate::<u8>::new();
        assert_eq!(gate.confirm(), Err(GateError::Idle));
        assert_eq!(gate.cancel(), Err(GateError::Idle));
        gate.request("Archive?", 3).unwrap();
        assert_eq!(gate.cancel(), Ok(()));
        assert_eq!(gate.confirm(), Err(GateError::Idle));
    }

    #[test]
    fn callback_runs_once_after_gate_is_idle() {
        let gate = Arc::new(ConfirmationGate::<ConfirmCallback>::new());
        let runs = Arc::new(AtomicUsize::new(0));
        let (observed_gate, counter) = (Arc::clone(&gate), Arc::clone(&runs));
        gate.request(
            "Delete?",
            Box::new(move || {
                assert!(!observed_gate.is_pending());
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();
        gate.confirm_and_invoke().unwrap();
        assert_eq!(gate.confirm_and_invoke(), Err(GateError::Idle));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}
