//! Bounded queue of transient notifications.

use std::fmt::{self, Display, Formatter};
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::core::lock;
use crate::core::schedule::{Scheduler, TaskId};

/// Toast severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToastKind {
    /// Confirmation of a completed action.
    Success,
    /// Failure needing attention.
    Error,
    /// Partial success.
    Warning,
    /// Neutral information.
    Info,
}

impl ToastKind {
    /// Lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

/// Monotonic toast identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ToastId(u64);

impl Display for ToastId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "toast-{}", self.0)
    }
}

/// A visible toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    /// Identifier.
    pub id: ToastId,
    /// Severity.
    pub kind: ToastKind,
    /// Message text.
    pub message: String,
    /// When the toast expires; `None` for sticky toasts.
    pub expires_at: Option<Instant>,
}

/// Listener notified whenever the visible set changes.
pub type ToastListener = Arc<dyn Fn() + Send + Sync>;

/// Toast queue shared by clones.
#[derive(Clone)]
pub struct ToastQueue {
    inner: Arc<ToastInner>,
}

struct ToastInner {
    scheduler: Arc<dyn Scheduler>,
    default_duration: Duration,
    capacity: usize,
    slots: Mutex<ToastSlots>,
    listener: Mutex<Option<ToastListener>>,
}

#[derive(Default)]
struct ToastSlots {
    next_id: u64,
    visible: Vec<(Toast, Option<TaskId>)>,
}

impl ToastQueue {
    /// Queue with the given default duration and capacity (0 = unbounded).
    #[must_use]
    pub fn new(scheduler: Arc<dyn Scheduler>, default_duration: Duration, capacity: usize) -> Self {
        Self {
            inner: Arc::new(ToastInner {
                scheduler,
                default_duration,
                capacity,
                slots: Mutex::new(ToastSlots::default()),
                listener: Mutex::new(None),
            }),
        }
    }

    /// Install the change listener.
    pub fn set_listener(&self, listener: ToastListener) {
        *lock(&self.inner.listener) = Some(listener);
    }

    /// Show `message` for `duration`; a zero duration makes it sticky.
    /// The oldest toast is evicted once capacity is exceeded.
    pub fn push(&self, kind: ToastKind, message: impl Into<String>, duration: Duration) -> ToastId {
        let message = message.into();
        let id = {
            let mut slots = lock(&self.inner.slots);
            slots.next_id += 1;
            let id = ToastId(slots.next_id);
            let (expires_at, timer) = if duration.is_zero() {
                (None, None)
            } else {
                let weak: Weak<ToastInner> = Arc::downgrade(&self.inner);
                let timer = self.inner.scheduler.schedule(
                    duration,
                    Box::new(move || {
                        if let Some(inner) = weak.upgrade() {
                            inner.remove(id, false);
                        }
                    }),
                );
                (Some(self.inner.scheduler.now() + duration), Some(timer))
            };
            slots.visible.push((
                Toast {
                    id,
                    kind,
                    message,
                    expires_at,
                },
                timer,
            ));
            if self.inner.capacity > 0 && slots.visible.len() > self.inner.capacity {
                let (evicted, timer) = slots.visible.remove(0);
                if let Some(timer) = timer {
                    self.inner.scheduler.cancel(timer);
                }
                debug!(toast = %evicted.id, "evicted oldest toast");
            }
            id
        };
        self.inner.notify();
        id
    }

    /// Show `message` for the default duration.
    pub fn push_default(&self, kind: ToastKind, message: impl Into<String>) -> ToastId {
        self.push(kind, message, self.inner.default_duration)
    }

    /// Shorthand for a default-duration success toast.
    pub fn success(&self, message: impl Into<String>) -> ToastId {
        self.push_default(ToastKind::Success, message)
    }

    /// Shorthand for a default-duration error toast.
    pub fn error(&self, message: impl Into<String>) -> ToastId {
        self.push_default(ToastKind::Error, message)
    }

    /// Remove a toast and cancel its expiry. Returns `false` if it was
    /// already gone.
    pub fn dismiss(&self, id: ToastId) -> bool {
        self.inner.remove(id, true)
    }

    /// Visible toasts, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Toast> {
        lock(&self.inner.slots)
            .visible
            .iter()
            .map(|(toast, _)| toast.clone())
            .collect()
    }

    /// Number of visible toasts.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.inner.slots).visible.len()
    }

    /// Whether no toast is visible.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ToastInner {
    fn remove(&self, id: ToastId, cancel_timer: bool) -> bool {
        let removed = {
            let mut slots = lock(&self.slots);
            let Some(index) = slots.visible.iter().position(|(toast, _)| toast.id == id) else {
                return false;
            };
            let (_, timer) = slots.visible.remove(index);
            if let Some(timer) = timer.filter(|_| cancel_timer) {
                self.scheduler.cancel(timer);
            }
            true
        };
        self.notify();
        removed
    }

    fn notify(&self) {
        let listener = lock(&self.listener).clone();
        if let Some(listener) = listener {
            listener();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schedule::ManualScheduler;

    fn queue(capacity: usize) -> (Arc<ManualScheduler>, ToastQueue) {
        let scheduler = Arc::new(ManualScheduler::new());
        let queue = ToastQueue::new(scheduler.clone(), Duration::from_millis(5000), capacity);
        (scheduler, queue)
    }

    #[test]
    fn toast_expires_at_deadline() {
        let (scheduler, queue) = queue(5);
        let id = queue.push(ToastKind::Success, "Saved", Duration::from_millis(1000));
        let toasts = queue.snapshot();
        let toast = &toasts[0];
        assert_eq!(toast.id, id);
        assert_eq!(toast.expires_at, Some(scheduler.now() + Duration::from_millis(1000)));

        scheduler.advance(Duration::from_millis(999));
        assert_eq!(queue.len(), 1);
        scheduler.advance(Duration::from_millis(1));
        assert!(queue.is_empty());
    }

    #[test]
    fn zero_duration_is_sticky() {
        let (scheduler, queue) = queue(5);
        queue.push(ToastKind::Error, "Sticky", Duration::ZERO);
        scheduler.advance(Duration::from_secs(3600));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.snapshot()[0].expires_at, None);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn dismiss_cancels_timer() {
        let (scheduler, queue) = queue(5);
        let id = queue.success("Done");
        assert_eq!(scheduler.pending(), 1);
        assert!(queue.dismiss(id));
        assert!(!queue.dismiss(id));
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn ids_are_monotonic_and_capacity_evicts_oldest() {
        let (scheduler, queue) = queue(2);
        let first = queue.success("one");
        let second = queue.success("two");
        let third = queue.error("three");
        assert!(first < second && second < third);
        let visible: Vec<ToastId> = queue.snapshot().iter().map(|toast| toast.id).collect();
        assert_eq!(visible, vec![second, third]);
        assert_eq!(scheduler.pending(), 2);
        assert_eq!(third.to_string(), "toast-3");
    }

    #[test]
    fn listener_sees_push_and_expiry() {
        let (scheduler, queue) = queue(0);
        let changes = Arc::new(Mutex::new(0_u32));
        let counter = Arc::clone(&changes);
        queue.set_listener(Arc::new(move || *lock(&counter) += 1));
        queue.push(ToastKind::Info, "hello", Duration::from_millis(10));
        scheduler.advance(Duration::from_millis(10));
        assert_eq!(*lock(&changes), 2);
    }
}
