//! Timer scheduling behind an explicit schedule/cancel seam.
//!
//! # Design
//! - Debounce and toast expiry only ever talk to [`Scheduler`], so tests can
//!   drive time with [`ManualScheduler`] instead of sleeping.
//! - `schedule` never runs a task inline; tasks always run later, outside
//!   the caller's locks.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::runtime::Handle;
use tokio::task::AbortHandle;

use crate::core::lock;

/// Deferred unit of work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Handle identifying a scheduled task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

/// Schedule/cancel abstraction over a clock.
pub trait Scheduler: Send + Sync {
    /// Current time on this scheduler's clock.
    fn now(&self) -> Instant;

    /// Run `task` once after `delay`. Never runs the task inline.
    fn schedule(&self, delay: Duration, task: Task) -> TaskId;

    /// Cancel a scheduled task. Returns `false` if it already ran or was
    /// cancelled.
    fn cancel(&self, id: TaskId) -> bool;
}

/// Scheduler backed by tokio timers.
pub struct TokioScheduler {
    runtime: Handle,
    next: AtomicU64,
    handles: Arc<Mutex<HashMap<TaskId, AbortHandle>>>,
}

impl TokioScheduler {
    /// Schedule onto the given runtime.
    #[must_use]
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            next: AtomicU64::new(1),
            handles: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Schedule onto the runtime the caller is running in.
    ///
    /// # Errors
    /// Fails when called outside a tokio runtime.
    pub fn try_current() -> Result<Self, tokio::runtime::TryCurrentError> {
        Handle::try_current().map(Self::new)
    }
}

impl Scheduler for TokioScheduler {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    fn schedule(&self, delay: Duration, task: Task) -> TaskId {
        let id = TaskId(self.next.fetch_add(1, Ordering::Relaxed));
        let handles = Arc::clone(&self.handles);
        // Held across spawn+insert so a zero-delay task cannot miss its entry.
        let mut registry = lock(&self.handles);
        let join = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let live = lock(&handles).remove(&id).is_some();
            if live {
                task();
            }
        });
        registry.insert(id, join.abort_handle());
        id
    }

    fn cancel(&self, id: TaskId) -> bool {
        lock(&self.handles)
            .remove(&id)
            .map(|handle| handle.abort())
            .is_some()
    }
}

/// Virtual-clock scheduler advanced explicitly by tests.
pub struct ManualScheduler {
    state: Mutex<ManualState>,
}

struct ManualState {
    origin: Instant,
    elapsed: Duration,
    next: u64,
    queue: BTreeMap<(Duration, TaskId), Task>,
    due_at: HashMap<TaskId, Duration>,
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualScheduler {
    /// Create a scheduler whose clock starts now and only moves on `advance`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ManualState {
                origin: Instant::now(),
                elapsed: Duration::ZERO,
                next: 1,
                queue: BTreeMap::new(),
                due_at: HashMap::new(),
            }),
        }
    }

    /// Move the clock forward by `by`, running every task that falls due in
    /// deadline order. Tasks scheduled while advancing run too if they fall
    /// inside the window.
    pub fn advance(&self, by: Duration) {
        let target = lock(&self.state).elapsed + by;
        loop {
            let task = {
                let mut state = lock(&self.state);
                let Some((&(due, id), _)) = state.queue.first_key_value() else {
                    break;
                };
                if due > target {
                    break;
                }
                state.elapsed = state.elapsed.max(due);
                state.due_at.remove(&id);
                state.queue.remove(&(due, id))
            };
            if let Some(task) = task {
                task();
            }
        }
        lock(&self.state).elapsed = target;
    }

    /// Number of tasks still waiting to run.
    #[must_use]
    pub fn pending(&self) -> usize {
        lock(&self.state).queue.len()
    }

    /// Time elapsed on the virtual clock.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        lock(&self.state).elapsed
    }
}

impl Scheduler for ManualScheduler {
    fn now(&self) -> Instant {
        let state = lock(&self.state);
        state.origin + state.elapsed
    }

    fn schedule(&self, delay: Duration, task: Task) -> TaskId {
        let mut state = lock(&self.state);
        let id = TaskId(state.next);
        state.next += 1;
        let due = state.elapsed + delay;
        state.queue.insert((due, id), task);
        state.due_at.insert(id, due);
        id
    }

    fn cancel(&self, id: TaskId) -> bool {
        let mut state = lock(&self.state);
        state
            .due_at
            .remove(&id)
            .and_then(|due| state.queue.remove(&(due, id)))
            .is_some()
    }
}
