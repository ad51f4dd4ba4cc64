//! Debounced filter criteria.
//!
//! Edits land in a pending copy immediately; the committed copy only changes
//! once the debounce window passes without another edit, or when a view
//! switch or flush forces it.

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use roster_api_models::SortOrder;
use tracing::debug;

use crate::core::lock;
use crate::core::schedule::{Scheduler, TaskId};

/// Default sort column.
pub const DEFAULT_SORT_BY: &str = "created_at";

/// Search, type, status and sort criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriteria {
    /// Free-text search.
    pub search: String,
    /// Resource type filter.
    pub kind: Option<String>,
    /// Status filter.
    pub status: Option<String>,
    /// Sort column.
    pub sort_by: String,
    /// Sort direction.
    pub sort_order: SortOrder,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            search: String::new(),
            kind: None,
            status: None,
            sort_by: DEFAULT_SORT_BY.to_string(),
            sort_order: SortOrder::Desc,
        }
    }
}

impl FilterCriteria {
    /// Whether `other` selects a different set of items (search, type or
    /// status changed). Sort-only changes keep the same set.
    #[must_use]
    pub fn narrows_differently(&self, other: &Self) -> bool {
        self.search.trim() != other.search.trim()
            || self.kind != other.kind
            || self.status != other.status
    }
}

/// Partial update to [`FilterCriteria`]; `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPatch {
    /// New search text.
    pub search: Option<String>,
    /// New type filter (`Some(None)` clears it).
    pub kind: Option<Option<String>>,
    /// New status filter (`Some(None)` clears it).
    pub status: Option<Option<String>>,
    /// New sort column.
    pub sort_by: Option<String>,
    /// New sort direction.
    pub sort_order: Option<SortOrder>,
}

impl FilterPatch {
    /// Patch that only changes the search text.
    #[must_use]
    pub fn search(text: impl Into<String>) -> Self {
        Self {
            search: Some(text.into()),
            ..Self::default()
        }
    }

    /// Set or clear the type filter.
    #[must_use]
    pub fn with_kind(mut self, kind: Option<String>) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Set or clear the status filter.
    #[must_use]
    pub fn with_status(mut self, status: Option<String>) -> Self {
        self.status = Some(status);
        self
    }

    /// Change the sort column and direction.
    #[must_use]
    pub fn with_sort(mut self, sort_by: impl Into<String>, order: SortOrder) -> Self {
        self.sort_by = Some(sort_by.into());
        self.sort_order = Some(order);
        self
    }

    fn apply_to(self, criteria: &mut FilterCriteria) {
        if let Some(search) = self.search {
            criteria.search = search;
        }
        if let Some(kind) = self.kind {
            criteria.kind = kind.filter(|value| !value.trim().is_empty());
        }
        if let Some(status) = self.status {
            criteria.status = status.filter(|value| !value.trim().is_empty());
        }
        if let Some(sort_by) = self.sort_by {
            criteria.sort_by = sort_by;
        }
        if let Some(order) = self.sort_order {
            criteria.sort_order = order;
        }
    }
}

/// A commit delivered to listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedFilter {
    /// The newly committed criteria.
    pub criteria: FilterCriteria,
    /// Whether the next fetch must start from page 1.
    pub reset_page: bool,
}

/// Callback invoked on every commit.
pub type CommitListener = Arc<dyn Fn(CommittedFilter) + Send + Sync>;

/// Debounced filter state shared by clones.
#[derive(Clone)]
pub struct FilterState {
    inner: Arc<FilterInner>,
}

struct FilterInner {
    scheduler: Arc<dyn Scheduler>,
    debounce: Duration,
    slots: Mutex<FilterSlots>,
    listeners: Mutex<Vec<CommitListener>>,
}

struct FilterSlots {
    committed: FilterCriteria,
    pending: FilterCriteria,
    timer: Option<TaskId>,
    epoch: u64,
}

impl FilterState {
    /// Create filter state with the given debounce window.
    #[must_use]
    pub fn new(scheduler: Arc<dyn Scheduler>, debounce: Duration, initial: FilterCriteria) -> Self {
        Self {
            inner: Arc::new(FilterInner {
                scheduler,
                debounce,
                slots: Mutex::new(FilterSlots {
                    committed: initial.clone(),
                    pending: initial,
                    timer: None,
                    epoch: 0,
                }),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Register a commit listener.
    pub fn on_commit(&self, listener: CommitListener) {
        lock(&self.inner.listeners).push(listener);
    }

    /// Criteria as last edited.
    #[must_use]
    pub fn pending(&self) -> FilterCriteria {
        lock(&self.inner.slots).pending.clone()
    }

    /// Criteria as last committed.
    #[must_use]
    pub fn committed(&self) -> FilterCriteria {
        lock(&self.inner.slots).committed.clone()
    }

    /// Whether an edit is waiting for the debounce window to close.
    #[must_use]
    pub fn has_pending_commit(&self) -> bool {
        lock(&self.inner.slots).timer.is_some()
    }

    /// Apply `patch` to the pending criteria and restart the debounce timer.
    pub fn update(&self, patch: FilterPatch) {
        let mut slots = lock(&self.inner.slots);
        patch.apply_to(&mut slots.pending);
        if let Some(timer) = slots.timer.take() {
            self.inner.scheduler.cancel(timer);
        }
        slots.epoch += 1;
        let epoch = slots.epoch;
        let weak: Weak<FilterInner> = Arc::downgrade(&self.inner);
        let timer = self.inner.scheduler.schedule(
            self.inner.debounce,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.commit(Some(epoch));
                }
            }),
        );
        slots.timer = Some(timer);
    }

    /// Replace the criteria wholesale and commit immediately, discarding any
    /// pending edit. Always resets to page 1.
    pub fn switch_view(&self, criteria: FilterCriteria) {
        let committed = {
            let mut slots = lock(&self.inner.slots);
            if let Some(timer) = slots.timer.take() {
                self.inner.scheduler.cancel(timer);
            }
            slots.epoch += 1;
            slots.pending = criteria.clone();
            slots.committed = criteria.clone();
            CommittedFilter {
                criteria,
                reset_page: true,
            }
        };
        debug!(search = %committed.criteria.search, "filter view switched");
        self.inner.emit(&committed);
    }

    /// Replace both pending and committed criteria without notifying
    /// listeners. Any pending edit is dropped.
    pub fn replace(&self, criteria: FilterCriteria) {
        let mut slots = lock(&self.inner.slots);
        if let Some(timer) = slots.timer.take() {
            self.inner.scheduler.cancel(timer);
        }
        slots.epoch += 1;
        slots.pending = criteria.clone();
        slots.committed = criteria;
    }

    /// Commit a pending edit now instead of waiting for the timer.
    /// Returns `false` when nothing was pending.
    pub fn flush(&self) -> bool {
        let pending = {
            let mut slots = lock(&self.inner.slots);
            match slots.timer.take() {
                Some(timer) => {
                    self.inner.scheduler.cancel(timer);
                    true
                }
                None => false,
            }
        };
        if pending {
            self.inner.commit(None);
        }
        pending
    }
}

impl FilterInner {
    fn commit(&self, epoch: Option<u64>) {
        let committed = {
            let mut slots = lock(&self.slots);
            if epoch.is_some_and(|expected| expected != slots.epoch) {
                return;
            }
            slots.timer = None;
            let reset_page = slots.pending.narrows_differently(&slots.committed);
            slots.committed = slots.pending.clone();
            CommittedFilter {
                criteria: slots.committed.clone(),
                reset_page,
            }
        };
        debug!(
            search = %committed.criteria.search,
            reset_page = committed.reset_page,
            "filter committed"
        );
        self.emit(&committed);
    }

    fn emit(&self, committed: &CommittedFilter) {
        let listeners = lock(&self.listeners).clone();
        for listener in listeners {
            listener(committed.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schedule::ManualScheduler;

    fn harness(debounce_ms: u64) -> (Arc<ManualScheduler>, FilterState, Arc<Mutex<Vec<CommittedFilter>>>) {
        let scheduler = Arc::new(ManualScheduler::new());
        let state = FilterState::new(
            scheduler.clone(),
            Duration::from_millis(debounce_ms),
            FilterCriteria::default(),
        );
        let commits = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&commits);
        state.on_commit(Arc::new(move |commit| lock(&sink).push(commit)));
        (scheduler, state, commits)
    }

    #[test]
    fn keystrokes_inside_window_coalesce_into_one_commit() {
        let (scheduler, state, commits) = harness(500);
        state.update(FilterPatch::search("a"));
        scheduler.advance(Duration::from_millis(100));
        state.update(FilterPatch::search("ab"));
        scheduler.advance(Duration::from_millis(100));
        state.update(FilterPatch::search("abc"));

        scheduler.advance(Duration::from_millis(499));
        assert!(lock(&commits).is_empty());
        assert_eq!(state.pending().search, "abc");
        assert_eq!(state.committed().search, "");

        scheduler.advance(Duration::from_millis(1));
        let commits = lock(&commits);
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].criteria.search, "abc");
        assert!(commits[0].reset_page);
        assert_eq!(state.committed().search, "abc");
    }

    #[test]
    fn sort_only_change_keeps_page() {
        let (scheduler, state, commits) = harness(500);
        state.update(FilterPatch::default().with_sort("name", SortOrder::Asc));
        scheduler.advance(Duration::from_millis(500));
        let commits = lock(&commits);
        assert_eq!(commits.len(), 1);
        assert!(!commits[0].reset_page);
        assert_eq!(commits[0].criteria.sort_by, "name");
    }

    #[test]
    fn status_change_resets_page_and_blank_clears() {
        let (scheduler, state, commits) = harness(10);
        state.update(FilterPatch::default().with_status(Some("active".into())));
        scheduler.advance(Duration::from_millis(10));
        state.update(FilterPatch::default().with_status(Some("  ".into())));
        scheduler.advance(Duration::from_millis(10));
        let commits = lock(&commits);
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].criteria.status.as_deref(), Some("active"));
        assert_eq!(commits[1].criteria.status, None);
        assert!(commits.iter().all(|commit| commit.reset_page));
    }

    #[test]
    fn switch_view_commits_immediately_and_drops_pending_edit() {
        let (scheduler, state, commits) = harness(500);
        state.update(FilterPatch::search("draft"));
        let view = FilterCriteria {
            status: Some("archived".into()),
            ..FilterCriteria::default()
        };
        state.switch_view(view.clone());
        assert_eq!(lock(&commits).len(), 1);
        assert!(!state.has_pending_commit());

        scheduler.advance(Duration::from_secs(2));
        let commits = lock(&commits);
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].criteria, view);
        assert!(commits[0].reset_page);
        assert_eq!(state.pending(), view);
    }

    #[test]
    fn replace_is_silent_and_cancels_pending_edit() {
        let (scheduler, state, commits) = harness(500);
        state.update(FilterPatch::search("typed"));
        let restored = FilterCriteria {
            search: "restored".into(),
            ..FilterCriteria::default()
        };
        state.replace(restored.clone());
        scheduler.advance(Duration::from_secs(1));
        assert!(lock(&commits).is_empty());
        assert_eq!(state.committed(), restored);
        assert_eq!(state.pending(), restored);
    }

    #[test]
    fn flush_commits_pending_edit_once() {
        let (scheduler, state, commits) = harness(500);
        assert!(!state.flush());
        state.update(FilterPatch::search("now"));
        assert!(state.flush());
        scheduler.advance(Duration::from_secs(1));
        let commits = lock(&commits);
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].criteria.search, "now");
    }
}
