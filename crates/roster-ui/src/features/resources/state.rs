//! Render-ready snapshot of a resource screen.

use std::collections::BTreeMap;

use roster_api_models::ResourceId;
use roster_client::ApiError;

use crate::core::actions::{ActionKey, ActionState};
use crate::core::collection::PageSnapshot;
use crate::core::filters::FilterCriteria;
use crate::core::toast::Toast;

/// Everything a view needs to render one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerSnapshot<T> {
    /// Current page.
    pub page: PageSnapshot<T>,
    /// Whether a page fetch is outstanding.
    pub loading: bool,
    /// Error of the last applied fetch, if it failed.
    pub last_error: Option<ApiError>,
    /// Committed filter criteria.
    pub filters: FilterCriteria,
    /// Criteria as currently edited, possibly not yet committed.
    pub pending_filters: FilterCriteria,
    /// Selected ids.
    pub selection: Vec<ResourceId>,
    /// Non-idle action keys.
    pub actions: BTreeMap<ActionKey, ActionState>,
    /// Visible toasts, oldest first.
    pub toasts: Vec<Toast>,
    /// Prompt of the pending confirmation, if any.
    pub confirmation: Option<String>,
}

impl<T> ControllerSnapshot<T> {
    /// Whether `key` is in flight.
    #[must_use]
    pub fn is_loading(&self, key: &ActionKey) -> bool {
        self.actions.get(key).is_some_and(|state| state.loading)
    }

    /// Whether the filters have uncommitted edits.
    #[must_use]
    pub fn filters_dirty(&self) -> bool {
        self.filters != self.pending_filters
    }
}
