//! The current page of items plus pagination metadata.
//!
//! Every fetch is stamped with a generation; a response is applied only if
//! its generation is still the latest one issued. Older responses resolving
//! late are discarded so the view never regresses.

use std::sync::Mutex;

use async_trait::async_trait;
use roster_api_models::{ListEnvelope, ListMeta, ListQuery, Record, ResourceId};
use roster_client::{ApiError, ApiResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use crate::core::lock;

/// An item the controller can list, patch, and export.
pub trait ResourceItem: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Stable identifier.
    fn id(&self) -> ResourceId;
}

impl ResourceItem for Record {
    fn id(&self) -> ResourceId {
        self.id.clone()
    }
}

/// Source of list pages.
#[async_trait]
pub trait ListSource<T>: Send + Sync {
    /// Fetch one page matching `query`.
    async fn list(&self, query: &ListQuery) -> ApiResult<ListEnvelope<T>>;
}

/// Normalised pagination metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationInfo {
    /// Total matching items.
    pub total: u64,
    /// Total pages.
    pub pages: u32,
    /// One-based current page.
    pub current_page: u32,
    /// Whether a previous page exists.
    pub has_prev: bool,
    /// Whether a next page exists.
    pub has_next: bool,
}

impl Default for PaginationInfo {
    fn default() -> Self {
        Self {
            total: 0,
            pages: 0,
            current_page: 1,
            has_prev: false,
            has_next: false,
        }
    }
}

impl PaginationInfo {
    /// Build from server metadata, deriving missing prev/next flags and
    /// keeping `current_page` inside `1..=max(pages, 1)`.
    #[must_use]
    pub fn from_meta(meta: ListMeta) -> Self {
        let last = meta.pages.max(1);
        let current_page = meta.current_page.clamp(1, last);
        Self {
            total: meta.total,
            pages: meta.pages,
            current_page,
            has_prev: meta.has_prev.unwrap_or(current_page > 1),
            has_next: meta.has_next.unwrap_or(current_page < meta.pages),
        }
    }
}

/// Immutable view of the page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSnapshot<T> {
    /// Items in server order.
    pub items: Vec<T>,
    /// Pagination metadata.
    pub pagination: PaginationInfo,
    /// Generation of the response that produced this page (0 before any).
    pub generation: u64,
}

impl<T> Default for PageSnapshot<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            pagination: PaginationInfo::default(),
            generation: 0,
        }
    }
}

/// Token identifying one issued fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    /// Generation stamped on the request.
    pub generation: u64,
    /// Page requested.
    pub page: u32,
}

/// What happened to a fetch response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The page was replaced.
    Applied,
    /// The fetch failed; the previous page stays visible.
    Failed(ApiError),
    /// A newer fetch was issued; the response was discarded.
    Stale,
}

/// Page state guarded by a single lock.
pub struct PaginatedCollection<T> {
    state: Mutex<CollectionState<T>>,
}

struct CollectionState<T> {
    snapshot: PageSnapshot<T>,
    latest: u64,
    loading: bool,
    last_error: Option<ApiError>,
}

impl<T> Default for PaginatedCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PaginatedCollection<T> {
    /// Empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CollectionState {
                snapshot: PageSnapshot::default(),
                latest: 0,
                loading: false,
                last_error: None,
            }),
        }
    }

    /// Stamp a new fetch for `page`, making every earlier ticket stale.
    pub fn begin_fetch(&self, page: u32) -> FetchTicket {
        let mut state = lock(&self.state);
        state.latest += 1;
        state.loading = true;
        FetchTicket {
            generation: state.latest,
            page,
        }
    }

    /// Apply the response for `ticket`.
    pub fn apply(&self, ticket: FetchTicket, result: ApiResult<ListEnvelope<T>>) -> ApplyOutcome {
        let mut state = lock(&self.state);
        if ticket.generation != state.latest {
            debug!(
                generation = ticket.generation,
                latest = state.latest,
                "discarding stale page response"
            );
            return ApplyOutcome::Stale;
        }
        state.loading = false;
        match result {
            Ok(envelope) => {
                state.snapshot = PageSnapshot {
                    items: envelope.items,
                    pagination: PaginationInfo::from_meta(envelope.meta),
                    generation: ticket.generation,
                };
                state.last_error = None;
                ApplyOutcome::Applied
            }
            Err(error) => {
                state.last_error = Some(error.clone());
                ApplyOutcome::Failed(error)
            }
        }
    }

    /// Issue `query` against `source` and apply the result.
    pub async fn fetch<S>(&self, source: &S, query: ListQuery) -> ApplyOutcome
    where
        S: ListSource<T> + ?Sized,
    {
        let ticket = self.begin_fetch(query.page);
        let result = source.list(&query).await;
        self.apply(ticket, result)
    }

    /// Make any in-flight fetch stale without issuing a new one.
    pub fn invalidate(&self) {
        let mut state = lock(&self.state);
        state.latest += 1;
        state.loading = false;
    }

    /// Whether a fetch is outstanding.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        lock(&self.state).loading
    }

    /// Error from the most recent applied fetch, if it failed.
    #[must_use]
    pub fn last_error(&self) -> Option<ApiError> {
        lock(&self.state).last_error.clone()
    }

    /// Current pagination metadata.
    #[must_use]
    pub fn pagination(&self) -> PaginationInfo {
        lock(&self.state).snapshot.pagination
    }

    /// Latest generation issued.
    #[must_use]
    pub fn latest_generation(&self) -> u64 {
        lock(&self.state).latest
    }
}

impl<T: ResourceItem> PaginatedCollection<T> {
    /// Clone of the current page.
    #[must_use]
    pub fn snapshot(&self) -> PageSnapshot<T> {
        lock(&self.state).snapshot.clone()
    }

    /// Items on the current page.
    #[must_use]
    pub fn items(&self) -> Vec<T> {
        lock(&self.state).snapshot.items.clone()
    }

    /// Ids on the current page, in order.
    #[must_use]
    pub fn ids(&self) -> Vec<ResourceId> {
        lock(&self.state)
            .snapshot
            .items
            .iter()
            .map(ResourceItem::id)
            .collect()
    }

    /// Mutate the item with `id` in place. Returns `false` if it is not on
    /// the current page.
    pub fn apply_patch(&self, id: &ResourceId, patch: impl FnOnce(&mut T)) -> bool {
        let mut state = lock(&self.state);
        match state.snapshot.items.iter_mut().find(|item| &item.id() == id) {
            Some(item) => {
                patch(item);
                true
            }
            None => false,
        }
    }

    /// Drop the item with `id`, decrementing the total.
    pub fn remove_item(&self, id: &ResourceId) -> bool {
        let mut state = lock(&self.state);
        let before = state.snapshot.items.len();
        state.snapshot.items.retain(|item| &item.id() != id);
        let removed = state.snapshot.items.len() != before;
        if removed {
            let pagination = &mut state.snapshot.pagination;
            pagination.total = pagination.total.saturating_sub(1);
        }
        removed
    }

    /// Replace the item with the same id, or insert it at the head of the
    /// page and bump the total.
    pub fn upsert_item(&self, item: T) {
        let mut state = lock(&self.state);
        let id = item.id();
        if let Some(existing) = state
            .snapshot
            .items
            .iter_mut()
            .find(|existing| existing.id() == id)
        {
            *existing = item;
            return;
        }
        state.snapshot.items.insert(0, item);
        state.snapshot.pagination.total += 1;
    }
}

/// Merge a JSON object into `item` through its serialized form.
///
/// Returns `None` when the item does not serialize to an object or the
/// merged object no longer decodes as `T`. The `id` key is never changed.
#[must_use]
pub fn merge_json<T: ResourceItem>(item: &T, patch: &Map<String, Value>) -> Option<T> {
    let Value::Object(mut object) = serde_json::to_value(item).ok()? else {
        return None;
    };
    for (key, value) in patch {
        if key != "id" {
            object.insert(key.clone(), value.clone());
        }
    }
    serde_json::from_value(Value::Object(object)).ok()
}
