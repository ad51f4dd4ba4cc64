//! One controller per resource screen.
//!
//! # Design
//! - Composes filters, the page collection, action tracking, the
//!   confirmation gate, selection, and toasts over a [`ResourceApi`].
//! - No lock is held across an `.await`; every await point works on owned
//!   data or an `Arc` of the API.
//! - Debounced filter commits spawn their fetch onto the current tokio
//!   runtime; [`ResourceController::wait_idle`] awaits the latest one.

use std::future::Future;
use std::sync::{Arc, Mutex};

use roster_api_models::{BulkActionRequest, ListQuery, MutationAck, ResourceId};
use roster_client::{ApiError, ApiResult, SessionExpired, TokenGateway};
use roster_config::ControllerConfig;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::core::actions::{ActionKey, ActionTracker, BulkReport, RunOutcome};
use crate::core::collection::{
    ApplyOutcome, FetchTicket, PaginatedCollection, PaginationInfo, ResourceItem, merge_json,
};
use crate::core::confirm::{ConfirmationGate, GateError};
use crate::core::export::{ExportError, to_csv};
use crate::core::filters::{CommittedFilter, FilterCriteria, FilterPatch, FilterState};
use crate::core::lock;
use crate::core::schedule::Scheduler;
use crate::core::selection::Selection;
use crate::core::toast::{ToastId, ToastQueue};
use crate::features::resources::actions::{
    ResourceAction, bulk_toast_kind, delete_prompt, success_message,
};
use crate::features::resources::api::{ResourceApi, RestResource};
use crate::features::resources::state::ControllerSnapshot;

/// Destructive action parked behind the confirmation gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    /// Delete one item.
    Delete(ResourceId),
    /// Delete several items.
    BulkDelete(Vec<ResourceId>),
}

/// Result of running a confirmed action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmedOutcome {
    /// Single delete.
    Deleted(RunOutcome<()>),
    /// Bulk delete.
    Bulk(RunOutcome<BulkReport>),
}

/// Controller for one resource list screen.
pub struct ResourceController<T> {
    inner: Arc<ControllerInner<T>>,
}

impl<T> Clone for ResourceController<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct ControllerInner<T> {
    api: Arc<dyn ResourceApi<T>>,
    per_page: u32,
    filters: FilterState,
    collection: PaginatedCollection<T>,
    actions: ActionTracker,
    gate: ConfirmationGate<PendingAction>,
    toasts: ToastQueue,
    selection: Mutex<Selection>,
    gateway: Option<TokenGateway>,
    revision: watch::Sender<u64>,
    background: Mutex<Option<JoinHandle<ApplyOutcome>>>,
}

impl<T: ResourceItem> ResourceController<T> {
    /// Build a controller over `api`.
    ///
    /// `gateway` is only used to expose session-expired events.
    #[must_use]
    pub fn new(
        api: Arc<dyn ResourceApi<T>>,
        config: &ControllerConfig,
        scheduler: Arc<dyn Scheduler>,
        gateway: Option<TokenGateway>,
    ) -> Self {
        let (revision, _) = watch::channel(0);
        let inner = Arc::new(ControllerInner {
            api,
            per_page: config.per_page.max(1),
            filters: FilterState::new(
                Arc::clone(&scheduler),
                config.debounce,
                FilterCriteria::default(),
            ),
            collection: PaginatedCollection::new(),
            actions: ActionTracker::new(),
            gate: ConfirmationGate::new(),
            toasts: ToastQueue::new(scheduler, config.toast_duration, config.toast_capacity),
            selection: Mutex::new(Selection::default()),
            gateway,
            revision,
            background: Mutex::new(None),
        });

        let weak = Arc::downgrade(&inner);
        inner.filters.on_commit(Arc::new(move |commit: CommittedFilter| {
            if let Some(inner) = weak.upgrade() {
                Self { inner }.filters_committed(&commit);
            }
        }));
        let weak = Arc::downgrade(&inner);
        inner.toasts.set_listener(Arc::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.bump();
            }
        }));

        Self { inner }
    }

    /// Build a controller over a REST resource, wiring its session gateway.
    #[must_use]
    pub fn rest(
        resource: RestResource<T>,
        config: &ControllerConfig,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        let gateway = resource.client().gateway().clone();
        Self::new(Arc::new(resource), config, scheduler, Some(gateway))
    }

    /// Fetch `page` with the committed filters.
    pub async fn fetch(&self, page: u32) -> ApplyOutcome {
        let (ticket, query) = self.begin_fetch(page);
        self.complete_fetch(ticket, query).await
    }

    /// Re-fetch the current page.
    pub async fn refresh(&self) -> ApplyOutcome {
        let page = self.inner.collection.pagination().current_page;
        self.fetch(page).await
    }

    /// Fetch the next page; `None` when already on the last page.
    pub async fn next_page(&self) -> Option<ApplyOutcome> {
        let pagination = self.inner.collection.pagination();
        if !pagination.has_next {
            return None;
        }
        Some(self.fetch(pagination.current_page + 1).await)
    }

    /// Fetch the previous page; `None` when already on the first page.
    pub async fn prev_page(&self) -> Option<ApplyOutcome> {
        let pagination = self.inner.collection.pagination();
        if !pagination.has_prev || pagination.current_page <= 1 {
            return None;
        }
        Some(self.fetch(pagination.current_page - 1).await)
    }

    /// Await the most recent fetch spawned by a filter commit.
    pub async fn wait_idle(&self) -> Option<ApplyOutcome> {
        let handle = lock(&self.inner.background).take()?;
        handle.await.ok()
    }

    fn begin_fetch(&self, page: u32) -> (FetchTicket, ListQuery) {
        let page = page.max(1);
        let criteria = self.inner.filters.committed();
        let query = ListQuery {
            page,
            per_page: self.inner.per_page,
            search: criteria.search.trim().to_string(),
            kind: criteria.kind,
            status: criteria.status,
            sort_by: criteria.sort_by,
            sort_order: criteria.sort_order,
        };
        let ticket = self.inner.collection.begin_fetch(page);
        self.inner.bump();
        (ticket, query)
    }

    async fn complete_fetch(&self, ticket: FetchTicket, query: ListQuery) -> ApplyOutcome {
        let result = self.inner.api.list(&query).await;
        let outcome = self.inner.collection.apply(ticket, result);
        if outcome == ApplyOutcome::Stale {
            return outcome;
        }
        match &outcome {
            ApplyOutcome::Applied => {
                let visible = self.inner.collection.ids();
                lock(&self.inner.selection).retain_visible(&visible);
                debug!(page = ticket.page, items = visible.len(), "page applied");
            }
            ApplyOutcome::Failed(error) if error.is_session_error() => {
                debug!(page = ticket.page, "page fetch stopped by session");
            }
            ApplyOutcome::Failed(error) => {
                warn!(page = ticket.page, error = %error, "page fetch failed");
            }
            ApplyOutcome::Stale => {}
        }
        self.inner.bump();
        outcome
    }

    fn spawn_fetch(&self, page: u32) {
        let Ok(runtime) = Handle::try_current() else {
            warn!(page, "no async runtime; filter commit not fetched");
            return;
        };
        let (ticket, query) = self.begin_fetch(page);
        let controller = self.clone();
        let handle = runtime.spawn(async move { controller.complete_fetch(ticket, query).await });
        *lock(&self.inner.background) = Some(handle);
    }

    /// Edit the pending filters; the commit follows after the debounce.
    pub fn update_filters(&self, patch: FilterPatch) {
        self.inner.filters.update(patch);
        self.inner.bump();
    }

    /// Replace the filters and fetch page 1 immediately.
    pub fn switch_view(&self, criteria: FilterCriteria) {
        self.inner.filters.switch_view(criteria);
    }

    /// Replace the filters without fetching; the next fetch uses them.
    pub fn set_filters(&self, criteria: FilterCriteria) {
        self.inner.filters.replace(criteria);
        self.inner.bump();
    }

    /// Commit a pending filter edit now. Returns `false` if none was pending.
    pub fn flush_filters(&self) -> bool {
        self.inner.filters.flush()
    }

    fn filters_committed(&self, commit: &CommittedFilter) {
        let page = if commit.reset_page {
            lock(&self.inner.selection).clear();
            1
        } else {
            self.inner.collection.pagination().current_page
        };
        self.spawn_fetch(page);
    }

    /// Create an item from `body`.
    pub async fn create(&self, body: Value) -> RunOutcome<Option<T>> {
        let api = Arc::clone(&self.inner.api);
        let outcome = self
            .mutate(ResourceAction::Create, None, || async move {
                api.create(&body).await
            })
            .await;
        match outcome {
            RunOutcome::Done(ack) => {
                let created = ack.into_record();
                match &created {
                    Some(item) => self.inner.collection.upsert_item(item.clone()),
                    None => {
                        self.refresh().await;
                    }
                }
                self.inner.bump();
                RunOutcome::Done(created)
            }
            RunOutcome::Failed(error) => RunOutcome::Failed(error),
            RunOutcome::Skipped => RunOutcome::Skipped,
        }
    }

    /// Replace the item `id` with `body`.
    pub async fn update(&self, id: ResourceId, body: Value) -> RunOutcome<Option<T>> {
        let api = Arc::clone(&self.inner.api);
        let (target, sent) = (id.clone(), body.clone());
        let outcome = self
            .mutate(ResourceAction::Update, Some(&id), || async move {
                api.update(&target, &sent).await
            })
            .await;
        outcome.map(|ack| self.reflect(&id, ack, &body))
    }

    /// Apply a partial update to item `id`.
    pub async fn patch(&self, id: ResourceId, body: Value) -> RunOutcome<Option<T>> {
        let api = Arc::clone(&self.inner.api);
        let (target, sent) = (id.clone(), body.clone());
        let outcome = self
            .mutate(ResourceAction::Patch, Some(&id), || async move {
                api.patch(&target, &sent).await
            })
            .await;
        outcome.map(|ack| self.reflect(&id, ack, &body))
    }

    /// Delete item `id` without confirmation.
    pub async fn delete(&self, id: ResourceId) -> RunOutcome<()> {
        let api = Arc::clone(&self.inner.api);
        let target = id.clone();
        let outcome = self
            .mutate(ResourceAction::Delete, Some(&id), || async move {
                api.delete(&target).await
            })
            .await;
        if outcome.is_done() {
            self.inner.collection.remove_item(&id);
            lock(&self.inner.selection).remove(&id);
            self.inner.bump();
        }
        outcome.map(|_| ())
    }

    async fn mutate<F, Fut>(
        &self,
        action: ResourceAction,
        id: Option<&ResourceId>,
        op: F,
    ) -> RunOutcome<MutationAck<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<MutationAck<T>>>,
    {
        let key = action.key(id);
        let outcome = self.inner.actions.run(key.clone(), op).await;
        match &outcome {
            RunOutcome::Done(_) => {
                info!(key = %key, "mutation succeeded");
                self.inner.toasts.success(success_message(action, id));
            }
            RunOutcome::Failed(error) => self.report_failure(error),
            RunOutcome::Skipped => {}
        }
        self.inner.bump();
        outcome
    }

    fn reflect(&self, id: &ResourceId, ack: MutationAck<T>, sent: &Value) -> Option<T> {
        match ack.into_record() {
            Some(record) => {
                let replacement = record.clone();
                self.inner
                    .collection
                    .apply_patch(id, move |item| *item = replacement);
                Some(record)
            }
            None => {
                if let Value::Object(fields) = sent {
                    self.inner.collection.apply_patch(id, |item| {
                        if let Some(merged) = merge_json(item, fields) {
                            *item = merged;
                        }
                    });
                }
                None
            }
        }
    }

    fn report_failure(&self, error: &ApiError) {
        if error.is_session_error() {
            debug!(error = %error, "session error routed to session signal");
            return;
        }
        self.inner.toasts.error(error.user_message());
    }

    /// Ask for confirmation before deleting `id`.
    ///
    /// # Errors
    /// [`GateError::Busy`] if another confirmation is pending.
    pub fn request_delete(&self, id: ResourceId) -> Result<(), GateError> {
        let prompt = delete_prompt(std::slice::from_ref(&id));
        self.inner.gate.request(prompt, PendingAction::Delete(id))?;
        self.inner.bump();
        Ok(())
    }

    /// Ask for confirmation before deleting `ids`.
    ///
    /// # Errors
    /// [`GateError::Busy`] if another confirmation is pending.
    pub fn request_bulk_delete(&self, ids: Vec<ResourceId>) -> Result<(), GateError> {
        let prompt = delete_prompt(&ids);
        self.inner.gate.request(prompt, PendingAction::BulkDelete(ids))?;
        self.inner.bump();
        Ok(())
    }

    /// Confirm and run the pending action.
    ///
    /// # Errors
    /// [`GateError::Idle`] if nothing is pending.
    pub async fn confirm(&self) -> Result<ConfirmedOutcome, GateError> {
        let action = self.inner.gate.confirm()?;
        self.inner.bump();
        Ok(match action {
            PendingAction::Delete(id) => ConfirmedOutcome::Deleted(self.delete(id).await),
            PendingAction::BulkDelete(ids) => ConfirmedOutcome::Bulk(self.bulk_delete(ids).await),
        })
    }

    /// Dismiss the pending confirmation.
    ///
    /// # Errors
    /// [`GateError::Idle`] if nothing is pending.
    pub fn cancel(&self) -> Result<(), GateError> {
        self.inner.gate.cancel()?;
        self.inner.bump();
        Ok(())
    }

    /// Run `action` on `ids` through the bulk endpoint.
    ///
    /// A failed call to the endpoint itself counts every id as failed.
    pub async fn bulk_action(&self, action: &str, ids: Vec<ResourceId>) -> RunOutcome<BulkReport> {
        if ids.is_empty() {
            return RunOutcome::Done(BulkReport::default());
        }
        let api = Arc::clone(&self.inner.api);
        let request = BulkActionRequest {
            ids: ids.clone(),
            action: action.to_string(),
        };
        let run = self.inner.actions.run(ActionKey::bulk(action), || async move {
            api.bulk_action(&request).await
        });
        let outcome = match run.await {
            RunOutcome::Done(response) => RunOutcome::Done(BulkReport::from_response(&ids, response)),
            RunOutcome::Failed(error) if error.is_session_error() => {
                self.report_failure(&error);
                RunOutcome::Failed(error)
            }
            RunOutcome::Failed(error) => RunOutcome::Done(BulkReport::all_failed(&ids, &error)),
            RunOutcome::Skipped => RunOutcome::Skipped,
        };
        if let RunOutcome::Done(report) = &outcome {
            self.finish_bulk(action, report);
            if !report.succeeded.is_empty() {
                self.refresh().await;
            }
        }
        self.inner.bump();
        outcome
    }

    /// Delete `ids` with one request per id; failures never cancel
    /// siblings.
    pub async fn bulk_delete(&self, ids: Vec<ResourceId>) -> RunOutcome<BulkReport> {
        if ids.is_empty() {
            return RunOutcome::Done(BulkReport::default());
        }
        let api = Arc::clone(&self.inner.api);
        let outcome = self
            .inner
            .actions
            .run_bulk(ActionKey::bulk("delete"), ids, |id| {
                let api = Arc::clone(&api);
                async move { api.delete(&id).await.map(|_| ()) }
            })
            .await;
        if let RunOutcome::Done(report) = &outcome {
            for id in &report.succeeded {
                self.inner.collection.remove_item(id);
            }
            self.finish_bulk("delete", report);
        }
        self.inner.bump();
        outcome
    }

    fn finish_bulk(&self, action: &str, report: &BulkReport) {
        {
            let mut selection = lock(&self.inner.selection);
            for id in &report.succeeded {
                selection.remove(id);
            }
        }
        info!(
            action,
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "bulk action finished"
        );
        if report.session_lost {
            debug!(action, "bulk toast suppressed after session loss");
            return;
        }
        self.inner
            .toasts
            .push_default(bulk_toast_kind(report), report.summary());
    }

    /// Toggle `id` in the selection.
    pub fn toggle_selected(&self, id: ResourceId) {
        lock(&self.inner.selection).toggle(id);
        self.inner.bump();
    }

    /// Select every visible row, or clear if all are selected.
    pub fn select_all_or_clear(&self) {
        let visible = self.inner.collection.ids();
        lock(&self.inner.selection).select_all_or_clear(&visible);
        self.inner.bump();
    }

    /// Clear the selection.
    pub fn clear_selection(&self) {
        lock(&self.inner.selection).clear();
        self.inner.bump();
    }

    /// Selected ids.
    #[must_use]
    pub fn selected_ids(&self) -> Vec<ResourceId> {
        lock(&self.inner.selection).ids()
    }

    /// Render the visible page as CSV.
    ///
    /// # Errors
    /// See [`to_csv`].
    pub fn export_csv(&self, columns: &[&str]) -> Result<String, ExportError> {
        to_csv(&self.inner.collection.items(), columns)
    }

    /// Everything a view needs to render.
    #[must_use]
    pub fn snapshot(&self) -> ControllerSnapshot<T> {
        ControllerSnapshot {
            page: self.inner.collection.snapshot(),
            loading: self.inner.collection.is_loading(),
            last_error: self.inner.collection.last_error(),
            filters: self.inner.filters.committed(),
            pending_filters: self.inner.filters.pending(),
            selection: self.selected_ids(),
            actions: self.inner.actions.snapshot(),
            toasts: self.inner.toasts.snapshot(),
            confirmation: self.inner.gate.pending_message(),
        }
    }

    /// Current pagination metadata.
    #[must_use]
    pub fn pagination(&self) -> PaginationInfo {
        self.inner.collection.pagination()
    }

    /// Dismiss a toast.
    pub fn dismiss_toast(&self, id: ToastId) -> bool {
        self.inner.toasts.dismiss(id)
    }

    /// Forget the inline error recorded for `key`.
    pub fn clear_action_error(&self, key: &ActionKey) {
        self.inner.actions.clear_error(key);
        self.inner.bump();
    }

    /// Session-expired events, when the controller was built with a gateway.
    #[must_use]
    pub fn session_events(&self) -> Option<broadcast::Receiver<SessionExpired>> {
        self.inner.gateway.as_ref().map(TokenGateway::subscribe)
    }

    /// Revision counter bumped on every observable change.
    #[must_use]
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }
}

impl<T> ControllerInner<T> {
    fn bump(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }
}
