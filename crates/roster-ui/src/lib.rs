#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Headless controller for paginated, filterable resource screens.
//!
//! Layout:
//! - `core/`: framework-agnostic building blocks (schedule, filters,
//!   collection, actions, confirm, toast, selection, export)
//! - `features/resources/`: the API seam and `ResourceController`

pub mod core;
pub mod features;

pub use crate::core::actions::{
    ActionKey, ActionState, ActionTracker, BulkItemFailure, BulkReport, RunOutcome,
};
pub use crate::core::collection::{
    ApplyOutcome, FetchTicket, ListSource, PageSnapshot, PaginatedCollection, PaginationInfo,
    ResourceItem,
};
pub use crate::core::confirm::{ConfirmationGate, GateError};
pub use crate::core::export::{ExportError, to_csv};
pub use crate::core::filters::{CommittedFilter, FilterCriteria, FilterPatch, FilterState};
pub use crate::core::schedule::{ManualScheduler, Scheduler, TaskId, TokioScheduler};
pub use crate::core::selection::Selection;
pub use crate::core::toast::{Toast, ToastId, ToastKind, ToastQueue};
pub use crate::features::resources::api::{ResourceApi, RestResource};
pub use crate::features::resources::controller::{
    ConfirmedOutcome, PendingAction, ResourceController,
};
pub use crate::features::resources::state::ControllerSnapshot;
