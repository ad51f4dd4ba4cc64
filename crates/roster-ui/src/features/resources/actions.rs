//! Single-item mutations and their toast text.

use roster_api_models::ResourceId;

use crate::core::actions::{ActionKey, BulkReport};
use crate::core::toast::ToastKind;

/// Mutations issued against one item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceAction {
    /// `POST <base>`.
    Create,
    /// `PUT <base>/<id>`.
    Update,
    /// `PATCH <base>/<id>`.
    Patch,
    /// `DELETE <base>/<id>`.
    Delete,
}

impl ResourceAction {
    /// Verb used in action keys.
    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Patch => "patch",
            Self::Delete => "delete",
        }
    }

    /// Tracker key for this action on `id` (`create:new` for creates).
    #[must_use]
    pub fn key(self, id: Option<&ResourceId>) -> ActionKey {
        match (self, id) {
            (Self::Create, _) | (_, None) => ActionKey::create(),
            (action, Some(id)) => ActionKey::item(action.verb(), id),
        }
    }
}

/// Toast text for a successful mutation.
#[must_use]
pub fn success_message(action: ResourceAction, id: Option<&ResourceId>) -> String {
    let target = id.map_or_else(|| "item".to_string(), |id| format!("item {id}"));
    match action {
        ResourceAction::Create => format!("Created {target}"),
        ResourceAction::Update | ResourceAction::Patch => format!("Updated {target}"),
        ResourceAction::Delete => format!("Deleted {target}"),
    }
}

/// Prompt shown before deleting `ids`.
#[must_use]
pub fn delete_prompt(ids: &[ResourceId]) -> String {
    match ids {
        [id] => format!("Delete item {id}? This cannot be undone."),
        _ => format!("Delete {} items? This cannot be undone.", ids.len()),
    }
}

/// Severity of the single toast summarising a bulk run.
#[must_use]
pub fn bulk_toast_kind(report: &BulkReport) -> ToastKind {
    match (report.succeeded.is_empty(), report.failed.is_empty()) {
        (_, true) => ToastKind::Success,
        (false, false) => ToastKind::Warning,
        (true, false) => ToastKind::Error,
    }
}
