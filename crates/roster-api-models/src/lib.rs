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
//! Shared HTTP DTOs for resource list, mutation, and bulk endpoints.
//!
//! Every managed resource (users, content, courses, appointments, logs) exposes
//! the same envelope shapes; only the name of the items array differs, so the
//! list envelope is decoded from a raw JSON value with the field name supplied
//! by the caller.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Stable identifier of a resource item.
///
/// Servers use either integer or string ids; the original representation is
/// preserved so ids round-trip unchanged into bulk payloads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceId {
    /// Integer identifier.
    Int(i64),
    /// Opaque string identifier.
    Str(String),
}

impl ResourceId {
    /// Parse user input, preferring the integer form when it fits.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        trimmed
            .parse::<i64>()
            .map_or_else(|_| Self::Str(trimmed.to_string()), Self::Int)
    }
}

impl Display for ResourceId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(formatter, "{value}"),
            Self::Str(value) => formatter.write_str(value),
        }
    }
}

impl From<i64> for ResourceId {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for ResourceId {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for ResourceId {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

/// Opaque resource record: an id plus whatever fields the server returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Stable identifier.
    pub id: ResourceId,
    /// Remaining resource-specific fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    /// Build a record from an id and field map.
    #[must_use]
    pub const fn new(id: ResourceId, fields: Map<String, Value>) -> Self {
        Self { id, fields }
    }

    /// Shallow-merge `patch` into the record's fields. An `id` key in the patch
    /// is ignored so the identity of the record never changes.
    pub fn merge(&mut self, patch: &Map<String, Value>) {
        for (key, value) in patch {
            if key != "id" {
                self.fields.insert(key.clone(), value.clone());
            }
        }
    }

    /// Read a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// Sort direction for list queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending order.
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

impl SortOrder {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    /// The opposite direction.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

impl Display for SortOrder {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(format!("unknown sort order '{other}'")),
        }
    }
}

/// Query parameters for `GET <resource>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    /// One-based page number.
    pub page: u32,
    /// Page size.
    pub per_page: u32,
    /// Free-text search term.
    pub search: String,
    /// Optional resource type filter.
    pub kind: Option<String>,
    /// Optional status filter.
    pub status: Option<String>,
    /// Sort column.
    pub sort_by: String,
    /// Sort direction.
    pub sort_order: SortOrder,
}

impl ListQuery {
    /// Query-string pairs; blank optional criteria are omitted.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("per_page", self.per_page.to_string()),
        ];
        let search = self.search.trim();
        if !search.is_empty() {
            pairs.push(("search", search.to_string()));
        }
        if let Some(kind) = self.kind.as_deref().filter(|v| !v.trim().is_empty()) {
            pairs.push(("type", kind.to_string()));
        }
        if let Some(status) = self.status.as_deref().filter(|v| !v.trim().is_empty()) {
            pairs.push(("status", status.to_string()));
        }
        if !self.sort_by.trim().is_empty() {
            pairs.push(("sort_by", self.sort_by.clone()));
            pairs.push(("sort_order", self.sort_order.as_str().to_string()));
        }
        pairs
    }
}

/// Pagination metadata that accompanies every list response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListMeta {
    /// Total number of matching items.
    #[serde(default)]
    pub total: u64,
    /// Total number of pages.
    #[serde(default)]
    pub pages: u32,
    /// Page the server returned.
    #[serde(default = "first_page")]
    pub current_page: u32,
    /// Whether a previous page exists, when the server reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_prev: Option<bool>,
    /// Whether a next page exists, when the server reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_next: Option<bool>,
}

const fn first_page() -> u32 {
    1
}

/// Decoded list response.
#[derive(Debug, Clone, PartialEq)]
pub struct ListEnvelope<T> {
    /// Items on the returned page.
    pub items: Vec<T>,
    /// Pagination metadata.
    pub meta: ListMeta,
}

impl<T: DeserializeOwned> ListEnvelope<T> {
    /// Decode a list payload whose items live under `items_field`.
    ///
    /// Falls back to a generic `items` key when `items_field` is absent.
    ///
    /// # Errors
    /// Returns a JSON error when the payload is not an object, the items array
    /// is missing, or any item fails to decode.
    pub fn from_value(value: Value, items_field: &str) -> Result<Self, serde_json::Error> {
        let Value::Object(mut object) = value else {
            return Err(serde::de::Error::custom("list payload must be a JSON object"));
        };
        let raw_items = object
            .remove(items_field)
            .or_else(|| object.remove("items"))
            .ok_or_else(|| {
                serde::de::Error::custom(format!("list payload is missing '{items_field}'"))
            })?;
        let items = serde_json::from_value::<Vec<T>>(raw_items)?;
        let meta = serde_json::from_value::<ListMeta>(Value::Object(object))?;
        Ok(Self { items, meta })
    }
}

/// Body of `POST <resource>/bulk-action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkActionRequest {
    /// Target ids.
    pub ids: Vec<ResourceId>,
    /// Action verb (e.g. `activate`, `archive`).
    pub action: String,
}

/// Per-item failure reported by the bulk endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkFailure {
    /// Failed id.
    pub id: ResourceId,
    /// Failure reason.
    pub error: String,
}

/// Aggregate result of a bulk action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkActionResponse {
    /// Ids that succeeded, when itemised.
    #[serde(default)]
    pub succeeded: Option<Vec<ResourceId>>,
    /// Ids that failed, when itemised.
    #[serde(default)]
    pub failed: Option<Vec<BulkFailure>>,
    /// Optional summary message.
    #[serde(default)]
    pub message: Option<String>,
}

/// Response of a single-item mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MutationAck<T> {
    /// The updated record.
    Record(T),
    /// Plain acknowledgement.
    Message {
        /// Acknowledgement text.
        message: String,
    },
    /// Empty body (e.g. `204 No Content`).
    Empty,
}

impl<T> MutationAck<T> {
    /// The returned record, if any.
    pub fn into_record(self) -> Option<T> {
        match self {
            Self::Record(record) => Some(record),
            Self::Message { .. } | Self::Empty => None,
        }
    }
}

/// Structured error body returned on non-2xx responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Preferred human-readable message.
    #[serde(default)]
    pub message: Option<String>,
    /// Alternate error field used by some endpoints.
    #[serde(default)]
    pub error: Option<String>,
    /// Problem-details style detail field.
    #[serde(default)]
    pub detail: Option<String>,
}

impl ErrorBody {
    /// First non-blank message field, in `message`, `error`, `detail` order.
    #[must_use]
    pub fn into_message(self) -> Option<String> {
        [self.message, self.error, self.detail]
            .into_iter()
            .flatten()
            .map(|text| text.trim().to_string())
            .find(|text| !text.is_empty())
    }
}
