//! JSON payload fixtures mirroring the resource API contract.

use serde_json::{Value, json};

/// Bearer token used by test sessions.
pub const TEST_TOKEN: &str = "test-session-token";

/// `Authorization` header value for `token`.
#[must_use]
pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

/// A minimal record with an integer id and a `name` field.
#[must_use]
pub fn record_json(id: i64, name: &str) -> Value {
    json!({ "id": id, "name": name, "status": "active" })
}

/// A list payload whose items live under `items_field`.
///
/// `has_prev`/`has_next` are derived from `current_page` and `pages`.
#[must_use]
pub fn list_json(items_field: &str, ids: &[i64], current_page: u32, pages: u32, total: u64) -> Value {
    let items: Vec<Value> = ids
        .iter()
        .map(|id| record_json(*id, &format!("item-{id}")))
        .collect();
    let mut payload = json!({
        "total": total,
        "pages": pages,
        "current_page": current_page,
        "has_prev": current_page > 1,
        "has_next": current_page < pages,
    });
    if let Value::Object(map) = &mut payload {
        map.insert(items_field.to_string(), Value::Array(items));
    }
    payload
}

/// An itemised bulk-action response.
#[must_use]
pub fn bulk_json(succeeded: &[i64], failed: &[(i64, &str)]) -> Value {
    let failed: Vec<Value> = failed
        .iter()
        .map(|(id, error)| json!({ "id": id, "error": error }))
        .collect();
    json!({ "succeeded": succeeded, "failed": failed })
}
