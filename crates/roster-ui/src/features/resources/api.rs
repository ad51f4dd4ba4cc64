//! The resource API seam and its REST implementation.

use std::marker::PhantomData;

use async_trait::async_trait;
use roster_api_models::{
    BulkActionRequest, BulkActionResponse, ListEnvelope, ListQuery, MutationAck, ResourceId,
};
use roster_client::{ApiError, ApiResult, RequestClient};
use serde_json::Value;

use crate::core::collection::{ListSource, ResourceItem};

/// Operations a resource screen issues against its backend.
#[async_trait]
pub trait ResourceApi<T>: ListSource<T> {
    /// `POST <base>`.
    async fn create(&self, body: &Value) -> ApiResult<MutationAck<T>>;
    /// `PUT <base>/<id>`, with the id encoded as a single path segment.
    async fn update(&self, id: &ResourceId, body: &Value) -> ApiResult<MutationAck<T>>;
    /// `PATCH <base>/<id>`.
    async fn patch(&self, id: &ResourceId, body: &Value) -> ApiResult<MutationAck<T>>;
    /// `DELETE <base>/<id>`.
    async fn delete(&self, id: &ResourceId) -> ApiResult<MutationAck<T>>;
    /// `POST <base>/bulk-action`.
    async fn bulk_action(&self, request: &BulkActionRequest) -> ApiResult<BulkActionResponse>;
}

/// [`ResourceApi`] over a REST collection such as `users` or `courses`.
pub struct RestResource<T> {
    client: RequestClient,
    base_path: String,
    items_field: String,
    _item: PhantomData<fn() -> T>,
}

impl<T> RestResource<T> {
    /// Resource rooted at `base_path` whose list payload keeps items under
    /// `items_field`.
    #[must_use]
    pub fn new(client: RequestClient, base_path: &str, items_field: &str) -> Self {
        Self {
            client,
            base_path: base_path.trim_matches('/').to_string(),
            items_field: items_field.to_string(),
            _item: PhantomData,
        }
    }

    /// Client used for every call.
    #[must_use]
    pub const fn client(&self) -> &RequestClient {
        &self.client
    }

    /// Collection path without surrounding slashes.
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    fn collection(&self) -> Vec<&str> {
        self.base_path.split('/').filter(|part| !part.is_empty()).collect()
    }

    fn nested<'a>(&'a self, leaf: &'a str) -> Vec<&'a str> {
        let mut segments = self.collection();
        segments.push(leaf);
        segments
    }
}

#[async_trait]
impl<T: ResourceItem> ListSource<T> for RestResource<T> {
    async fn list(&self, query: &ListQuery) -> ApiResult<ListEnvelope<T>> {
        let payload: Value = self.client.get(&self.collection(), &query.to_pairs()).await?;
        ListEnvelope::from_value(payload, &self.items_field).map_err(|err| ApiError::Decode {
            message: err.to_string(),
        })
    }
}

#[async_trait]
impl<T: ResourceItem> ResourceApi<T> for RestResource<T> {
    async fn create(&self, body: &Value) -> ApiResult<MutationAck<T>> {
        self.client.post(&self.collection(), body).await
    }

    async fn update(&self, id: &ResourceId, body: &Value) -> ApiResult<MutationAck<T>> {
        let id = id.to_string();
        self.client.put(&self.nested(&id), body).await
    }

    async fn patch(&self, id: &ResourceId, body: &Value) -> ApiResult<MutationAck<T>> {
        let id = id.to_string();
        self.client.patch(&self.nested(&id), body).await
    }

    async fn delete(&self, id: &ResourceId) -> ApiResult<MutationAck<T>> {
        let id = id.to_string();
        self.client.delete(&self.nested(&id)).await
    }

    async fn bulk_action(&self, request: &BulkActionRequest) -> ApiResult<BulkActionResponse> {
        self.client.post(&self.nested("bulk-action"), request).await
    }
}
