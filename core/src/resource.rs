//! Generic resource verbs shared by every endpoint wrapper.
//!
//! An endpoint wrapper only knows its paths; `Resource` turns a path and
//! [`Params`] into one executed call with a typed envelope.

use bytes::Bytes;
use serde_json::Value;

use crate::client::ApiClient;
use crate::config::Overrides;
use crate::error::Result;
use crate::http::HttpMethod;
use crate::pagination::List;
use crate::request::{Attachment, RequestOptions};
use crate::types::{DeleteResponse, FromData, ListResponse, Response};

/// Per-call inputs for a resource verb.
#[derive(Debug, Clone, Default)]
pub struct Params {
    pub query: Option<Value>,
    pub body: Option<Value>,
    pub attachments: Vec<Attachment>,
    pub overrides: Option<Overrides>,
}

impl Params {
    pub fn query(mut self, query: Value) -> Self {
        self.query = Some(query);
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn overrides(mut self, overrides: Overrides) -> Self {
        self.overrides = Some(overrides);
        self
    }

    fn into_options(self, method: HttpMethod, path: &str) -> RequestOptions {
        RequestOptions {
            method,
            path: path.to_string(),
            query: self.query,
            body: self.body,
            attachments: self.attachments,
            overrides: self.overrides,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct Resource {
    client: ApiClient,
}

impl Resource {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Paginated GET. Nothing is sent until the returned [`List`] is used.
    pub fn list<T: FromData>(&self, path: &str, params: Params) -> List<T> {
        List::new(self.client.clone(), path, params.query, params.overrides)
    }

    /// Single page GET without cursor following.
    pub async fn list_page<T: FromData>(
        &self,
        path: &str,
        params: Params,
    ) -> Result<ListResponse<T>> {
        let decoded = self
            .client
            .execute(params.into_options(HttpMethod::Get, path))
            .await?;
        ListResponse::from_decoded(decoded, &self.client)
    }

    pub async fn find<T: FromData>(&self, path: &str, params: Params) -> Result<Response<T>> {
        self.item(HttpMethod::Get, path, params).await
    }

    pub async fn create<T: FromData>(&self, path: &str, params: Params) -> Result<Response<T>> {
        self.item(HttpMethod::Post, path, params).await
    }

    /// Full replacement (PUT).
    pub async fn update<T: FromData>(&self, path: &str, params: Params) -> Result<Response<T>> {
        self.item(HttpMethod::Put, path, params).await
    }

    /// Partial update (PATCH).
    pub async fn update_patch<T: FromData>(
        &self,
        path: &str,
        params: Params,
    ) -> Result<Response<T>> {
        self.item(HttpMethod::Patch, path, params).await
    }

    pub async fn destroy(&self, path: &str, params: Params) -> Result<DeleteResponse> {
        let decoded = self
            .client
            .execute(params.into_options(HttpMethod::Delete, path))
            .await?;
        DeleteResponse::from_decoded(decoded)
    }

    /// GET returning the body bytes untouched (file downloads, raw MIME).
    pub async fn get_raw(&self, path: &str, params: Params) -> Result<Bytes> {
        self.client
            .execute_raw(params.into_options(HttpMethod::Get, path))
            .await
    }

    async fn item<T: FromData>(
        &self,
        method: HttpMethod,
        path: &str,
        params: Params,
    ) -> Result<Response<T>> {
        let decoded = self.client.execute(params.into_options(method, path)).await?;
        Response::from_decoded(decoded, &self.client)
    }
}
