//! Cursor-following pagination over list endpoints.
//!
//! # Design
//! A list endpoint answers with one page and an opaque `nextCursor`; the
//! only contract is to echo the cursor back as `page_token`. [`Pager`] is
//! the state machine driving that exchange:
//!
//! ```text
//! Start --fetch--> Next(cursor) --fetch--> ... --fetch--> Done
//! ```
//!
//! A fetch with a `limit` keeps requesting `limit - accumulated` more items
//! until the limit is reached or the cursor runs out, and merges the pages
//! into one (latest `requestId` and `nextCursor` win). Once a limited pager
//! has produced `limit` items it is done.
//!
//! [`List`] exposes two independent views over the same request: an eager
//! [`first_page`](List::first_page) with a `next()` handle, and a lazy
//! [`pages`](List::pages) stream that starts over from page one every time
//! it is called. They share no state.
//!
//! The `limit` is read with the same leniency as model numbers: `5`,
//! `5.0` and `"5"` all bound the session. Zero, negative, fractional or
//! non-numeric limits leave it unbounded.

use std::marker::PhantomData;
use std::ops::Deref;

use async_stream::try_stream;
use futures_util::Stream;
use serde_json::{Map, Value};
use tracing::trace;

use crate::attributes::number_from_json;
use crate::client::ApiClient;
use crate::config::Overrides;
use crate::error::Result;
use crate::http::HttpMethod;
use crate::request::RequestOptions;
use crate::types::{FromData, ListResponse};

const LIMIT_KEY: &str = "limit";
const PAGE_TOKEN_KEY: &str = "pageToken";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Cursor {
    Start,
    Next(String),
    Done,
}

/// One pagination session.
#[derive(Debug)]
pub struct Pager<T> {
    client: ApiClient,
    path: String,
    query: Map<String, Value>,
    overrides: Option<Overrides>,
    limit: Option<usize>,
    produced: usize,
    cursor: Cursor,
    page: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T: FromData> Pager<T> {
    fn new(list: &List<T>) -> Self {
        let limit = list.query.get(LIMIT_KEY).and_then(requested_limit);
        Self {
            client: list.client.clone(),
            path: list.path.clone(),
            query: list.query.clone(),
            overrides: list.overrides.clone(),
            limit,
            produced: 0,
            cursor: Cursor::Start,
            page: 0,
            _marker: PhantomData,
        }
    }

    pub fn is_done(&self) -> bool {
        self.cursor == Cursor::Done
    }

    /// Fetch the next (merged) page, or `None` once the cursor is exhausted.
    ///
    /// A failed fetch leaves the pager where it was, so the call can be
    /// repeated.
    pub async fn next_page(&mut self) -> Result<Option<ListResponse<T>>> {
        let token = match &self.cursor {
            Cursor::Start => None,
            Cursor::Next(token) => Some(token.clone()),
            Cursor::Done => return Ok(None),
        };
        let remaining = self.limit.map(|limit| limit.saturating_sub(self.produced));

        let page = self.fetch_list(token, remaining).await?;

        self.page += 1;
        self.produced += page.data.len();
        let limit_reached = self.limit.is_some_and(|limit| self.produced >= limit);
        self.cursor = match &page.next_cursor {
            Some(next) if !limit_reached => Cursor::Next(next.clone()),
            _ => Cursor::Done,
        };
        trace!(
            path = %self.path,
            page = self.page,
            items = page.data.len(),
            done = self.is_done(),
            "fetched page"
        );
        Ok(Some(page))
    }

    /// Fetch from `token`, following cursors until `limit` items are held.
    async fn fetch_list(
        &self,
        token: Option<String>,
        limit: Option<usize>,
    ) -> Result<ListResponse<T>> {
        let mut merged = self.fetch_one(token, limit).await?;
        let Some(limit) = limit else {
            return Ok(merged);
        };
        while merged.data.len() < limit {
            let Some(cursor) = merged.next_cursor.clone() else {
                break;
            };
            let next = self
                .fetch_one(Some(cursor), Some(limit - merged.data.len()))
                .await?;
            merged.data.extend(next.data);
            merged.request_id = next.request_id;
            merged.next_cursor = next.next_cursor;
        }
        Ok(merged)
    }

    async fn fetch_one(
        &self,
        token: Option<String>,
        limit: Option<usize>,
    ) -> Result<ListResponse<T>> {
        let mut query = self.query.clone();
        if let Some(limit) = limit {
            query.insert(LIMIT_KEY.to_string(), Value::from(limit));
        }
        if let Some(token) = token {
            query.insert(PAGE_TOKEN_KEY.to_string(), Value::String(token));
        }
        trace!(path = %self.path, ?limit, "fetching list");
        let options = RequestOptions::new(HttpMethod::Get, self.path.clone())
            .query(Value::Object(query))
            .overrides(self.overrides.clone());
        let decoded = self.client.execute(options).await?;
        ListResponse::from_decoded(decoded, &self.client)
    }
}

/// Positive integral limit from a query value, if there is one.
fn requested_limit(raw: &Value) -> Option<usize> {
    if !matches!(raw, Value::Number(_) | Value::String(_)) {
        return None;
    }
    let n = number_from_json(raw)?;
    if n < 1.0 || n.fract() != 0.0 || n > usize::MAX as f64 {
        return None;
    }
    Some(n as usize)
}

/// A list request that has not been sent yet.
#[derive(Debug, Clone)]
pub struct List<T> {
    client: ApiClient,
    path: String,
    query: Map<String, Value>,
    overrides: Option<Overrides>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: FromData> List<T> {
    /// `query` should be an object; anything else is treated as empty.
    pub fn new(
        client: ApiClient,
        path: impl Into<String>,
        query: Option<Value>,
        overrides: Option<Overrides>,
    ) -> Self {
        let query = match query {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        Self {
            client,
            path: path.into(),
            query,
            overrides,
            _marker: PhantomData,
        }
    }

    /// A fresh session starting at page one.
    pub fn pager(&self) -> Pager<T> {
        Pager::new(self)
    }

    /// Fetch page one now; later pages are fetched through [`Page::next`].
    pub async fn first_page(&self) -> Result<Page<T>> {
        let mut pager = self.pager();
        let current = pager.next_page().await?.unwrap_or(ListResponse {
            request_id: None,
            data: Vec::new(),
            next_cursor: None,
        });
        Ok(Page { current, pager })
    }

    /// Every page, fetched lazily. Each call starts a new session.
    pub fn pages(&self) -> impl Stream<Item = Result<ListResponse<T>>> + Send + 'static {
        let mut pager = self.pager();
        try_stream! {
            while let Some(page) = pager.next_page().await? {
                yield page;
            }
        }
    }

    /// Every item across all pages, fetched lazily.
    pub fn items(&self) -> impl Stream<Item = Result<T>> + Send + 'static {
        let mut pager = self.pager();
        try_stream! {
            while let Some(page) = pager.next_page().await? {
                for item in page.data {
                    yield item;
                }
            }
        }
    }
}

/// Page one of a list, plus the handle to fetch more.
#[derive(Debug)]
pub struct Page<T> {
    current: ListResponse<T>,
    pager: Pager<T>,
}

impl<T: FromData> Page<T> {
    /// Fetch the page after the most recently fetched one.
    pub async fn next(&mut self) -> Result<Option<ListResponse<T>>> {
        self.pager.next_page().await
    }

    pub fn has_more(&self) -> bool {
        !self.pager.is_done()
    }

    pub fn into_inner(self) -> ListResponse<T> {
        self.current
    }
}

impl<T> Deref for Page<T> {
    type Target = ListResponse<T>;

    fn deref(&self) -> &Self::Target {
        &self.current
    }
}
