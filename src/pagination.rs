//! Lazy page sequences over offset/limit and cursor listings.
//!
//! A [`Paginator`] fetches one page per call to [`Paginator::next_page`],
//! strictly in order, with every page going through the same retry and
//! throttling path as a single call. The cursor for the next page is
//! exposed so callers can persist it and resume later.

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::http::{RawResponse, RequestSpec};
use base64::Engine;
use futures::stream::{self, Stream};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Query,
    /// Dotted path into the JSON body, e.g. `settings.cursor.limit`.
    Body,
}

/// How a listing endpoint pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageStyle {
    None,
    OffsetLimit {
        offset_key: String,
        limit_key: String,
        limit: u32,
        placement: Placement,
    },
    Cursor {
        cursor_key: String,
        limit_key: String,
        limit: u32,
        placement: Placement,
        /// Token is a packed JSON object merged at `cursor_key` instead of a plain value.
        packed: bool,
    },
}

impl PageStyle {
    pub fn offset_query(offset_key: &str, limit_key: &str, limit: u32) -> Self {
        PageStyle::OffsetLimit {
            offset_key: offset_key.into(),
            limit_key: limit_key.into(),
            limit,
            placement: Placement::Query,
        }
    }

    pub fn offset_body(offset_key: &str, limit_key: &str, limit: u32) -> Self {
        PageStyle::OffsetLimit {
            offset_key: offset_key.into(),
            limit_key: limit_key.into(),
            limit,
            placement: Placement::Body,
        }
    }

    pub fn cursor_query(cursor_key: &str, limit_key: &str, limit: u32) -> Self {
        PageStyle::Cursor {
            cursor_key: cursor_key.into(),
            limit_key: limit_key.into(),
            limit,
            placement: Placement::Query,
            packed: false,
        }
    }
}

/// Where the next page starts. Serializable so it can be stored and resumed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaginationCursor {
    Offset { offset: u64, limit: u32 },
    Next { token: String },
}

/// What an endpoint-specific extractor pulls out of one response.
#[derive(Debug, Clone, PartialEq)]
pub struct PageBody<T> {
    pub items: Vec<T>,
    /// Server-emitted continuation for cursor listings.
    pub next: Option<String>,
    /// Total result count when the server reports one.
    pub total: Option<u64>,
}

impl<T> PageBody<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            next: None,
            total: None,
        }
    }

    pub fn with_next(mut self, next: Option<String>) -> Self {
        self.next = next;
        self
    }

    pub fn with_total(mut self, total: Option<u64>) -> Self {
        self.total = total;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Cursor this page was fetched with; `None` for the first page of a cursor listing.
    pub cursor: Option<PaginationCursor>,
    /// `None` once the listing is exhausted.
    pub next: Option<PaginationCursor>,
}

pub type Extractor<T> = Arc<dyn Fn(&RawResponse) -> Result<PageBody<T>, ApiError> + Send + Sync>;

pub struct Paginator<T> {
    client: ApiClient,
    spec: RequestSpec,
    extract: Extractor<T>,
    next: Option<PaginationCursor>,
    done: bool,
}

impl<T> Paginator<T> {
    pub(crate) fn new(
        client: ApiClient,
        spec: RequestSpec,
        extract: Extractor<T>,
        start: Option<PaginationCursor>,
    ) -> Self {
        Self {
            client,
            spec,
            extract,
            next: start,
            done: false,
        }
    }

    /// Cursor the next fetch starts from; persist it to resume later.
    pub fn cursor(&self) -> Option<&PaginationCursor> {
        self.next.as_ref()
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Fetches the next page. A failed page leaves the cursor in place, so
    /// calling again retries that same page.
    pub async fn next_page(&mut self) -> Option<Result<Page<T>, ApiError>> {
        if self.done {
            return None;
        }
        let current = self.next.clone();
        let request = match self.spec.for_page(current.as_ref()) {
            Ok(r) => r,
            Err(e) => return Some(Err(e)),
        };
        let body = match self.client.perform(&request).await {
            Ok(raw) => (self.extract)(&raw),
            Err(e) => Err(e),
        };
        let body = match body {
            Ok(b) => b,
            Err(e) => return Some(Err(e)),
        };
        if body.items.is_empty() {
            // The fetch that finds the end yields no page of its own.
            self.done = true;
            self.next = None;
            return None;
        }
        let next = next_cursor(&self.spec.pagination, current.as_ref(), &body);
        debug!(
            "{} {}: page of {} items, next={:?}",
            self.spec.family,
            self.spec.path,
            body.items.len(),
            next
        );
        self.done = next.is_none();
        self.next = next.clone();
        Some(Ok(Page {
            items: body.items,
            cursor: current,
            next,
        }))
    }

    /// Drains the listing into one vector, stopping at the first error.
    pub async fn collect_all(mut self) -> Result<Vec<T>, ApiError> {
        let mut all = Vec::new();
        while let Some(page) = self.next_page().await {
            all.extend(page?.items);
        }
        Ok(all)
    }

    /// The listing as a stream of pages. The stream ends after the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<Page<T>, ApiError>> + Send
    where
        T: Send + 'static,
    {
        stream::unfold(Some(self), |state| async move {
            let mut pager = state?;
            match pager.next_page().await? {
                Ok(page) => Some((Ok(page), Some(pager))),
                Err(e) => Some((Err(e), None)),
            }
        })
    }
}

fn next_cursor<T>(
    style: &PageStyle,
    current: Option<&PaginationCursor>,
    body: &PageBody<T>,
) -> Option<PaginationCursor> {
    let returned = body.items.len();
    match style {
        PageStyle::None => None,
        PageStyle::OffsetLimit { limit, .. } => {
            let (offset, limit) = match current {
                Some(PaginationCursor::Offset { offset, limit }) => (*offset, *limit),
                _ => (0, *limit),
            };
            let reached = offset + returned as u64;
            let exhausted = returned == 0
                || returned < limit as usize
                || body.total.is_some_and(|total| reached >= total);
            (!exhausted).then_some(PaginationCursor::Offset {
                offset: reached,
                limit,
            })
        }
        PageStyle::Cursor { .. } => {
            let token = body.next.as_ref()?;
            // An empty page or a repeated token would loop forever.
            let repeated = matches!(current, Some(PaginationCursor::Next { token: t }) if t == token);
            if returned == 0 || repeated {
                return None;
            }
            Some(PaginationCursor::Next {
                token: token.clone(),
            })
        }
    }
}

/// Packs a composite cursor into an opaque URL-safe token: base64(JSON).
pub fn pack_cursor(fields: &Value) -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(fields.to_string())
}

pub fn unpack_cursor(token: &str) -> Option<Value> {
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(token)
        .ok()?;
    serde_json::from_slice(&bytes).ok()
}
