//! Gateway to the remote scores API
//!
//! Every outbound call, single or paginated, drains the shared
//! [`TokenBucketLimiter`] before it is issued, so the gateway is the only
//! path to the remote API. It also normalizes the "entity absent" outcome:
//! callers get [`CallOutcome::Missing`] to branch on instead of an error.

pub mod http;
pub mod remote;

pub use http::HttpScoresApi;
pub use remote::{ApiRequest, Page, PageCursor, RemoteError, ScoresApi};

use crate::limiter::{CapacityError, TokenBucketLimiter};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Default cap on pages fetched by one paginated query. A healthy upstream
/// ends a fetch by returning no cursor; the cap bounds the damage if it
/// keeps handing out fresh cursors instead.
pub const DEFAULT_PAGE_CAP: usize = 200;

/// Hard failures from a gateway call.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The per-call token cost can never be satisfied by the bucket
    #[error(transparent)]
    Capacity(#[from] CapacityError),

    /// The remote call failed (transport, status, or decode)
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// Outcome of a single-entity call.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    /// The entity exists; raw JSON payload
    Value(Value),
    /// The remote reports no such entity — a valid result, not a failure
    Missing,
}

/// All pages of one paginated query, merged.
#[derive(Debug, Clone, Default)]
pub struct CombinedPages {
    /// Items from every fetched page, in page order
    pub items: Vec<Value>,
    /// Sum of the per-page total figures (falls back to item counts)
    pub total: u64,
    /// Soft errors reported by individual pages
    pub page_errors: Vec<String>,
}

/// Rate-limited front door to the remote API.
pub struct Gateway {
    api: Arc<dyn ScoresApi>,
    limiter: Arc<TokenBucketLimiter>,
    page_cap: usize,
}

impl Gateway {
    /// Create a gateway over a remote client and the shared limiter.
    pub fn new(api: Arc<dyn ScoresApi>, limiter: Arc<TokenBucketLimiter>) -> Self {
        Self {
            api,
            limiter,
            page_cap: DEFAULT_PAGE_CAP,
        }
    }

    /// Override the defensive page cap for paginated fetches.
    pub fn with_page_cap(mut self, page_cap: usize) -> Self {
        self.page_cap = page_cap;
        self
    }

    /// Fetch a single entity, spending one token.
    pub async fn call(&self, request: &ApiRequest) -> Result<CallOutcome, GatewayError> {
        self.call_with_cost(request, 1.0).await
    }

    /// Fetch a single entity at an explicit token cost.
    ///
    /// # Errors
    /// [`GatewayError::Capacity`] if `cost` exceeds the bucket capacity
    /// (raised before any network traffic); [`GatewayError::Remote`] on
    /// transport or protocol failure. A remote "not found" is returned as
    /// [`CallOutcome::Missing`], not an error.
    pub async fn call_with_cost(
        &self,
        request: &ApiRequest,
        cost: f64,
    ) -> Result<CallOutcome, GatewayError> {
        self.limiter.acquire(cost).await?;
        match self.api.invoke(request, None).await {
            Ok(page) => match page.items.into_iter().next() {
                Some(value) => Ok(CallOutcome::Value(value)),
                None => Ok(CallOutcome::Missing),
            },
            Err(RemoteError::NotFound) => Ok(CallOutcome::Missing),
            Err(e) => Err(e.into()),
        }
    }

    /// Fetch every page of a cursor-paginated query and merge the results.
    ///
    /// Each page costs one token. The loop ends when the remote returns no
    /// cursor, an empty page, or a page-level error; a repeated cursor or
    /// the page cap also ends it, since either means the cursor has stopped
    /// advancing.
    pub async fn fetch_all_pages(
        &self,
        request: &ApiRequest,
    ) -> Result<CombinedPages, GatewayError> {
        let mut combined = CombinedPages::default();
        let mut cursor: Option<PageCursor> = None;
        let mut pages = 0usize;

        loop {
            self.limiter.acquire(1.0).await?;
            let page = self.api.invoke(request, cursor.as_ref()).await?;
            pages += 1;

            let page_len = page.items.len();
            combined.items.extend(page.items);
            combined.total += page.total.unwrap_or(page_len as u64);

            if let Some(err) = page.error {
                tracing::warn!(
                    path = %request.path,
                    error = %err,
                    "page reported an error, ending fetch"
                );
                combined.page_errors.push(err);
                break;
            }
            if page_len == 0 {
                break;
            }
            match page.next_cursor {
                None => break,
                Some(next) => {
                    if cursor.as_ref() == Some(&next) {
                        tracing::warn!(
                            path = %request.path,
                            cursor = %next,
                            "remote returned the same cursor twice, ending fetch"
                        );
                        break;
                    }
                    cursor = Some(next);
                }
            }
            if pages >= self.page_cap {
                tracing::warn!(
                    path = %request.path,
                    pages,
                    "page cap reached, ending fetch"
                );
                break;
            }
        }

        tracing::debug!(
            path = %request.path,
            pages,
            items = combined.items.len(),
            "paginated fetch finished"
        );
        Ok(combined)
    }
}
