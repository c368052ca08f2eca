//! Remote scores API collaborator interface
//!
//! The gateway talks to the upstream API exclusively through [`ScoresApi`],
//! so tests and alternative transports plug in at this seam. A missing
//! entity is a typed outcome ([`RemoteError::NotFound`]), distinguishable
//! from transport or protocol failures.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Opaque pagination token returned by the remote API.
///
/// `None` in a response signals the end of the result set. Cursors are held
/// only for the duration of one paginated fetch and never persisted.
pub type PageCursor = String;

/// One request to the remote API: endpoint path plus query parameters.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// Path relative to the API base URL, e.g. `/players/7/tracks/42/best`
    pub path: String,
    /// Query parameters (the pagination cursor is appended separately)
    pub params: Vec<(String, String)>,
}

impl ApiRequest {
    /// Request for an arbitrary endpoint path.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            params: Vec::new(),
        }
    }

    /// Append one query parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// A player's best score on one track.
    pub fn best_score(player_id: i64, track_id: i64) -> Self {
        Self::new(format!("/players/{player_id}/tracks/{track_id}/best"))
    }

    /// Player lookup, used for existence checks.
    pub fn player(player_id: i64) -> Self {
        Self::new(format!("/players/{player_id}"))
    }

    /// Cursor-paginated track search.
    pub fn track_search(query: impl Into<String>) -> Self {
        Self::new("/tracks/search").param("q", query)
    }
}

/// One page of a remote response.
///
/// Single-resource endpoints produce a one-item page with no cursor;
/// collection endpoints carry paging fields and may report a soft per-page
/// error inside an otherwise valid response.
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// Raw JSON items on this page
    pub items: Vec<Value>,
    /// Total result count as reported by this page, if any
    pub total: Option<u64>,
    /// Cursor for the next page; `None` ends the fetch
    pub next_cursor: Option<PageCursor>,
    /// Soft error reported by the page itself
    pub error: Option<String>,
}

/// Failures surfaced by the remote API client.
#[derive(Error, Debug)]
pub enum RemoteError {
    /// The queried entity does not exist. Callers branch on this rather
    /// than treating it as a failure.
    #[error("entity not found")]
    NotFound,

    /// Network-level failure reaching the remote API
    #[error("transport failure: {0}")]
    Transport(String),

    /// Remote returned an unexpected HTTP status
    #[error("remote returned status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, for the log trail
        body: String,
    },

    /// Response body could not be decoded
    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// Client for the upstream scores API.
#[async_trait]
pub trait ScoresApi: Send + Sync {
    /// Issue one request, optionally resuming a paginated query at `cursor`.
    async fn invoke(
        &self,
        request: &ApiRequest,
        cursor: Option<&PageCursor>,
    ) -> Result<Page, RemoteError>;
}
