//! Track search endpoint
//!
//! Runs a cursor-paginated search against the remote API through the
//! shared gateway, so interactive queries and batch jobs drain the same
//! token bucket.

use crate::api::AppContext;
use crate::error::AppError;
use crate::gateway::ApiRequest;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Query string for a track search.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    /// Search query, e.g. `ranked<2019`
    pub q: String,
}

/// Merged result of a paginated track search.
#[derive(Debug, Serialize)]
pub struct TrackSearchResponse {
    /// Tracks from every fetched page, in page order
    pub items: Vec<Value>,
    /// Total result count as reported by the remote
    pub total: u64,
    /// Soft errors reported by individual pages
    pub page_errors: Vec<String>,
}

/// `GET /api/tracks/search?q=...` — fetch every page of a track search.
pub async fn search_tracks(
    State(ctx): State<Arc<AppContext>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<TrackSearchResponse>, AppError> {
    let combined = ctx
        .gateway
        .fetch_all_pages(&ApiRequest::track_search(params.q))
        .await?;
    Ok(Json(TrackSearchResponse {
        items: combined.items,
        total: combined.total,
        page_errors: combined.page_errors,
    }))
}
