//! Stored score endpoints

use crate::api::AppContext;
use crate::error::AppError;
use crate::store::StoredScore;
use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

/// All stored scores for one player.
#[derive(Debug, Serialize)]
pub struct PlayerScoresResponse {
    /// Player the rows belong to
    pub player_id: i64,
    /// Number of stored rows
    pub count: u64,
    /// The rows, most recently updated first
    pub scores: Vec<StoredScore>,
}

/// `GET /api/players/{player_id}/scores` — synced rows for one player.
pub async fn get_player_scores(
    State(ctx): State<Arc<AppContext>>,
    Path(player_id): Path<i64>,
) -> Result<Json<PlayerScoresResponse>, AppError> {
    let scores = ctx.store.scores_for_player(player_id).await?;
    Ok(Json(PlayerScoresResponse {
        player_id,
        count: scores.len() as u64,
        scores,
    }))
}
