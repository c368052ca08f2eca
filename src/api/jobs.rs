//! Batch job endpoints

use crate::api::{streaming, AppContext};
use crate::error::AppError;
use crate::jobs::manager::{JobProgress, JobRecord, JobState};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Request body for starting a batch sync job.
#[derive(Debug, Deserialize)]
pub struct StartBatchRequest {
    /// Player to sync scores for
    pub player_id: i64,
    /// Tracks to fetch, processed in order
    pub track_ids: Vec<i64>,
}

/// Serialized view of one job.
#[derive(Debug, Serialize)]
pub struct JobResponse {
    /// Job identifier
    pub job_id: String,
    /// Player the batch belongs to
    pub player_id: i64,
    /// Current lifecycle state
    pub state: JobState,
    /// Rows persisted so far
    pub processed: u64,
    /// Items not yet attempted
    pub remaining: u64,
    /// Items in the batch
    pub total: u64,
    /// Unix timestamp of job creation
    pub started_at: i64,
}

impl JobResponse {
    fn from_record(record: &JobRecord) -> Self {
        let JobProgress {
            state,
            processed,
            remaining,
            total,
        } = record.progress();
        Self {
            job_id: record.id.clone(),
            player_id: record.player_id,
            state,
            processed,
            remaining,
            total,
            started_at: record.started_at,
        }
    }
}

/// Response body for a cancel request.
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    /// Job the cancel was aimed at
    pub job_id: String,
    /// Whether the signal was delivered now (false: already finished)
    pub delivered: bool,
}

/// `POST /api/jobs` — start a batch sync job.
pub async fn start_batch(
    State(ctx): State<Arc<AppContext>>,
    Json(request): Json<StartBatchRequest>,
) -> Result<(StatusCode, Json<JobResponse>), AppError> {
    let record = ctx
        .jobs
        .start_batch(request.player_id, request.track_ids)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(JobResponse::from_record(&record))))
}

/// `GET /api/jobs` — all known jobs, newest first.
pub async fn list_jobs(State(ctx): State<Arc<AppContext>>) -> Json<Vec<JobResponse>> {
    let jobs = ctx.jobs.list().await;
    Json(jobs.iter().map(|r| JobResponse::from_record(r)).collect())
}

/// `GET /api/jobs/{id}` — current state and progress of one job.
pub async fn get_job(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
) -> Result<Json<JobResponse>, AppError> {
    let record = ctx
        .jobs
        .get(&id)
        .await
        .ok_or(AppError::JobNotFound(id))?;
    Ok(Json(JobResponse::from_record(&record)))
}

/// `POST /api/jobs/{id}/cancel` — resolve the job's cancel signal.
///
/// The batch observes the signal at its next between-items checkpoint and
/// stops with its partial count intact.
pub async fn cancel_job(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
) -> Result<Json<CancelResponse>, AppError> {
    let delivered = ctx.jobs.cancel(&id).await?;
    Ok(Json(CancelResponse {
        job_id: id,
        delivered,
    }))
}

/// `GET /api/jobs/{id}/events` — SSE stream of progress updates.
pub async fn job_events(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let record = ctx
        .jobs
        .get(&id)
        .await
        .ok_or(AppError::JobNotFound(id))?;
    streaming::progress_sse_response(record.subscribe())
}
