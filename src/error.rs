//! Error types and HTTP error mapping
//!
//! Layer-specific errors (`CapacityError`, `RemoteError`, `StoreError`)
//! flow into [`AppError`] at the HTTP surface, which renders every variant
//! as a consistent JSON body.

use crate::gateway::GatewayError;
use crate::store::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error types surfaced over HTTP.
#[derive(Error, Debug)]
pub enum AppError {
    /// No job with the given id
    #[error("job not found: {0}")]
    JobNotFound(String),

    /// The player already has an active batch; batches per player are
    /// serialized
    #[error("a batch is already running for player {player_id} (job {job_id})")]
    BatchAlreadyRunning {
        /// Player with the active batch
        player_id: i64,
        /// Id of the job already running
        job_id: String,
    },

    /// Malformed or unusable request payload
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A direct gateway call failed
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Score store failure
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Internal server error (catch-all for unexpected errors)
    #[error("internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::JobNotFound(_) => StatusCode::NOT_FOUND,
            AppError::BatchAlreadyRunning { .. } => StatusCode::CONFLICT,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            // A cost above bucket capacity is a configuration bug on our
            // side, not an upstream fault.
            AppError::Gateway(GatewayError::Capacity(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Gateway(_) => StatusCode::BAD_GATEWAY,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
