//! Server-Sent Events for job progress
//!
//! Follows one job's watch channel and emits each snapshot as an SSE data
//! frame, ending once the job reaches a terminal state.

use crate::error::AppError;
use crate::jobs::manager::{JobProgress, JobState};
use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::Response;
use futures_util::{stream::Stream, StreamExt};
use tokio::sync::watch;

/// Build a `text/event-stream` response following one job to completion.
pub fn progress_sse_response(rx: watch::Receiver<JobProgress>) -> Result<Response, AppError> {
    let sse_stream = progress_stream(rx).map(|progress| {
        let data = serde_json::to_string(&progress).unwrap_or_else(|_| "{}".to_string());
        Ok::<_, std::io::Error>(format!("data: {data}\n\n"))
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .body(Body::from_stream(sse_stream))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to build SSE response: {e}")))
}

/// Current snapshot first, then every change until the job leaves
/// `Running` or the publishing task goes away.
fn progress_stream(mut rx: watch::Receiver<JobProgress>) -> impl Stream<Item = JobProgress> {
    use async_stream::stream;

    stream! {
        loop {
            let progress = rx.borrow_and_update().clone();
            let terminal = progress.state != JobState::Running;
            yield progress;
            if terminal {
                break;
            }
            if rx.changed().await.is_err() {
                break;
            }
        }
    }
}
