//! Score Sync Backend
//!
//! HTTP service that gateways callers onto the rate-limited external scores
//! API and runs cancellable batch sync jobs against it.

use axum::{
    extract::Request,
    middleware::Next,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use score_sync_backend::api::{self, AppContext};
use score_sync_backend::config::Config;
use score_sync_backend::gateway::{Gateway, HttpScoresApi};
use score_sync_backend::jobs::{BatchOrchestrator, JobManager};
use score_sync_backend::limiter::TokenBucketLimiter;
use score_sync_backend::store::{ScoreStore, SqliteScoreStore};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Request ID middleware - adds unique ID to each request for tracing
async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        uri = %uri,
    );

    let response = next.run(request).instrument(span).await;

    info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        status = %response.status().as_u16(),
        duration_ms = start.elapsed().as_millis(),
        "Request completed"
    );

    response
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env();
    info!("Configuration loaded: {:?}", config);

    let store: Arc<dyn ScoreStore> = Arc::new(SqliteScoreStore::new(&config.store.db_path).await?);

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.api.request_timeout_secs))
        .build()?;
    let scores_api = Arc::new(HttpScoresApi::new(http_client, config.api.base_url.clone()));

    let limiter = Arc::new(TokenBucketLimiter::new(
        config.limiter.capacity,
        config.limiter.refill_per_sec,
    ));
    let gateway = Arc::new(Gateway::new(scores_api, limiter).with_page_cap(config.batch.page_cap));

    let orchestrator = Arc::new(
        BatchOrchestrator::new(gateway.clone(), store.clone())
            .with_progress_every(config.batch.progress_every),
    );
    let jobs = Arc::new(JobManager::new(
        orchestrator,
        Duration::from_secs(config.batch.timeout_secs),
    ));

    let ctx = Arc::new(AppContext {
        jobs,
        store,
        gateway,
    });

    let app = Router::new()
        .route("/api/health", get(health_check))
        // Batch job API
        .route(
            "/api/jobs",
            post(api::jobs::start_batch).get(api::jobs::list_jobs),
        )
        .route("/api/jobs/:id", get(api::jobs::get_job))
        .route("/api/jobs/:id/cancel", post(api::jobs::cancel_job))
        .route("/api/jobs/:id/events", get(api::jobs::job_events))
        // Stored score queries
        .route(
            "/api/players/:player_id/scores",
            get(api::scores::get_player_scores),
        )
        // Direct rate-limited queries against the remote API
        .route("/api/tracks/search", get(api::tracks::search_tracks))
        // Middleware (order matters - request_id should be first)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(CorsLayer::permissive())
        .with_state(ctx);

    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid server address: {}", e))?;

    info!("Server running on http://{}", addr);
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Handle graceful shutdown signals (Ctrl+C, SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
