//! HTTP surface
//!
//! Thin axum handlers over the job manager and the score store. The cancel
//! endpoint is the out-of-band stop signal for running batches; the SSE
//! endpoint surfaces their progress.

pub mod jobs;
pub mod scores;
pub mod streaming;
pub mod tracks;

use crate::gateway::Gateway;
use crate::jobs::manager::JobManager;
use crate::store::ScoreStore;
use std::sync::Arc;

/// Shared context handed to every handler.
pub struct AppContext {
    /// Batch job manager
    pub jobs: Arc<JobManager>,
    /// Persistent score store
    pub store: Arc<dyn ScoreStore>,
    /// Rate-limited gateway to the remote API (for direct queries)
    pub gateway: Arc<Gateway>,
}
