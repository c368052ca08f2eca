//! Batch job manager
//!
//! Owns every batch job for the process lifetime: spawns the cancellable
//! run task, publishes progress on a watch channel, and holds the oneshot
//! cancel handle that the HTTP cancel endpoint resolves. Also enforces the
//! one-active-batch-per-player rule the orchestrator itself assumes.
//!
//! Job records are in-memory only; a restart forgets jobs but keeps every
//! row they already persisted.

use crate::error::AppError;
use crate::jobs::batch::{BatchOrchestrator, ProgressSink};
use crate::jobs::cancellable::{run, CancelNotice, RunOutcome};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch, Mutex, RwLock};
use tracing::info;
use uuid::Uuid;

/// Unique identifier for a batch job
pub type JobId = String;

/// Lifecycle state of a batch job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// The batch loop is still driving items
    Running,
    /// The batch drove every item to the end
    Completed,
    /// An out-of-band cancel request stopped the batch
    Cancelled,
    /// The wall-clock budget ran out
    TimedOut,
}

/// Progress snapshot published on a job's watch channel.
#[derive(Debug, Clone, Serialize)]
pub struct JobProgress {
    /// Current lifecycle state
    pub state: JobState,
    /// Rows persisted so far
    pub processed: u64,
    /// Items not yet attempted
    pub remaining: u64,
    /// Items in the batch
    pub total: u64,
}

/// One batch job owned by the manager.
#[derive(Debug)]
pub struct JobRecord {
    /// Job identifier
    pub id: JobId,
    /// Player the batch belongs to
    pub player_id: i64,
    /// Items in the batch
    pub total: u64,
    /// Unix timestamp of job creation
    pub started_at: i64,
    cancel: Mutex<Option<oneshot::Sender<()>>>,
    progress: watch::Receiver<JobProgress>,
}

impl JobRecord {
    /// Latest progress snapshot.
    pub fn progress(&self) -> JobProgress {
        self.progress.borrow().clone()
    }

    /// Subscribe to progress updates (for the SSE stream).
    pub fn subscribe(&self) -> watch::Receiver<JobProgress> {
        self.progress.clone()
    }
}

/// Publishes batch progress into the job's watch channel.
struct WatchSink {
    total: u64,
    tx: watch::Sender<JobProgress>,
}

impl ProgressSink for WatchSink {
    fn report(&self, processed: u64, remaining: u64) {
        // No receivers is fine; progress must never fail the batch.
        let _ = self.tx.send(JobProgress {
            state: JobState::Running,
            processed,
            remaining,
            total: self.total,
        });
    }
}

/// Creates, tracks, and cancels batch jobs.
pub struct JobManager {
    orchestrator: Arc<BatchOrchestrator>,
    jobs: RwLock<HashMap<JobId, Arc<JobRecord>>>,
    batch_timeout: Duration,
}

impl JobManager {
    /// Create a manager driving batches through `orchestrator`, each bounded
    /// by `batch_timeout`.
    pub fn new(orchestrator: Arc<BatchOrchestrator>, batch_timeout: Duration) -> Self {
        Self {
            orchestrator,
            jobs: RwLock::new(HashMap::new()),
            batch_timeout,
        }
    }

    /// Start a batch syncing `track_ids` for `player_id`.
    ///
    /// # Errors
    /// `AppError::InvalidRequest` for an empty track list;
    /// `AppError::BatchAlreadyRunning` if the player already has an active
    /// job (batches for one player are serialized here, not deduplicated
    /// downstream).
    pub async fn start_batch(
        &self,
        player_id: i64,
        track_ids: Vec<i64>,
    ) -> Result<Arc<JobRecord>, AppError> {
        if track_ids.is_empty() {
            return Err(AppError::InvalidRequest(
                "track list must not be empty".to_string(),
            ));
        }

        let mut jobs = self.jobs.write().await;
        if let Some(active) = jobs
            .values()
            .find(|job| job.player_id == player_id && job.progress().state == JobState::Running)
        {
            return Err(AppError::BatchAlreadyRunning {
                player_id,
                job_id: active.id.clone(),
            });
        }

        let total = track_ids.len() as u64;
        let id: JobId = Uuid::new_v4().to_string();
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let (progress_tx, progress_rx) = watch::channel(JobProgress {
            state: JobState::Running,
            processed: 0,
            remaining: total,
            total,
        });

        let record = Arc::new(JobRecord {
            id: id.clone(),
            player_id,
            total,
            started_at: chrono::Utc::now().timestamp(),
            cancel: Mutex::new(Some(cancel_tx)),
            progress: progress_rx,
        });
        jobs.insert(id.clone(), record.clone());
        drop(jobs);

        info!(job_id = %id, player_id, total, "starting batch job");

        let orchestrator = self.orchestrator.clone();
        let notice = CancelNotice::new();
        let work_notice = notice.clone();
        let sink: Arc<dyn ProgressSink> = Arc::new(WatchSink {
            total,
            tx: progress_tx.clone(),
        });
        let timeout = self.batch_timeout;
        let job_id = id;

        tokio::spawn(async move {
            let work = orchestrator.process_all(player_id, &track_ids, work_notice, sink);
            let cancel = async move {
                let _ = cancel_rx.await;
            };

            let outcome = run(work, cancel, timeout, notice).await;

            let state = match outcome {
                RunOutcome::Completed(_) => JobState::Completed,
                RunOutcome::Cancelled => JobState::Cancelled,
                RunOutcome::TimedOut => JobState::TimedOut,
            };
            // The batch emitted its final counts on the way out; only the
            // state flips here.
            let last = progress_tx.borrow().clone();
            info!(
                job_id = %job_id,
                player_id,
                processed = last.processed,
                total = last.total,
                state = ?state,
                "batch job finished"
            );
            let _ = progress_tx.send(JobProgress { state, ..last });
        });

        Ok(record)
    }

    /// Look up a job by id.
    pub async fn get(&self, id: &str) -> Option<Arc<JobRecord>> {
        self.jobs.read().await.get(id).cloned()
    }

    /// All known jobs, newest first.
    pub async fn list(&self) -> Vec<Arc<JobRecord>> {
        let mut jobs: Vec<_> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by_key(|job| std::cmp::Reverse(job.started_at));
        jobs
    }

    /// Resolve the job's cancel signal.
    ///
    /// Returns `true` if the signal was delivered now, `false` if the job
    /// had already finished or was already cancelled.
    ///
    /// # Errors
    /// `AppError::JobNotFound` for an unknown id.
    pub async fn cancel(&self, id: &str) -> Result<bool, AppError> {
        let record = self
            .get(id)
            .await
            .ok_or_else(|| AppError::JobNotFound(id.to_string()))?;

        let sender = record.cancel.lock().await.take();
        match sender {
            Some(tx) => {
                info!(job_id = %id, "cancel requested");
                Ok(tx.send(()).is_ok())
            }
            None => Ok(false),
        }
    }
}
