//! Batch score sync
//!
//! Drives a player's track list through the gateway one item at a time and
//! upserts every hit. A single bad track never sinks the batch: remote and
//! store failures are logged and skipped. The loop checks its
//! [`CancelNotice`] after every item, so a stop request is honored within
//! one item and never mid-persist.

use crate::gateway::{ApiRequest, CallOutcome, Gateway, GatewayError};
use crate::jobs::cancellable::CancelNotice;
use crate::store::ScoreStore;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Receives periodic `(processed, remaining)` progress reports.
///
/// Implementations must return quickly and must swallow their own failures;
/// progress reporting never aborts a batch.
pub trait ProgressSink: Send + Sync {
    /// `processed` rows persisted so far, `remaining` items not yet
    /// attempted.
    fn report(&self, processed: u64, remaining: u64);
}

/// Sequentially syncs best scores for one player.
pub struct BatchOrchestrator {
    gateway: Arc<Gateway>,
    store: Arc<dyn ScoreStore>,
    progress_every: u64,
}

impl BatchOrchestrator {
    /// Create an orchestrator reporting progress every 100 items.
    pub fn new(gateway: Arc<Gateway>, store: Arc<dyn ScoreStore>) -> Self {
        Self {
            gateway,
            store,
            progress_every: 100,
        }
    }

    /// Override the progress reporting interval (in items).
    pub fn with_progress_every(mut self, progress_every: u64) -> Self {
        assert!(progress_every > 0, "progress interval must be positive");
        self.progress_every = progress_every;
        self
    }

    /// Fetch and persist the player's best score for every track, in order.
    ///
    /// Returns the number of rows persisted. Intended to run as the work
    /// side of [`cancellable::run`](crate::jobs::cancellable::run): when
    /// `notice` is set the loop stops after the item in flight and returns
    /// the count so far — an early stop is a normal return, not an error.
    ///
    /// Re-running the same list converges to the same stored rows; the
    /// store upsert is keyed `(player_id, track_id)`.
    pub async fn process_all(
        &self,
        player_id: i64,
        track_ids: &[i64],
        notice: CancelNotice,
        progress: Arc<dyn ProgressSink>,
    ) -> u64 {
        let total = track_ids.len() as u64;
        let mut persisted = 0u64;
        let mut attempted = 0u64;

        info!(player_id, total, "starting batch score sync");

        for &track_id in track_ids {
            match self
                .gateway
                .call(&ApiRequest::best_score(player_id, track_id))
                .await
            {
                Ok(CallOutcome::Value(payload)) => {
                    match self.store.upsert_score(player_id, track_id, &payload).await {
                        Ok(()) => persisted += 1,
                        Err(e) => {
                            warn!(
                                player_id,
                                track_id,
                                error = %e,
                                "failed to persist score, continuing"
                            );
                        }
                    }
                }
                Ok(CallOutcome::Missing) => {
                    debug!(player_id, track_id, "no score on track, skipping");
                }
                Err(GatewayError::Capacity(e)) => {
                    // Misconfiguration: every remaining call would fail the
                    // same way, so there is nothing to gain by continuing.
                    error!(
                        player_id,
                        error = %e,
                        "call cost exceeds limiter capacity, stopping batch"
                    );
                    break;
                }
                Err(e) => {
                    warn!(
                        player_id,
                        track_id,
                        error = %e,
                        "remote call failed, skipping track"
                    );
                }
            }
            attempted += 1;

            if notice.is_set() {
                info!(
                    player_id,
                    persisted, attempted, total, "stop requested, ending batch early"
                );
                break;
            }
            if attempted % self.progress_every == 0 {
                progress.report(persisted, total - attempted);
            }
        }

        // Final report: cancelled and timed-out runs expose their exact
        // count through the sink, since the outcome itself carries none.
        progress.report(persisted, total - attempted);
        info!(player_id, persisted, total, "batch score sync finished");
        persisted
    }
}
