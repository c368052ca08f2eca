//! End-to-end batch flow tests
//!
//! Run the real gateway, limiter, orchestrator, and SQLite store together
//! (fakes only at the remote-API seam) and verify the batch semantics:
//! cancellation preserves partial progress and stops writes, replays
//! converge to one row per track, and bad items never sink a batch.

mod common;

use common::{SignalingStore, SyntheticApi};
use score_sync_backend::gateway::Gateway;
use score_sync_backend::jobs::{run, BatchOrchestrator, CancelNotice, ProgressSink, RunOutcome};
use score_sync_backend::limiter::TokenBucketLimiter;
use score_sync_backend::store::{ScoreStore, SqliteScoreStore};
use std::future::pending;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

/// Remembers only the most recent progress report.
struct LastReport(Mutex<(u64, u64)>);

impl LastReport {
    fn new() -> Arc<Self> {
        Arc::new(Self(Mutex::new((0, 0))))
    }

    fn get(&self) -> (u64, u64) {
        *self.0.lock().unwrap()
    }
}

impl ProgressSink for LastReport {
    fn report(&self, processed: u64, remaining: u64) {
        *self.0.lock().unwrap() = (processed, remaining);
    }
}

/// A limiter big enough that these tests never wait on it.
fn open_limiter() -> Arc<TokenBucketLimiter> {
    Arc::new(TokenBucketLimiter::new(1_000_000.0, 1_000_000.0))
}

async fn sqlite_store(dir: &tempfile::TempDir) -> Arc<SqliteScoreStore> {
    let path = dir.path().join("scores.db");
    Arc::new(
        SqliteScoreStore::new(path.to_str().unwrap())
            .await
            .unwrap(),
    )
}

#[tokio::test]
async fn cancellation_keeps_partial_progress_and_stops_writes() {
    let dir = tempfile::tempdir().unwrap();
    let sqlite = sqlite_store(&dir).await;

    // The cancel signal resolves the moment the 250th row is persisted.
    let (cancel_tx, cancel_rx) = oneshot::channel();
    let store = Arc::new(SignalingStore::new(sqlite.clone(), 250, cancel_tx));

    let api = Arc::new(SyntheticApi::instant());
    let gateway = Arc::new(Gateway::new(api, open_limiter()));
    let orchestrator = BatchOrchestrator::new(gateway, store.clone());

    let tracks: Vec<i64> = (1..=1000).collect();
    let notice = CancelNotice::new();
    let sink = LastReport::new();

    let outcome = run(
        orchestrator.process_all(7, &tracks, notice.clone(), sink.clone()),
        async move {
            let _ = cancel_rx.await;
        },
        Duration::from_secs(600),
        notice,
    )
    .await;

    assert_eq!(outcome, RunOutcome::Cancelled);
    assert_eq!(
        store.upserts(),
        250,
        "no store writes may happen after the stop is observed"
    );
    assert_eq!(sqlite.count_scores(7).await.unwrap(), 250);
    assert_eq!(sink.get(), (250, 750), "final report carries the exact count");
}

#[tokio::test]
async fn replay_after_partial_run_converges_to_one_row_per_track() {
    let dir = tempfile::tempdir().unwrap();
    let store = sqlite_store(&dir).await;

    let api = Arc::new(SyntheticApi::instant());
    let gateway = Arc::new(Gateway::new(api.clone(), open_limiter()));
    let orchestrator = BatchOrchestrator::new(gateway, store.clone());

    let tracks: Vec<i64> = (1..=1000).collect();

    // A partial run, as left behind by a cancellation.
    let first = orchestrator
        .process_all(7, &tracks[..250], CancelNotice::new(), LastReport::new())
        .await;
    assert_eq!(first, 250);

    // The resumed run re-attempts everything; upsert keeps it convergent.
    let second = orchestrator
        .process_all(7, &tracks, CancelNotice::new(), LastReport::new())
        .await;
    assert_eq!(second, 1000);
    assert_eq!(store.count_scores(7).await.unwrap(), 1000);

    // Replaying costs rate-limit budget but never duplicates rows.
    assert_eq!(api.calls(), 1250);
    let third = orchestrator
        .process_all(7, &tracks, CancelNotice::new(), LastReport::new())
        .await;
    assert_eq!(third, 1000);
    assert_eq!(store.count_scores(7).await.unwrap(), 1000);
}

#[tokio::test]
async fn bad_items_do_not_sink_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let store = sqlite_store(&dir).await;

    let mut api = SyntheticApi::instant();
    api.missing.extend([3, 4]);
    api.failing.insert(10);

    let gateway = Arc::new(Gateway::new(Arc::new(api), open_limiter()));
    let orchestrator = BatchOrchestrator::new(gateway, store.clone());

    let tracks: Vec<i64> = (1..=20).collect();
    let notice = CancelNotice::new();
    let outcome = run(
        orchestrator.process_all(7, &tracks, notice.clone(), LastReport::new()),
        pending(),
        Duration::from_secs(600),
        notice,
    )
    .await;

    assert_eq!(outcome, RunOutcome::Completed(17));
    assert_eq!(store.count_scores(7).await.unwrap(), 17);

    let rows = store.scores_for_player(7).await.unwrap();
    assert!(rows.iter().all(|r| ![3, 4, 10].contains(&r.track_id)));
}
