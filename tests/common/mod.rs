//! Shared fixtures for integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use score_sync_backend::gateway::remote::{ApiRequest, Page, PageCursor, RemoteError, ScoresApi};
use score_sync_backend::store::{ScoreStore, StoreError, StoredScore};
use serde_json::{json, Value};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

/// Extract the track id from a best-score request path.
pub fn track_id_of(request: &ApiRequest) -> i64 {
    // Path shape: /players/{player}/tracks/{track}/best
    request
        .path
        .split('/')
        .nth(4)
        .and_then(|s| s.parse().ok())
        .expect("unexpected request path shape")
}

/// Synthetic scores API: every track has a score unless listed as missing
/// or failing; optionally answers after a fixed delay.
pub struct SyntheticApi {
    /// Simulated network latency per call
    pub delay: Duration,
    /// Tracks that report "no score" (soft miss)
    pub missing: HashSet<i64>,
    /// Tracks that fail with a transport error
    pub failing: HashSet<i64>,
    /// Scripted responses for the track search endpoint, one per page
    pub search_pages: Mutex<VecDeque<Page>>,
    calls: AtomicU64,
}

impl SyntheticApi {
    pub fn instant() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            missing: HashSet::new(),
            failing: HashSet::new(),
            search_pages: Mutex::new(VecDeque::new()),
            calls: AtomicU64::new(0),
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScoresApi for SyntheticApi {
    async fn invoke(
        &self,
        request: &ApiRequest,
        _cursor: Option<&PageCursor>,
    ) -> Result<Page, RemoteError> {
        if self.delay > Duration::ZERO {
            tokio::time::sleep(self.delay).await;
        }
        self.calls.fetch_add(1, Ordering::SeqCst);

        if request.path == "/tracks/search" {
            return Ok(self
                .search_pages
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_default());
        }

        let track_id = track_id_of(request);
        if self.missing.contains(&track_id) {
            return Err(RemoteError::NotFound);
        }
        if self.failing.contains(&track_id) {
            return Err(RemoteError::Transport("synthetic outage".to_string()));
        }
        Ok(Page {
            items: vec![json!({
                "track_id": track_id,
                "rank": "A",
                "score": 100_000 + track_id,
            })],
            ..Default::default()
        })
    }
}

/// Store wrapper that counts upserts and fires a oneshot once the Nth
/// upsert has completed, then yields so the signal is observed before the
/// batch loop reaches its next checkpoint.
pub struct SignalingStore {
    inner: Arc<dyn ScoreStore>,
    upserts: AtomicU64,
    fire_at: u64,
    signal: Mutex<Option<oneshot::Sender<()>>>,
}

impl SignalingStore {
    pub fn new(inner: Arc<dyn ScoreStore>, fire_at: u64, signal: oneshot::Sender<()>) -> Self {
        Self {
            inner,
            upserts: AtomicU64::new(0),
            fire_at,
            signal: Mutex::new(Some(signal)),
        }
    }

    pub fn upserts(&self) -> u64 {
        self.upserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScoreStore for SignalingStore {
    async fn upsert_score(
        &self,
        player_id: i64,
        track_id: i64,
        payload: &Value,
    ) -> Result<(), StoreError> {
        self.inner.upsert_score(player_id, track_id, payload).await?;
        let done = self.upserts.fetch_add(1, Ordering::SeqCst) + 1;
        if done == self.fire_at {
            if let Some(tx) = self.signal.lock().unwrap().take() {
                let _ = tx.send(());
            }
            tokio::task::yield_now().await;
        }
        Ok(())
    }

    async fn scores_for_player(&self, player_id: i64) -> Result<Vec<StoredScore>, StoreError> {
        self.inner.scores_for_player(player_id).await
    }

    async fn count_scores(&self, player_id: i64) -> Result<u64, StoreError> {
        self.inner.count_scores(player_id).await
    }
}
