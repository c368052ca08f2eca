//! Persistent score store
//!
//! Batches persist through the narrow [`ScoreStore`] trait; the production
//! implementation is SQLite via sqlx. The only write operation is an
//! idempotent upsert keyed `(player_id, track_id)`, so re-running a batch
//! overwrites rows instead of duplicating them.

pub mod sqlite;

pub use sqlite::SqliteScoreStore;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Errors from the score store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Underlying database failure
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Filesystem failure while preparing the database
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A payload could not be serialized or deserialized
    #[error("invalid score payload: {0}")]
    InvalidPayload(String),
}

/// One stored best-score row.
#[derive(Debug, Clone, Serialize)]
pub struct StoredScore {
    /// Player the score belongs to
    pub player_id: i64,
    /// Track the score was set on
    pub track_id: i64,
    /// Raw score JSON as fetched from the remote API
    pub payload: Value,
    /// Unix timestamp of the last upsert
    pub updated_at: i64,
}

/// Store collaborator used by the batch orchestrator and the HTTP surface.
#[async_trait]
pub trait ScoreStore: Send + Sync {
    /// Insert or overwrite the row keyed `(player_id, track_id)`.
    ///
    /// The write is a single atomic statement; applying it twice with the
    /// same key leaves one row.
    async fn upsert_score(
        &self,
        player_id: i64,
        track_id: i64,
        payload: &Value,
    ) -> Result<(), StoreError>;

    /// All stored scores for a player, most recently updated first.
    async fn scores_for_player(&self, player_id: i64) -> Result<Vec<StoredScore>, StoreError>;

    /// Number of stored scores for a player.
    async fn count_scores(&self, player_id: i64) -> Result<u64, StoreError>;
}
