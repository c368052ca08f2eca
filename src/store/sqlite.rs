//! SQLite score store
//!
//! Connection pool plus the embedded schema migration. Timestamps are unix
//! seconds; payloads are stored as the raw JSON text the API returned.

use crate::store::{ScoreStore, StoreError, StoredScore};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, info};

/// sqlx-backed [`ScoreStore`].
pub struct SqliteScoreStore {
    pool: SqlitePool,
}

impl SqliteScoreStore {
    /// Open (creating if missing) the database at `db_path` and run
    /// migrations.
    pub async fn new(db_path: &str) -> Result<Self, StoreError> {
        if let Some(parent) = PathBuf::from(db_path).parent() {
            std::fs::create_dir_all(parent)?;
        }

        let connection_string = if db_path.starts_with("sqlite:") {
            db_path.to_string()
        } else {
            format!("sqlite:{db_path}")
        };

        let options = SqliteConnectOptions::from_str(&connection_string)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        info!("connected to SQLite database at {db_path}");

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        let migration_sql = include_str!("../../migrations/001_create_scores.sql");

        // The migration file holds several statements; strip comments and
        // run them one at a time.
        for statement in migration_sql.split(';') {
            let statement: String = statement
                .lines()
                .map(|line| match line.find("--") {
                    Some(pos) => &line[..pos],
                    None => line,
                })
                .collect::<Vec<_>>()
                .join(" ");
            let statement = statement.trim();
            if statement.is_empty() {
                continue;
            }
            sqlx::query(statement).execute(&self.pool).await?;
        }

        info!("score store migrations completed");
        Ok(())
    }
}

#[async_trait]
impl ScoreStore for SqliteScoreStore {
    async fn upsert_score(
        &self,
        player_id: i64,
        track_id: i64,
        payload: &Value,
    ) -> Result<(), StoreError> {
        let payload_text = serde_json::to_string(payload)
            .map_err(|e| StoreError::InvalidPayload(e.to_string()))?;
        let updated_at = chrono::Utc::now().timestamp();

        sqlx::query(
            "INSERT INTO scores (player_id, track_id, payload, updated_at) \
             VALUES (?, ?, ?, ?) \
             ON CONFLICT(player_id, track_id) \
             DO UPDATE SET payload = excluded.payload, updated_at = excluded.updated_at",
        )
        .bind(player_id)
        .bind(track_id)
        .bind(payload_text)
        .bind(updated_at)
        .execute(&self.pool)
        .await?;

        debug!(player_id, track_id, "upserted score");
        Ok(())
    }

    async fn scores_for_player(&self, player_id: i64) -> Result<Vec<StoredScore>, StoreError> {
        let rows = sqlx::query(
            "SELECT player_id, track_id, payload, updated_at FROM scores \
             WHERE player_id = ? ORDER BY updated_at DESC, track_id ASC",
        )
        .bind(player_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let payload_text: String = row.get("payload");
                let payload = serde_json::from_str(&payload_text)
                    .map_err(|e| StoreError::InvalidPayload(e.to_string()))?;
                Ok(StoredScore {
                    player_id: row.get("player_id"),
                    track_id: row.get("track_id"),
                    payload,
                    updated_at: row.get("updated_at"),
                })
            })
            .collect()
    }

    async fn count_scores(&self, player_id: i64) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM scores WHERE player_id = ?")
            .bind(player_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn temp_store() -> (tempfile::TempDir, SqliteScoreStore) {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("scores.db");
        let store = SqliteScoreStore::new(db_path.to_str().unwrap())
            .await
            .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn upsert_is_idempotent_per_key() {
        let (_dir, store) = temp_store().await;

        store
            .upsert_score(7, 42, &json!({"rank": "B"}))
            .await
            .unwrap();
        store
            .upsert_score(7, 42, &json!({"rank": "S"}))
            .await
            .unwrap();

        assert_eq!(store.count_scores(7).await.unwrap(), 1);
        let scores = store.scores_for_player(7).await.unwrap();
        assert_eq!(scores[0].payload["rank"], "S", "second write must win");
    }

    #[tokio::test]
    async fn rows_are_scoped_per_player() {
        let (_dir, store) = temp_store().await;

        store.upsert_score(7, 1, &json!({"s": 1})).await.unwrap();
        store.upsert_score(7, 2, &json!({"s": 2})).await.unwrap();
        store.upsert_score(8, 1, &json!({"s": 3})).await.unwrap();

        assert_eq!(store.count_scores(7).await.unwrap(), 2);
        assert_eq!(store.count_scores(8).await.unwrap(), 1);
        assert_eq!(store.count_scores(9).await.unwrap(), 0);

        let scores = store.scores_for_player(7).await.unwrap();
        assert_eq!(scores.len(), 2);
        assert!(scores.iter().all(|s| s.player_id == 7));
    }
}
