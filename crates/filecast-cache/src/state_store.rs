//! SQLite implementation of the `IStateStore` port

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::instrument;

use filecast_core::ports::IStateStore;

use crate::CacheError;

/// Key/value state persisted in the `kv_state` table
#[derive(Clone)]
pub struct SqliteStateStore {
    pool: SqlitePool,
}

impl SqliteStateStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Delete the value under `key`. Returns whether a row was removed.
    pub async fn remove(&self, key: &str) -> Result<bool, CacheError> {
        let result = sqlx::query("DELETE FROM kv_state WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl IStateStore for SqliteStateStore {
    #[instrument(skip(self))]
    async fn load(&self, key: &str) -> anyhow::Result<Option<String>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM kv_state WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(CacheError::from)?;
        Ok(value)
    }

    #[instrument(skip(self, value), fields(len = value.len()))]
    async fn save(&self, key: &str, value: &str) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO kv_state (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(CacheError::from)?;
        Ok(())
    }
}
