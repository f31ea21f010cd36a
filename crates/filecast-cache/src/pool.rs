//! Database connection pool management
//!
//! Wraps SQLx's SqlitePool with:
//! - Automatic directory creation for the database file
//! - WAL journal mode for concurrent reads
//! - Schema migration on first connection
//! - In-memory mode for testing

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::CacheError;

/// Pool of SQLite connections for Filecast's persisted state
///
/// File-backed pools use up to 4 connections with a 5-second busy timeout.
/// In-memory pools use a single connection, since an in-memory SQLite
/// database lives and dies with its connection.
pub struct DatabasePool {
    pool: SqlitePool,
}

impl DatabasePool {
    /// Open (creating if missing) the database at `db_path` and migrate it.
    ///
    /// # Errors
    ///
    /// `CacheError::ConnectionFailed` if the file cannot be opened,
    /// `CacheError::MigrationFailed` if the schema cannot be applied.
    pub async fn new(db_path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CacheError::ConnectionFailed(format!(
                    "Failed to create state directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| {
                CacheError::ConnectionFailed(format!(
                    "Failed to open state database at {}: {}",
                    db_path.display(),
                    e
                ))
            })?;

        Self::run_migrations(&pool).await?;

        tracing::info!(path = %db_path.display(), "State database opened");

        Ok(Self { pool })
    }

    /// In-memory database for tests
    pub async fn in_memory() -> Result<Self, CacheError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| {
                CacheError::ConnectionFailed(format!("Failed to create in-memory database: {}", e))
            })?;

        Self::run_migrations(&pool).await?;

        tracing::debug!("In-memory state database initialized");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<(), CacheError> {
        sqlx::raw_sql(include_str!("migrations/0001_state.sql"))
            .execute(pool)
            .await
            .map_err(|e| CacheError::MigrationFailed(format!("Failed to create state schema: {}", e)))?;

        tracing::debug!("State schema ready");
        Ok(())
    }
}
