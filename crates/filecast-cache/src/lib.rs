//! Filecast Cache - Content cache and persisted state
//!
//! - [`ContentCache`] - disk-backed store of remote item bytes with a size
//!   limit and least-recently-accessed eviction
//! - [`DatabasePool`] / [`SqliteStateStore`] - SQLite key/value store
//!   implementing the `IStateStore` port
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use filecast_cache::{ContentCache, DatabasePool, SqliteStateStore};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let cache = ContentCache::open(Path::new("/home/user/.cache/filecast"), 512 * 1024 * 1024)?;
//! let pool = DatabasePool::new(Path::new("/home/user/.local/share/filecast/state.db")).await?;
//! let store = SqliteStateStore::new(pool.pool().clone());
//! # Ok(())
//! # }
//! ```

pub mod content;
pub mod pool;
pub mod state_store;

use filecast_core::{ErrorKind, ProviderError};

pub use content::{CacheEntryInfo, ContentCache};
pub use pool::DatabasePool;
pub use state_store::SqliteStateStore;

/// Errors that can occur during cache and state operations
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Filesystem failure while reading or writing cached content
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An entry can never fit within the configured limit
    #[error("Entry of {size} bytes exceeds cache limit of {max} bytes")]
    TooLarge { size: u64, max: u64 },

    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

impl From<sqlx::Error> for CacheError {
    fn from(e: sqlx::Error) -> Self {
        CacheError::QueryFailed(e.to_string())
    }
}

impl From<CacheError> for ProviderError {
    fn from(err: CacheError) -> Self {
        match &err {
            CacheError::Io(io) => ProviderError::new(filecast_core::classify_io(io), err.to_string()),
            CacheError::TooLarge { .. } => ProviderError::new(ErrorKind::FileTooLarge, err.to_string()),
            _ => ProviderError::new(ErrorKind::OperationFailed, err.to_string()),
        }
    }
}
