//! Durable state port
//!
//! A tiny key/value capability for the little state the core persists (the
//! recently accessed items list). Injected so nothing performs hidden global
//! I/O.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

/// Port trait for persisted key/value state
#[async_trait]
pub trait IStateStore: Send + Sync {
    /// Read the value stored under `key`
    async fn load(&self, key: &str) -> anyhow::Result<Option<String>>;

    /// Replace the value stored under `key`
    async fn save(&self, key: &str, value: &str) -> anyhow::Result<()>;
}

/// Process-local store, for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IStateStore for MemoryStateStore {
    async fn load(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn save(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.values
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
