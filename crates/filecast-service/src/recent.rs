//! Recently accessed items
//!
//! A bounded, most-recent-first list of `FileItem`s persisted as a JSON array
//! under one key of an injected [`IStateStore`]. Elements are decoded one by
//! one so a single unreadable entry (written by an older or newer build)
//! costs that entry only.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use filecast_core::domain::{FileItem, ItemId, ProviderId};
use filecast_core::ports::IStateStore;
use filecast_core::{ErrorKind, ProviderError, ProviderResult};

/// Key the list is stored under
pub const RECENT_FILES_KEY: &str = "recentFiles";

/// Default number of entries kept
pub const DEFAULT_RECENT_CAPACITY: usize = 10;

pub struct RecentItems {
    store: Arc<dyn IStateStore>,
    capacity: usize,
    items: Mutex<Vec<FileItem>>,
}

impl RecentItems {
    /// Read the persisted list
    ///
    /// A missing or unparsable value starts an empty list; individual
    /// entries that fail to decode are skipped.
    pub async fn load(store: Arc<dyn IStateStore>, capacity: usize) -> ProviderResult<Self> {
        let raw = store.load(RECENT_FILES_KEY).await.map_err(|e| {
            ProviderError::new(ErrorKind::OperationFailed, format!("{e:#}"))
                .in_operation("load_recent")
        })?;
        let mut items = raw.map(|raw| decode(&raw)).unwrap_or_default();
        dedup(&mut items);
        items.truncate(capacity);
        debug!(count = items.len(), "Loaded recent items");
        Ok(Self {
            store,
            capacity,
            items: Mutex::new(items),
        })
    }

    /// Snapshot, most recent first
    pub async fn items(&self) -> Vec<FileItem> {
        self.items.lock().await.clone()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Move `item` to the front and persist
    pub async fn record(&self, item: &FileItem) -> ProviderResult<()> {
        let mut items = self.items.lock().await;
        items.retain(|existing| existing != item);
        let mut entry = item.clone();
        entry.set_loading(false);
        items.insert(0, entry);
        items.truncate(self.capacity);
        self.persist(&items).await
    }

    /// Forget one item; returns whether it was present
    pub async fn remove(&self, provider: &ProviderId, id: &ItemId) -> ProviderResult<bool> {
        let mut items = self.items.lock().await;
        let before = items.len();
        items.retain(|existing| !(existing.provider_id() == provider && existing.id() == id));
        if items.len() == before {
            return Ok(false);
        }
        self.persist(&items).await?;
        Ok(true)
    }

    pub async fn clear(&self) -> ProviderResult<()> {
        let mut items = self.items.lock().await;
        items.clear();
        self.persist(&items).await
    }

    async fn persist(&self, items: &[FileItem]) -> ProviderResult<()> {
        let encoded = serde_json::to_string(items)
            .map_err(|e| ProviderError::new(ErrorKind::Corrupted, e.to_string()))?;
        self.store
            .save(RECENT_FILES_KEY, &encoded)
            .await
            .map_err(|e| {
                ProviderError::new(ErrorKind::OperationFailed, format!("{e:#}"))
                    .in_operation("save_recent")
            })
    }
}

fn decode(raw: &str) -> Vec<FileItem> {
    let values: Vec<serde_json::Value> = match serde_json::from_str(raw) {
        Ok(values) => values,
        Err(e) => {
            warn!(error = %e, "Recent items are not a JSON array; starting empty");
            return Vec::new();
        }
    };
    values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value::<FileItem>(value) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!(index, error = %e, "Skipping unreadable recent item");
                None
            }
        })
        .collect()
}

/// Keep the first occurrence of each (provider, id)
fn dedup(items: &mut Vec<FileItem>) {
    let mut seen = std::collections::HashSet::new();
    items.retain(|item| seen.insert(item.key()));
}
