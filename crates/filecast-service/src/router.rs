//! Provider registry and back-end agnostic facade
//!
//! The router owns one adapter per provider, selected when the provider is
//! registered, and forwards every browsing operation to the adapter that
//! owns the item. It adds context (provider, operation) to errors but never
//! changes their kind.
//!
//! The only state kept across calls is the adapter table, the descriptor
//! list, and the per-key fetch locks used by `resolve_local_url`. Current
//! provider and current directory belong to the caller.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use futures_util::future::join_all;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use filecast_cache::{CacheError, ContentCache};
use filecast_core::domain::{
    sort_listing, ContentKey, ContentType, FileItem, ItemId, ProviderDescriptor, ProviderId,
    ProviderKind, ProviderStatus, SortOrder,
};
use filecast_core::ports::{CreateKind, IProviderAdapter, ProbeOutcome};
use filecast_core::{ErrorKind, ProviderError, ProviderResult};

// ============================================================================
// Public types
// ============================================================================

/// A mutation routed to whichever provider owns the affected items
#[derive(Debug, Clone)]
pub enum MutationOp {
    Create {
        provider: ProviderId,
        parent: Option<ItemId>,
        name: String,
        kind: CreateKind,
    },
    Delete {
        item: FileItem,
    },
    Move {
        item: FileItem,
        destination: FileItem,
    },
    Rename {
        item: FileItem,
        new_name: String,
    },
    Copy {
        item: FileItem,
        destination: FileItem,
    },
}

impl MutationOp {
    pub fn name(&self) -> &'static str {
        match self {
            MutationOp::Create { .. } => "create",
            MutationOp::Delete { .. } => "delete",
            MutationOp::Move { .. } => "move",
            MutationOp::Rename { .. } => "rename",
            MutationOp::Copy { .. } => "copy",
        }
    }
}

/// Content cache usage, for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheUsage {
    pub used_bytes: u64,
    pub max_bytes: u64,
    pub entries: usize,
}

// ============================================================================
// ProviderRouter
// ============================================================================

pub struct ProviderRouter {
    adapters: DashMap<ProviderId, Arc<dyn IProviderAdapter>>,
    /// Registration order; the local descriptor is always first
    descriptors: RwLock<Vec<ProviderDescriptor>>,
    cache: Arc<ContentCache>,
    probe_timeout: Duration,
    /// One lock per content key being resolved, so concurrent resolves of
    /// the same item fetch once
    resolving: DashMap<ContentKey, Arc<Mutex<()>>>,
}

impl ProviderRouter {
    pub fn new(
        local: Arc<dyn IProviderAdapter>,
        local_display_name: impl Into<String>,
        cache: Arc<ContentCache>,
        probe_timeout: Duration,
    ) -> Self {
        let adapters = DashMap::new();
        adapters.insert(ProviderId::local(), local);
        Self {
            adapters,
            descriptors: RwLock::new(vec![ProviderDescriptor::local(local_display_name)]),
            cache,
            probe_timeout,
            resolving: DashMap::new(),
        }
    }

    /// Register a remote provider. Its status stays `Unknown` until the
    /// next `list_providers`.
    pub async fn register_remote(
        &self,
        id: ProviderId,
        display_name: impl Into<String>,
        adapter: Arc<dyn IProviderAdapter>,
    ) -> ProviderResult<()> {
        let mut descriptors = self.descriptors.write().await;
        if descriptors.iter().any(|d| d.id == id) {
            return Err(ProviderError::new(
                ErrorKind::AlreadyExists,
                format!("provider {id} is already registered"),
            ));
        }
        self.adapters.insert(id.clone(), adapter);
        descriptors.push(ProviderDescriptor::remote(id.clone(), display_name));
        info!(provider = %id, "Registered remote provider");
        Ok(())
    }

    /// Adapter serving `provider`
    pub fn adapter(&self, provider: &ProviderId) -> ProviderResult<Arc<dyn IProviderAdapter>> {
        self.adapters
            .get(provider)
            .map(|a| Arc::clone(a.value()))
            .ok_or_else(|| {
                ProviderError::new(ErrorKind::ProviderNotFound, format!("no provider {provider}"))
            })
    }

    /// Current descriptors without probing
    pub async fn descriptors(&self) -> Vec<ProviderDescriptor> {
        self.descriptors.read().await.clone()
    }

    /// All providers, local first, with freshly probed remote statuses
    ///
    /// Probes run concurrently and each is bounded by the probe timeout; an
    /// unreachable provider is reported through its status, never as an
    /// error.
    #[instrument(skip(self))]
    pub async fn list_providers(&self) -> Vec<ProviderDescriptor> {
        let remotes: Vec<(ProviderId, Arc<dyn IProviderAdapter>)> = self
            .descriptors
            .read()
            .await
            .iter()
            .filter(|d| d.kind == ProviderKind::Remote)
            .filter_map(|d| self.adapters.get(&d.id).map(|a| (d.id.clone(), Arc::clone(a.value()))))
            .collect();

        let timeout = self.probe_timeout;
        let outcomes = join_all(remotes.into_iter().map(|(id, adapter)| async move {
            let outcome = match tokio::time::timeout(timeout, adapter.probe()).await {
                Ok(outcome) => outcome,
                Err(_) => ProbeOutcome::failed(
                    ProviderStatus::Offline,
                    format!("probe timed out after {timeout:?}"),
                ),
            };
            (id, outcome)
        }))
        .await;

        let mut descriptors = self.descriptors.write().await;
        for (id, outcome) in outcomes {
            let Some(descriptor) = descriptors.iter_mut().find(|d| d.id == id) else {
                continue;
            };
            if outcome.status == ProviderStatus::Available {
                descriptor.last_sync_time = Some(Utc::now());
                descriptor.last_error = None;
            } else {
                warn!(provider = %id, status = %outcome.status, error = ?outcome.error, "Provider probe failed");
                descriptor.last_error = outcome.error;
            }
            descriptor.status = outcome.status;
        }
        descriptors.clone()
    }

    /// Immediate children of `directory` (the root when `None`), directories
    /// first then by name
    #[instrument(skip(self), fields(provider = %provider))]
    pub async fn contents(
        &self,
        directory: Option<&ItemId>,
        provider: &ProviderId,
    ) -> ProviderResult<Vec<FileItem>> {
        let adapter = self.adapter(provider)?;
        let mut items = adapter
            .list(directory)
            .await
            .map_err(|e| e.with_context(provider, "contents"))?;
        sort_listing(&mut items, SortOrder::default());
        debug!(count = items.len(), "Directory contents");
        Ok(items)
    }

    #[instrument(skip(self), fields(provider = %provider))]
    pub async fn get_item(&self, id: &ItemId, provider: &ProviderId) -> ProviderResult<FileItem> {
        self.adapter(provider)?
            .get_item(id)
            .await
            .map_err(|e| e.with_context(provider, "get_item"))
    }

    /// Name search from the provider root
    pub async fn search(
        &self,
        query: &str,
        provider: &ProviderId,
        filter: Option<ContentType>,
    ) -> ProviderResult<Vec<FileItem>> {
        self.search_in(query, provider, None, filter).await
    }

    /// Name search below `root`; an empty query matches nothing
    #[instrument(skip(self), fields(provider = %provider))]
    pub async fn search_in(
        &self,
        query: &str,
        provider: &ProviderId,
        root: Option<&ItemId>,
        filter: Option<ContentType>,
    ) -> ProviderResult<Vec<FileItem>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let mut results = self
            .adapter(provider)?
            .search(query, root, filter)
            .await
            .map_err(|e| e.with_context(provider, "search"))?;
        if let Some(wanted) = filter {
            results.retain(|item| !item.is_directory() && item.content_type() == Some(wanted));
        }
        Ok(results)
    }

    pub async fn create(
        &self,
        provider: &ProviderId,
        parent: Option<&ItemId>,
        name: &str,
        kind: CreateKind,
    ) -> ProviderResult<FileItem> {
        self.adapter(provider)?
            .create(parent, name, kind)
            .await
            .map_err(|e| e.with_context(provider, "create"))
    }

    pub async fn delete(&self, item: &FileItem) -> ProviderResult<()> {
        let provider = item.provider_id();
        self.adapter(provider)?
            .delete(item.id())
            .await
            .map_err(|e| e.with_context(provider, "delete"))?;
        if !provider.is_local() {
            self.cache.remove(&item.key()).await;
        }
        Ok(())
    }

    pub async fn move_item(&self, item: &FileItem, destination: &FileItem) -> ProviderResult<FileItem> {
        let provider = same_provider(item, destination, "move")?;
        self.adapter(provider)?
            .move_item(item.id(), destination.id())
            .await
            .map_err(|e| e.with_context(provider, "move"))
    }

    pub async fn rename(&self, item: &FileItem, new_name: &str) -> ProviderResult<FileItem> {
        let provider = item.provider_id();
        self.adapter(provider)?
            .rename(item.id(), new_name)
            .await
            .map_err(|e| e.with_context(provider, "rename"))
    }

    pub async fn copy(&self, item: &FileItem, destination: &FileItem) -> ProviderResult<FileItem> {
        let provider = same_provider(item, destination, "copy")?;
        self.adapter(provider)?
            .copy(item.id(), destination.id())
            .await
            .map_err(|e| e.with_context(provider, "copy"))
    }

    /// Route a mutation; returns the resulting item when there is one
    #[instrument(skip(self), fields(op = op.name()))]
    pub async fn mutate(&self, op: MutationOp) -> ProviderResult<Option<FileItem>> {
        match op {
            MutationOp::Create {
                provider,
                parent,
                name,
                kind,
            } => self
                .create(&provider, parent.as_ref(), &name, kind)
                .await
                .map(Some),
            MutationOp::Delete { item } => self.delete(&item).await.map(|()| None),
            MutationOp::Move { item, destination } => {
                self.move_item(&item, &destination).await.map(Some)
            }
            MutationOp::Rename { item, new_name } => self.rename(&item, &new_name).await.map(Some),
            MutationOp::Copy { item, destination } => {
                self.copy(&item, &destination).await.map(Some)
            }
        }
    }

    /// Local path holding the item's bytes
    ///
    /// Local items resolve to their own path. Remote items come from the
    /// content cache, or are fetched through the adapter and then admitted
    /// to the cache under `(provider, item)`.
    #[instrument(skip(self, item), fields(provider = %item.provider_id(), item = %item.id()))]
    pub async fn resolve_local_url(&self, item: &FileItem) -> ProviderResult<PathBuf> {
        let provider = item.provider_id();
        if item.is_directory() {
            return Err(ProviderError::new(
                ErrorKind::OperationNotSupported,
                "directories have no content",
            )
            .with_context(provider, "resolve_local_url"));
        }
        let adapter = self.adapter(provider)?;
        if adapter.kind() == ProviderKind::Local {
            return adapter
                .resolve_local_url(item)
                .await
                .map_err(|e| e.with_context(provider, "resolve_local_url"));
        }

        let key = item.key();
        let lock = Arc::clone(self.resolving.entry(key.clone()).or_default().value());
        let result = {
            let _guard = lock.lock().await;
            self.fetch_into_cache(adapter.as_ref(), item, &key).await
        };
        drop(lock);
        self.resolving.remove_if(&key, |_, l| Arc::strong_count(l) == 1);
        result.map_err(|e| e.with_context(provider, "resolve_local_url"))
    }

    /// Resolve `item` and record the path as its local URL hint
    pub async fn hydrate(&self, item: &mut FileItem) -> ProviderResult<PathBuf> {
        let path = self.resolve_local_url(item).await?;
        item.set_local_url_hint(path.clone());
        Ok(path)
    }

    async fn fetch_into_cache(
        &self,
        adapter: &dyn IProviderAdapter,
        item: &FileItem,
        key: &ContentKey,
    ) -> ProviderResult<PathBuf> {
        if let Some(path) = self.cache.get(key).await {
            return Ok(path);
        }

        let fetched = adapter.resolve_local_url(item).await?;
        let size = tokio::fs::metadata(&fetched).await?.len();
        match self.cache.put(key, &fetched, size).await {
            Ok(cached) => {
                info!(bytes = size, "Cached remote content");
                Ok(cached)
            }
            Err(CacheError::TooLarge { size, max }) => {
                warn!(size, max, "Item exceeds cache limit; serving uncached copy");
                Ok(fetched)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn cache_usage(&self) -> CacheUsage {
        CacheUsage {
            used_bytes: self.cache.current_size().await,
            max_bytes: self.cache.max_size().await,
            entries: self.cache.len().await,
        }
    }

    /// Remove every cached item; returns how many were removed
    pub async fn clear_cache(&self) -> usize {
        self.cache.clear().await
    }

    pub async fn set_cache_max_size(&self, bytes: u64) {
        self.cache.set_max_size(bytes).await;
    }
}

/// Cross-provider move/copy is rejected before any adapter is touched
fn same_provider<'a>(
    item: &'a FileItem,
    destination: &FileItem,
    operation: &'static str,
) -> ProviderResult<&'a ProviderId> {
    if item.provider_id() != destination.provider_id() {
        return Err(ProviderError::new(
            ErrorKind::OperationNotSupported,
            format!(
                "cannot {operation} from {} to {}",
                item.provider_id(),
                destination.provider_id()
            ),
        )
        .in_operation(operation));
    }
    Ok(item.provider_id())
}
