//! Wiring of the browsing services from a [`Config`]

use std::sync::Arc;

use tracing::{info, instrument};

use filecast_cache::{CacheError, ContentCache, DatabasePool, SqliteStateStore};
use filecast_core::config::{Config, ValidationError};
use filecast_core::domain::ProviderId;
use filecast_core::ports::{IProviderAdapter, IStateStore};
use filecast_core::ProviderError;
use filecast_providers::{FolderBackend, LocalAdapter, RemoteAdapter};

use crate::monitor::DirectoryMonitor;
use crate::navigation::NavigationState;
use crate::recent::RecentItems;
use crate::router::ProviderRouter;

/// Errors raised while assembling [`Services`]
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Invalid configuration: {}", join_errors(.0))]
    InvalidConfig(Vec<ValidationError>),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Everything a front end needs to browse
pub struct Services {
    pub router: Arc<ProviderRouter>,
    pub monitor: DirectoryMonitor,
    pub recent: Arc<RecentItems>,
    pub cache: Arc<ContentCache>,
}

impl Services {
    /// Build the services, persisting state in the configured SQLite database
    #[instrument(skip(config))]
    pub async fn from_config(config: &Config) -> Result<Self, ServiceError> {
        let pool = DatabasePool::new(&config.state.db_path).await?;
        let store = Arc::new(SqliteStateStore::new(pool.pool().clone()));
        Self::with_state_store(config, store).await
    }

    /// Build the services around an existing state store
    pub async fn with_state_store(
        config: &Config,
        store: Arc<dyn IStateStore>,
    ) -> Result<Self, ServiceError> {
        let errors = config.validate();
        if !errors.is_empty() {
            return Err(ServiceError::InvalidConfig(errors));
        }

        let cache = Arc::new(ContentCache::open(&config.cache.dir, config.cache_max_bytes())?);
        let local: Arc<dyn IProviderAdapter> = Arc::new(LocalAdapter::new(
            &config.local.root,
            config.local.show_hidden,
            config.search_limits(),
        )?);
        let router = Arc::new(ProviderRouter::new(
            local,
            config.local.display_name.clone(),
            Arc::clone(&cache),
            config.probe_timeout(),
        ));

        for remote in &config.remotes {
            let id = ProviderId::new(remote.id.clone()).map_err(ProviderError::from)?;
            let client = Arc::new(FolderBackend::new(&remote.root));
            let adapter = RemoteAdapter::new(
                id.clone(),
                client,
                config.probe_timeout(),
                config.search_limits(),
            )?;
            router
                .register_remote(id, remote.display_name.clone(), Arc::new(adapter))
                .await?;
        }

        let monitor = DirectoryMonitor::new(Arc::clone(&router), config.poll_interval());
        let recent = Arc::new(RecentItems::load(store, config.state.recent_capacity).await?);

        info!(
            remotes = config.remotes.len(),
            cache_dir = %config.cache.dir.display(),
            "Services ready"
        );
        Ok(Self {
            router,
            monitor,
            recent,
            cache,
        })
    }

    /// Fresh browsing state on the local provider, followed by the monitor
    pub fn navigation(&self) -> NavigationState {
        NavigationState::default().with_monitor(self.monitor.clone())
    }
}
