//! Shared test helpers: a scriptable `IProviderAdapter` and router fixtures

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::mpsc;

use filecast_cache::ContentCache;
use filecast_core::domain::{ContentType, FileItem, ItemId, ProviderId, ProviderKind, ProviderStatus};
use filecast_core::ports::{ChangeHint, CreateKind, IProviderAdapter, ProbeOutcome, WatchHandle};
use filecast_core::{ErrorKind, ProviderError, ProviderResult};
use filecast_service::ProviderRouter;

pub fn id(s: &str) -> ItemId {
    ItemId::new(s).unwrap()
}

pub fn provider(s: &str) -> ProviderId {
    ProviderId::new(s).unwrap()
}

pub fn names(items: &[FileItem]) -> Vec<String> {
    items.iter().map(|i| i.name().to_string()).collect()
}

#[derive(Clone, Copy)]
pub enum Probe {
    Up,
    Down,
    Hang,
}

/// In-memory adapter with a scriptable listing and call counters
pub struct FakeAdapter {
    provider_id: ProviderId,
    kind: ProviderKind,
    listing: Mutex<Result<Vec<FileItem>, ErrorKind>>,
    search_results: Mutex<Vec<FileItem>>,
    probe: Mutex<Probe>,
    fetch_delay: Mutex<Duration>,
    push_hints: bool,
    hint_tx: Mutex<Option<mpsc::Sender<()>>>,
    pub list_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
    pub mutation_calls: AtomicUsize,
    downloads: TempDir,
}

impl FakeAdapter {
    pub fn new(provider_id: ProviderId) -> Self {
        let kind = if provider_id.is_local() {
            ProviderKind::Local
        } else {
            ProviderKind::Remote
        };
        Self {
            provider_id,
            kind,
            listing: Mutex::new(Ok(Vec::new())),
            search_results: Mutex::new(Vec::new()),
            probe: Mutex::new(Probe::Up),
            fetch_delay: Mutex::new(Duration::ZERO),
            push_hints: false,
            hint_tx: Mutex::new(None),
            list_calls: AtomicUsize::new(0),
            search_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
            mutation_calls: AtomicUsize::new(0),
            downloads: tempfile::tempdir().expect("download dir"),
        }
    }

    pub fn local() -> Self {
        Self::new(ProviderId::local())
    }

    pub fn remote(name: &str) -> Self {
        Self::new(provider(name))
    }

    pub fn with_push_hints(mut self) -> Self {
        self.push_hints = true;
        self
    }

    pub fn with_probe(self, probe: Probe) -> Self {
        *self.probe.lock().unwrap() = probe;
        self
    }

    pub fn with_fetch_delay(self, delay: Duration) -> Self {
        *self.fetch_delay.lock().unwrap() = delay;
        self
    }

    pub fn with_search_results(self, results: Vec<FileItem>) -> Self {
        *self.search_results.lock().unwrap() = results;
        self
    }

    pub fn set_listing(&self, items: Vec<FileItem>) {
        *self.listing.lock().unwrap() = Ok(items);
    }

    pub fn fail_listing(&self, kind: ErrorKind) {
        *self.listing.lock().unwrap() = Err(kind);
    }

    /// Send a change hint; returns false if no watcher is attached
    pub fn push_hint(&self) -> bool {
        match self.hint_tx.lock().unwrap().as_ref() {
            Some(tx) => tx.try_send(()).is_ok(),
            None => false,
        }
    }

    pub fn file(&self, name: &str) -> FileItem {
        FileItem::file(self.provider_id.clone(), id(&format!("/{name}")), name).with_size(1)
    }

    pub fn dir(&self, name: &str) -> FileItem {
        FileItem::directory(self.provider_id.clone(), id(&format!("/{name}")), name)
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IProviderAdapter for FakeAdapter {
    fn provider_id(&self) -> &ProviderId {
        &self.provider_id
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn root_id(&self) -> ItemId {
        id("/")
    }

    async fn list(&self, _directory: Option<&ItemId>) -> ProviderResult<Vec<FileItem>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.listing
            .lock()
            .unwrap()
            .clone()
            .map_err(ProviderError::from_kind)
    }

    async fn get_item(&self, item: &ItemId) -> ProviderResult<FileItem> {
        let listing = self.listing.lock().unwrap().clone().map_err(ProviderError::from_kind)?;
        listing
            .into_iter()
            .find(|i| i.id() == item)
            .ok_or_else(|| ProviderError::from_kind(ErrorKind::FileNotFound))
    }

    async fn create(
        &self,
        _parent: Option<&ItemId>,
        name: &str,
        kind: CreateKind,
    ) -> ProviderResult<FileItem> {
        self.mutation_calls.fetch_add(1, Ordering::SeqCst);
        Ok(match kind {
            CreateKind::Directory => self.dir(name),
            CreateKind::File => self.file(name),
        })
    }

    async fn delete(&self, _item: &ItemId) -> ProviderResult<()> {
        self.mutation_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn move_item(&self, _item: &ItemId, _destination: &ItemId) -> ProviderResult<FileItem> {
        self.mutation_calls.fetch_add(1, Ordering::SeqCst);
        Err(ProviderError::not_supported("move"))
    }

    async fn rename(&self, _item: &ItemId, new_name: &str) -> ProviderResult<FileItem> {
        self.mutation_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.file(new_name))
    }

    async fn copy(&self, _item: &ItemId, _destination: &ItemId) -> ProviderResult<FileItem> {
        self.mutation_calls.fetch_add(1, Ordering::SeqCst);
        Err(ProviderError::not_supported("copy"))
    }

    async fn search(
        &self,
        _query: &str,
        _root: Option<&ItemId>,
        _filter: Option<ContentType>,
    ) -> ProviderResult<Vec<FileItem>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.search_results.lock().unwrap().clone())
    }

    /// Writes the item id as the item's bytes
    async fn resolve_local_url(&self, item: &FileItem) -> ProviderResult<PathBuf> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.fetch_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let path = self
            .downloads
            .path()
            .join(item.id().as_str().trim_start_matches('/').replace('/', "_"));
        std::fs::write(&path, item.id().as_str())?;
        Ok(path)
    }

    async fn probe(&self) -> ProbeOutcome {
        let probe = *self.probe.lock().unwrap();
        match probe {
            Probe::Up => ProbeOutcome::available(),
            Probe::Down => ProbeOutcome::failed(ProviderStatus::Offline, "host unreachable"),
            Probe::Hang => std::future::pending().await,
        }
    }

    async fn change_hints(&self, _directory: Option<&ItemId>) -> ProviderResult<Option<ChangeHint>> {
        if !self.push_hints {
            return Ok(None);
        }
        Ok(Some(ChangeHint::channel(|tx| {
            *self.hint_tx.lock().unwrap() = Some(tx);
            WatchHandle::new(|| {})
        })))
    }
}

/// A router whose content cache lives in a temporary directory
pub struct Fixture {
    pub router: Arc<ProviderRouter>,
    pub cache_dir: TempDir,
}

pub fn fixture(local: Arc<dyn IProviderAdapter>) -> Fixture {
    fixture_with_cache(local, 1024 * 1024)
}

pub fn fixture_with_cache(local: Arc<dyn IProviderAdapter>, cache_max_bytes: u64) -> Fixture {
    let cache_dir = tempfile::tempdir().unwrap();
    let cache = Arc::new(ContentCache::open(cache_dir.path(), cache_max_bytes).unwrap());
    let router = Arc::new(ProviderRouter::new(
        local,
        "On My Device",
        cache,
        Duration::from_secs(1),
    ));
    Fixture { router, cache_dir }
}
