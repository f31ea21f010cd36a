//! Directory change monitor
//!
//! Shared, polling-based watches on directory listings.
//!
//! ## Lifecycle per directory key
//!
//! ```text
//!   subscribe (0 → 1)        subscribe / unsubscribe (n > 0)      last unsubscribe
//!  Unwatched ─────────► Watching ◄──────────────────────────► Watching ─────────► Unwatched
//!                           │
//!                           └── poll fails: terminal error published, watch removed
//! ```
//!
//! One tokio task per watched key polls `ProviderRouter::contents` at a fixed
//! interval and publishes through a `watch` channel that every subscriber of
//! the key reads from. Push hints from the adapter and manual
//! [`DirectoryMonitor::notify_changed`] calls only wake the task early; they
//! carry no data.
//!
//! The subscriber table is a `DashMap`, so the count and lifecycle of one key
//! are serialized by its shard lock while different keys proceed in
//! parallel. No table lock is held across a poll.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::{watch, Notify};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use filecast_core::domain::{listings_differ, FileItem, ItemId, ProviderId};
use filecast_core::ports::{ChangeHint, IProviderAdapter};
use filecast_core::{ProviderError, ProviderResult};

use crate::router::ProviderRouter;

/// Default polling interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// A published listing, shared by every subscriber of a key
pub type Listing = Arc<Vec<FileItem>>;

/// Provider plus directory (`None` is the provider root)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DirectoryKey {
    pub provider: ProviderId,
    pub directory: Option<ItemId>,
}

impl DirectoryKey {
    pub fn new(provider: ProviderId, directory: Option<ItemId>) -> Self {
        Self {
            provider,
            directory,
        }
    }
}

impl std::fmt::Display for DirectoryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.directory {
            Some(dir) => write!(f, "{}:{}", self.provider, dir),
            None => write!(f, "{}:<root>", self.provider),
        }
    }
}

#[derive(Debug, Clone)]
enum WatchState {
    Pending,
    Listing(Listing),
    Failed(ProviderError),
}

struct WatchEntry {
    subscribers: usize,
    generation: u64,
    tx: Arc<watch::Sender<WatchState>>,
    cancel: CancellationToken,
    poke: Arc<Notify>,
}

struct MonitorInner {
    router: Arc<ProviderRouter>,
    poll_interval: Duration,
    watches: DashMap<DirectoryKey, WatchEntry>,
    generations: AtomicU64,
}

impl MonitorInner {
    /// Drop one subscriber of `key`; the last one stops the watch
    fn release(&self, key: &DirectoryKey, generation: u64) {
        if let Entry::Occupied(mut occupied) = self.watches.entry(key.clone()) {
            // A newer watch replaced the one this subscriber belonged to
            if occupied.get().generation != generation {
                return;
            }
            let entry = occupied.get_mut();
            entry.subscribers = entry.subscribers.saturating_sub(1);
            if entry.subscribers == 0 {
                let entry = occupied.remove();
                entry.cancel.cancel();
                info!(key = %key, "Directory watch stopped");
            }
        }
    }

    /// Remove a failed watch, unless it has already been replaced
    fn retire(&self, key: &DirectoryKey, generation: u64) {
        self.watches
            .remove_if(key, |_, entry| entry.generation == generation);
    }
}

// ============================================================================
// DirectoryMonitor
// ============================================================================

/// Multiplexes directory subscriptions onto one poll per directory
#[derive(Clone)]
pub struct DirectoryMonitor {
    inner: Arc<MonitorInner>,
}

impl std::fmt::Debug for DirectoryMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryMonitor")
            .field("poll_interval", &self.inner.poll_interval)
            .field("active_watches", &self.inner.watches.len())
            .finish()
    }
}

impl DirectoryMonitor {
    pub fn new(router: Arc<ProviderRouter>, poll_interval: Duration) -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                router,
                poll_interval,
                watches: DashMap::new(),
                generations: AtomicU64::new(0),
            }),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.inner.poll_interval
    }

    /// Attach to the listing of `directory`, starting a watch if this is the
    /// first subscriber
    ///
    /// # Errors
    /// `ProviderNotFound` if the provider is not registered. Poll failures
    /// are delivered through the subscription instead.
    pub fn subscribe(
        &self,
        provider: &ProviderId,
        directory: Option<&ItemId>,
    ) -> ProviderResult<DirectorySubscription> {
        let adapter = self.inner.router.adapter(provider)?;
        let key = DirectoryKey::new(provider.clone(), directory.cloned());

        let (rx, generation) = match self.inner.watches.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                entry.subscribers += 1;
                debug!(key = %key, subscribers = entry.subscribers, "Joined directory watch");
                (entry.tx.subscribe(), entry.generation)
            }
            Entry::Vacant(vacant) => {
                let generation = self.inner.generations.fetch_add(1, Ordering::Relaxed) + 1;
                let (tx, rx) = watch::channel(WatchState::Pending);
                let tx = Arc::new(tx);
                let cancel = CancellationToken::new();
                let poke = Arc::new(Notify::new());

                let task = PollTask {
                    inner: Arc::clone(&self.inner),
                    key: key.clone(),
                    generation,
                    tx: Arc::clone(&tx),
                    cancel: cancel.clone(),
                    poke: Arc::clone(&poke),
                };
                tokio::spawn(task.run(adapter));

                vacant.insert(WatchEntry {
                    subscribers: 1,
                    generation,
                    tx,
                    cancel,
                    poke,
                });
                info!(key = %key, interval = ?self.inner.poll_interval, "Directory watch started");
                (rx, generation)
            }
        };

        Ok(DirectorySubscription {
            key,
            generation,
            rx,
            inner: Arc::clone(&self.inner),
            primed: false,
            finished: false,
            attached: true,
        })
    }

    /// Ask the watch on `directory` (if any) to poll now
    pub fn notify_changed(&self, provider: &ProviderId, directory: Option<&ItemId>) {
        let key = DirectoryKey::new(provider.clone(), directory.cloned());
        if let Some(entry) = self.inner.watches.get(&key) {
            entry.poke.notify_one();
        }
    }

    /// Number of directories currently polled
    pub fn active_watches(&self) -> usize {
        self.inner.watches.len()
    }

    /// Subscribers attached to `directory`
    pub fn subscriber_count(&self, provider: &ProviderId, directory: Option<&ItemId>) -> usize {
        let key = DirectoryKey::new(provider.clone(), directory.cloned());
        self.inner
            .watches
            .get(&key)
            .map(|entry| entry.subscribers)
            .unwrap_or(0)
    }
}

// ============================================================================
// Poll task
// ============================================================================

enum Wake {
    Cancelled,
    Tick,
    Hint,
    HintsClosed,
    Poke,
}

struct PollTask {
    inner: Arc<MonitorInner>,
    key: DirectoryKey,
    generation: u64,
    tx: Arc<watch::Sender<WatchState>>,
    cancel: CancellationToken,
    poke: Arc<Notify>,
}

async fn next_hint(hints: &mut Option<ChangeHint>) -> Option<()> {
    match hints {
        Some(hint) => hint.receiver.recv().await,
        None => std::future::pending().await,
    }
}

impl PollTask {
    async fn run(self, adapter: Arc<dyn IProviderAdapter>) {
        let mut hints = match adapter.change_hints(self.key.directory.as_ref()).await {
            Ok(hints) => hints,
            Err(e) => {
                debug!(key = %self.key, error = %e, "No change hints; polling only");
                None
            }
        };
        drop(adapter);

        let mut ticker = tokio::time::interval(self.inner.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last: Option<Listing> = None;

        loop {
            let wake = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Wake::Cancelled,
                _ = ticker.tick() => Wake::Tick,
                hint = next_hint(&mut hints) => match hint {
                    Some(()) => Wake::Hint,
                    None => Wake::HintsClosed,
                },
                _ = self.poke.notified() => Wake::Poke,
            };
            match wake {
                Wake::Cancelled => break,
                Wake::HintsClosed => {
                    debug!(key = %self.key, "Change hints ended");
                    hints = None;
                    continue;
                }
                Wake::Hint | Wake::Poke => {
                    debug!(key = %self.key, "Polling early");
                    ticker.reset();
                }
                Wake::Tick => {}
            }

            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                result = self.inner.router.contents(self.key.directory.as_ref(), &self.key.provider) => result,
            };

            match result {
                Ok(items) => {
                    let changed = last
                        .as_ref()
                        .map_or(true, |previous| listings_differ(previous, &items));
                    if changed {
                        let listing = Arc::new(items);
                        last = Some(Arc::clone(&listing));
                        self.tx.send_replace(WatchState::Listing(listing));
                    }
                }
                Err(e) => {
                    error!(key = %self.key, error = %e, "Directory poll failed; ending watch");
                    self.inner.retire(&self.key, self.generation);
                    self.tx.send_replace(WatchState::Failed(e));
                    break;
                }
            }
        }
        debug!(key = %self.key, "Poll task exited");
    }
}

// ============================================================================
// DirectorySubscription
// ============================================================================

/// One subscriber's view of a shared directory watch
///
/// Dropping the subscription unsubscribes it.
pub struct DirectorySubscription {
    key: DirectoryKey,
    generation: u64,
    rx: watch::Receiver<WatchState>,
    inner: Arc<MonitorInner>,
    /// Whether the value current at subscribe time has been considered
    primed: bool,
    finished: bool,
    attached: bool,
}

impl DirectorySubscription {
    pub fn key(&self) -> &DirectoryKey {
        &self.key
    }

    /// Wait for the next listing
    ///
    /// Yields `Some(Err(..))` once if the watch fails, then `None`.
    pub async fn next(&mut self) -> Option<Result<Listing, ProviderError>> {
        if self.finished {
            return None;
        }
        if !self.primed {
            self.primed = true;
            let current = self.rx.borrow_and_update().clone();
            if let Some(delivery) = self.deliver(current) {
                return Some(delivery);
            }
        }
        loop {
            // Unseen values are still reported as changes after the watch ends
            if self.rx.changed().await.is_err() {
                self.finished = true;
                return None;
            }
            let current = self.rx.borrow_and_update().clone();
            if let Some(delivery) = self.deliver(current) {
                return Some(delivery);
            }
        }
    }

    fn deliver(&mut self, state: WatchState) -> Option<Result<Listing, ProviderError>> {
        match state {
            WatchState::Pending => None,
            WatchState::Listing(listing) => Some(Ok(listing)),
            WatchState::Failed(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }

    /// The most recent listing, without waiting
    pub fn latest(&self) -> Option<Listing> {
        match &*self.rx.borrow() {
            WatchState::Listing(listing) => Some(Arc::clone(listing)),
            _ => None,
        }
    }

    /// Detach from the watch; the last subscriber stops the poll
    pub fn unsubscribe(mut self) {
        self.detach();
    }

    fn detach(&mut self) {
        if std::mem::take(&mut self.attached) {
            self.inner.release(&self.key, self.generation);
        }
    }
}

impl Drop for DirectorySubscription {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for DirectorySubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectorySubscription")
            .field("key", &self.key)
            .field("generation", &self.generation)
            .field("finished", &self.finished)
            .finish()
    }
}
