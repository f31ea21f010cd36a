//! Content cache for bytes of remote items.
//!
//! Uses a hash-based directory structure for storage and keeps an in-memory
//! index for size accounting and least-recently-accessed eviction.
//!
//! ## Layout
//!
//! `{cache_dir}/content/{first_2_chars_of_hash}/{rest_of_hash}`, where the
//! hash is the SHA-256 of the [`ContentKey`]. In-flight copies land in
//! `{path}.{uuid}.partial` and are renamed into place, so an entry is either
//! fully present or absent.
//!
//! ## Eviction
//!
//! Before an entry is admitted, entries are evicted in ascending order of
//! last access until the new one fits. Last access is a monotonic logical
//! tick: every insert and every `get` takes the next tick, so two entries
//! never compare equal and insertion order breaks wall-clock ties. Entry
//! mtimes are touched on access so the order survives a restart.
//!
//! ## Locking
//!
//! ```text
//!  get / contains / entries ──► read lock  (concurrent; tick bump is atomic)
//!  put / remove / clear /   ──► write lock (serialized; excludes readers
//!  set_max_size                              during an eviction sweep)
//! ```
//!
//! `put` copies the source bytes before taking the write lock.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use filecast_core::domain::ContentKey;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::CacheError;

const PARTIAL_SUFFIX: &str = ".partial";

// ============================================================================
// Index
// ============================================================================

struct CacheEntry {
    /// `None` for entries recovered from disk at open time
    key: Option<ContentKey>,
    path: PathBuf,
    size_bytes: u64,
    last_tick: AtomicU64,
    last_accessed_ms: AtomicI64,
}

impl CacheEntry {
    fn new(key: Option<ContentKey>, path: PathBuf, size_bytes: u64, tick: u64, accessed_ms: i64) -> Self {
        Self {
            key,
            path,
            size_bytes,
            last_tick: AtomicU64::new(tick),
            last_accessed_ms: AtomicI64::new(accessed_ms),
        }
    }

    fn touch(&self, tick: u64) {
        self.last_tick.fetch_max(tick, Ordering::AcqRel);
        self.last_accessed_ms
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    fn info(&self) -> CacheEntryInfo {
        CacheEntryInfo {
            key: self.key.as_ref().map(|k| k.as_str().to_string()),
            path: self.path.clone(),
            size_bytes: self.size_bytes,
            last_accessed_at: DateTime::from_timestamp_millis(
                self.last_accessed_ms.load(Ordering::Relaxed),
            )
            .unwrap_or_default(),
        }
    }
}

/// Snapshot of one cache entry, for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntryInfo {
    /// Content key, when known (entries recovered at open only know their hash)
    pub key: Option<String>,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub last_accessed_at: DateTime<Utc>,
}

struct CacheIndex {
    entries: HashMap<String, CacheEntry>,
    total_bytes: u64,
    max_bytes: u64,
}

impl CacheIndex {
    fn insert(&mut self, hash: String, entry: CacheEntry) {
        self.total_bytes = self.total_bytes.saturating_add(entry.size_bytes);
        if let Some(old) = self.entries.insert(hash, entry) {
            self.total_bytes = self.total_bytes.saturating_sub(old.size_bytes);
        }
    }

    fn remove(&mut self, hash: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(hash)?;
        self.total_bytes = self.total_bytes.saturating_sub(entry.size_bytes);
        Some(entry)
    }

    fn fits(&self, incoming: u64) -> bool {
        self.total_bytes.saturating_add(incoming) <= self.max_bytes
    }

    /// Remove oldest-accessed entries until `incoming` more bytes fit
    fn evict_for(&mut self, incoming: u64) -> Vec<CacheEntry> {
        if self.fits(incoming) {
            return Vec::new();
        }

        let mut order: Vec<(u64, String)> = self
            .entries
            .iter()
            .map(|(hash, e)| (e.last_tick.load(Ordering::Acquire), hash.clone()))
            .collect();
        order.sort_unstable();

        let mut evicted = Vec::new();
        for (_, hash) in order {
            if self.fits(incoming) {
                break;
            }
            if let Some(entry) = self.remove(&hash) {
                evicted.push(entry);
            }
        }
        evicted
    }
}

// ============================================================================
// ContentCache
// ============================================================================

/// Manages cached item content on disk within a size limit.
pub struct ContentCache {
    content_dir: PathBuf,
    index: RwLock<CacheIndex>,
    clock: AtomicU64,
}

impl ContentCache {
    /// Open (or create) a cache rooted at `cache_dir`.
    ///
    /// Rebuilds the index from files already on disk, deletes leftover
    /// `.partial` files, and trims to `max_bytes` if the limit shrank since
    /// the last run.
    pub fn open(cache_dir: &Path, max_bytes: u64) -> Result<Self, CacheError> {
        let content_dir = cache_dir.join("content");
        fs::create_dir_all(&content_dir)?;

        let mut found = scan_content_dir(&content_dir)?;
        // Oldest mtime first; path order breaks ties deterministically
        found.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.path.cmp(&b.path)));

        let mut index = CacheIndex {
            entries: HashMap::with_capacity(found.len()),
            total_bytes: 0,
            max_bytes,
        };
        let mut tick = 0u64;
        for file in found {
            tick += 1;
            let accessed_ms = file
                .modified
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as i64)
                .unwrap_or_default();
            index.insert(
                file.hash,
                CacheEntry::new(None, file.path, file.size, tick, accessed_ms),
            );
        }

        for victim in index.evict_for(0) {
            if let Err(e) = fs::remove_file(&victim.path) {
                warn!(path = %victim.path.display(), error = %e, "Failed to evict cached file");
            }
        }

        info!(
            dir = %content_dir.display(),
            entries = index.entries.len(),
            used_bytes = index.total_bytes,
            max_bytes,
            "Content cache opened"
        );

        Ok(Self {
            content_dir,
            index: RwLock::new(index),
            clock: AtomicU64::new(tick),
        })
    }

    /// Compute the cache path for a content key using SHA-256 hash.
    pub fn cache_path(&self, key: &ContentKey) -> PathBuf {
        self.path_for_hash(&hash_key(key))
    }

    /// Path of a cached entry, refreshing its last access.
    ///
    /// Absence is not an error. An indexed entry whose file disappeared is
    /// dropped and reported absent.
    pub async fn get(&self, key: &ContentKey) -> Option<PathBuf> {
        let hash = hash_key(key);
        let (path, observed) = {
            let index = self.index.read().await;
            let entry = index.entries.get(&hash)?;
            (entry.path.clone(), entry.last_tick.load(Ordering::Acquire))
        };

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            {
                let index = self.index.read().await;
                // Evicted or cleared while the existence check ran
                index.entries.get(&hash)?.touch(self.next_tick());
            }
            touch_mtime(&path).await;
            debug!(key = %key, "Cache hit");
            return Some(path);
        }

        if self.drop_vanished(&hash, observed).await {
            warn!(key = %key, "Cached file vanished; dropped entry");
        }
        None
    }

    /// Drop the entry for `hash` if it is still the one last seen at
    /// `observed`; a concurrent `put` re-creating the key keeps its entry.
    async fn drop_vanished(&self, hash: &str, observed: u64) -> bool {
        let mut index = self.index.write().await;
        let unchanged = index
            .entries
            .get(hash)
            .is_some_and(|entry| entry.last_tick.load(Ordering::Acquire) == observed);
        if unchanged {
            index.remove(hash);
        }
        unchanged
    }

    /// Whether an entry exists, without counting as an access.
    pub async fn contains(&self, key: &ContentKey) -> bool {
        self.index.read().await.entries.contains_key(&hash_key(key))
    }

    /// Copy `source` into the cache under `key` and return the cached path.
    ///
    /// Evicts oldest-accessed entries first if the new entry would exceed
    /// the limit. An entry larger than the whole limit is rejected with
    /// [`CacheError::TooLarge`] and nothing is evicted.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn put(
        &self,
        key: &ContentKey,
        source: &Path,
        size_bytes: u64,
    ) -> Result<PathBuf, CacheError> {
        let max = self.max_size().await;
        if size_bytes > max {
            return Err(CacheError::TooLarge {
                size: size_bytes,
                max,
            });
        }

        let hash = hash_key(key);
        let final_path = self.path_for_hash(&hash);
        if let Some(parent) = final_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let partial = partial_path(&final_path);
        let copied = match tokio::fs::copy(source, &partial).await {
            Ok(n) => n,
            Err(e) => {
                discard(&partial).await;
                return Err(e.into());
            }
        };
        if copied != size_bytes {
            debug!(declared = size_bytes, copied, "Declared size differs from copied size");
        }
        // Read-only sources would leave an entry whose mtime can't be touched
        if let Err(e) = make_owner_writable(&partial).await {
            discard(&partial).await;
            return Err(e.into());
        }

        let mut index = self.index.write().await;
        if copied > index.max_bytes {
            let max = index.max_bytes;
            drop(index);
            discard(&partial).await;
            return Err(CacheError::TooLarge { size: copied, max });
        }

        if index.remove(&hash).is_some() {
            debug!("Replacing existing cache entry");
        }

        let evicted = index.evict_for(copied);
        for victim in &evicted {
            remove_logged(&victim.path).await;
        }
        if !evicted.is_empty() {
            info!(
                evicted = evicted.len(),
                freed_bytes = evicted.iter().map(|e| e.size_bytes).sum::<u64>(),
                "Evicted least recently accessed entries"
            );
        }

        if let Err(e) = tokio::fs::rename(&partial, &final_path).await {
            discard(&partial).await;
            return Err(e.into());
        }

        let tick = self.next_tick();
        index.insert(
            hash,
            CacheEntry::new(
                Some(key.clone()),
                final_path.clone(),
                copied,
                tick,
                Utc::now().timestamp_millis(),
            ),
        );
        debug!(bytes = copied, used_bytes = index.total_bytes, "Cached content");

        Ok(final_path)
    }

    /// Remove one entry. Returns whether it was present.
    pub async fn remove(&self, key: &ContentKey) -> bool {
        let mut index = self.index.write().await;
        match index.remove(&hash_key(key)) {
            Some(entry) => {
                remove_logged(&entry.path).await;
                true
            }
            None => false,
        }
    }

    /// Remove every entry. Succeeds on an empty cache.
    ///
    /// Only indexed files are deleted; a concurrent `put` still copying into
    /// its `.partial` file completes afterwards and re-creates its entry.
    pub async fn clear(&self) -> usize {
        let mut index = self.index.write().await;
        let entries: Vec<CacheEntry> = index.entries.drain().map(|(_, e)| e).collect();
        index.total_bytes = 0;
        for entry in &entries {
            remove_logged(&entry.path).await;
        }
        info!(removed = entries.len(), "Content cache cleared");
        entries.len()
    }

    /// Sum of entry sizes in bytes.
    pub async fn current_size(&self) -> u64 {
        self.index.read().await.total_bytes
    }

    pub async fn max_size(&self) -> u64 {
        self.index.read().await.max_bytes
    }

    /// Change the limit; shrinking runs an eviction sweep immediately.
    pub async fn set_max_size(&self, max_bytes: u64) {
        let mut index = self.index.write().await;
        index.max_bytes = max_bytes;
        let evicted = index.evict_for(0);
        for victim in &evicted {
            remove_logged(&victim.path).await;
        }
        info!(max_bytes, evicted = evicted.len(), "Cache limit changed");
    }

    pub async fn len(&self) -> usize {
        self.index.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Entries ordered from least to most recently accessed.
    pub async fn entries(&self) -> Vec<CacheEntryInfo> {
        let index = self.index.read().await;
        let mut entries: Vec<(u64, CacheEntryInfo)> = index
            .entries
            .values()
            .map(|e| (e.last_tick.load(Ordering::Acquire), e.info()))
            .collect();
        entries.sort_by_key(|(tick, _)| *tick);
        entries.into_iter().map(|(_, info)| info).collect()
    }

    fn next_tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn path_for_hash(&self, hash: &str) -> PathBuf {
        let (prefix, rest) = hash.split_at(2);
        self.content_dir.join(prefix).join(rest)
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn hash_key(key: &ContentKey) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_str().as_bytes());
    format!("{:x}", hasher.finalize())
}

fn partial_path(final_path: &Path) -> PathBuf {
    let mut name = final_path.as_os_str().to_owned();
    name.push(format!(".{}{}", uuid::Uuid::new_v4().simple(), PARTIAL_SUFFIX));
    PathBuf::from(name)
}

async fn discard(path: &Path) {
    let _ = tokio::fs::remove_file(path).await;
}

async fn remove_logged(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Failed to remove cached file");
        }
    }
}

/// Record an access in the file mtime, which orders entries after a restart
async fn touch_mtime(path: &Path) {
    let target = path.to_path_buf();
    let result = tokio::task::spawn_blocking(move || {
        fs::File::options()
            .write(true)
            .open(&target)
            .and_then(|f| f.set_modified(SystemTime::now()))
    })
    .await
    .map_err(std::io::Error::other)
    .and_then(|r| r);
    if let Err(e) = result {
        warn!(path = %path.display(), error = %e, "Could not refresh cache file mtime");
    }
}

#[cfg(unix)]
async fn make_owner_writable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = tokio::fs::metadata(path).await?.permissions();
    let mode = permissions.mode();
    if mode & 0o200 == 0 {
        permissions.set_mode(mode | 0o200);
        tokio::fs::set_permissions(path, permissions).await?;
    }
    Ok(())
}

#[cfg(not(unix))]
async fn make_owner_writable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

struct ScannedFile {
    hash: String,
    path: PathBuf,
    size: u64,
    modified: SystemTime,
}

fn scan_content_dir(content_dir: &Path) -> Result<Vec<ScannedFile>, CacheError> {
    let mut found = Vec::new();
    for prefix_entry in fs::read_dir(content_dir)? {
        let prefix_entry = prefix_entry?;
        if !prefix_entry.file_type()?.is_dir() {
            continue;
        }
        let prefix = prefix_entry.file_name().to_string_lossy().to_string();
        for file in fs::read_dir(prefix_entry.path())? {
            let file = file?;
            let name = file.file_name().to_string_lossy().to_string();
            let path = file.path();
            if name.ends_with(PARTIAL_SUFFIX) {
                debug!(path = %path.display(), "Removing stale partial file");
                let _ = fs::remove_file(&path);
                continue;
            }
            let metadata = file.metadata()?;
            if !metadata.is_file() {
                continue;
            }
            found.push(ScannedFile {
                hash: format!("{prefix}{name}"),
                path,
                size: metadata.len(),
                modified: metadata.modified().unwrap_or(UNIX_EPOCH),
            });
        }
    }
    Ok(found)
}
