//! Local filesystem adapter (secondary/driven adapter)
//!
//! Implements [`IProviderAdapter`] over a directory tree using `tokio::fs`.
//!
//! ## Design Decisions
//!
//! - **Ids are paths**: an item id is the absolute path of the entry. Ids
//!   that resolve outside the configured root are rejected with
//!   `AccessDenied`.
//! - **No overwrite**: `create`, `move_item`, `rename` and `copy` fail with
//!   `AlreadyExists` instead of replacing an existing entry.
//! - **Search order**: pre-order depth-first, directories before files at
//!   each level, names ascending. Bounded by [`SearchLimits`].
//! - **Change hints**: a non-recursive `notify` watcher per directory that
//!   pushes into a capacity-one channel, so a burst becomes one hint.

use std::fs::Metadata;
use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::future::{BoxFuture, FutureExt};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, instrument, warn};

use filecast_core::domain::{
    validate_name, ContentType, FileItem, ItemId, ProviderId, ProviderKind, ProviderStatus,
};
use filecast_core::ports::{
    ChangeHint, CreateKind, IProviderAdapter, ProbeOutcome, SearchLimits, WatchHandle,
};
use filecast_core::{ErrorKind, ProviderError, ProviderResult};

// ============================================================================
// LocalAdapter struct
// ============================================================================

/// Adapter that exposes one directory tree as the `local` provider.
#[derive(Debug, Clone)]
pub struct LocalAdapter {
    provider_id: ProviderId,
    root: PathBuf,
    root_id: ItemId,
    show_hidden: bool,
    limits: SearchLimits,
}

impl LocalAdapter {
    /// Create an adapter rooted at `root`.
    ///
    /// The root is canonicalized when it exists so symlinked roots compare
    /// correctly against item paths.
    ///
    /// # Errors
    /// `UnsupportedFormat` if the root path is not valid UTF-8.
    pub fn new(
        root: impl Into<PathBuf>,
        show_hidden: bool,
        limits: SearchLimits,
    ) -> ProviderResult<Self> {
        let root = root.into();
        let root = std::fs::canonicalize(&root).unwrap_or(root);
        let root_id = item_id_for(&root)?;
        Ok(Self {
            provider_id: ProviderId::local(),
            root,
            root_id,
            show_hidden,
            limits,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map an optional id to a path inside the root
    fn resolve(&self, id: Option<&ItemId>) -> ProviderResult<PathBuf> {
        let Some(id) = id else {
            return Ok(self.root.clone());
        };
        let path = PathBuf::from(id.as_str());
        let escapes = path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::CurDir));
        if !path.is_absolute() || escapes || !path.starts_with(&self.root) {
            return Err(ProviderError::new(
                ErrorKind::AccessDenied,
                format!("{} is outside {}", id, self.root.display()),
            ));
        }
        Ok(path)
    }

    /// Build a `FileItem` for `path` from its (followed) metadata
    fn to_item(&self, path: &Path, metadata: &Metadata) -> ProviderResult<FileItem> {
        let id = item_id_for(path)?;
        let name = if path == self.root {
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "/".to_string())
        } else {
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        };

        let mut item = if metadata.is_dir() {
            FileItem::directory(self.provider_id.clone(), id, name)
        } else {
            FileItem::file(self.provider_id.clone(), id, name).with_size(metadata.len())
        };
        if let Ok(created) = metadata.created() {
            item = item.with_created_at(DateTime::<Utc>::from(created));
        }
        if let Ok(modified) = metadata.modified() {
            item = item.with_modified_at(DateTime::<Utc>::from(modified));
        }
        if path != self.root {
            if let Some(parent) = path.parent() {
                if let Ok(parent_id) = item_id_for(parent) {
                    item = item.with_parent(parent_id);
                }
            }
        }
        Ok(item)
    }

    async fn item_at(&self, path: &Path) -> ProviderResult<FileItem> {
        let metadata = tokio::fs::metadata(path).await?;
        self.to_item(path, &metadata)
    }

    fn is_hidden(name: &str) -> bool {
        name.starts_with('.')
    }

    /// Children of `dir` with followed metadata, hidden entries and broken
    /// links skipped
    async fn read_children(&self, dir: &Path) -> io::Result<Vec<(PathBuf, Metadata)>> {
        let mut children = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if !self.show_hidden && Self::is_hidden(&name.to_string_lossy()) {
                continue;
            }
            let path = entry.path();
            match tokio::fs::metadata(&path).await {
                Ok(metadata) => children.push((path, metadata)),
                Err(e) => debug!(path = %path.display(), error = %e, "Skipping unreadable entry"),
            }
        }
        Ok(children)
    }

    async fn ensure_absent(path: &Path) -> ProviderResult<()> {
        if tokio::fs::try_exists(path).await? {
            return Err(ProviderError::new(
                ErrorKind::AlreadyExists,
                format!("{} already exists", path.display()),
            ));
        }
        Ok(())
    }

    fn ensure_not_root(&self, path: &Path, operation: &'static str) -> ProviderResult<()> {
        if path == self.root {
            return Err(ProviderError::new(
                ErrorKind::AccessDenied,
                "the provider root cannot be changed",
            )
            .in_operation(operation));
        }
        Ok(())
    }

    /// Destination path for moving or copying `source` into `dest_dir`
    async fn target_in(&self, source: &Path, dest_dir: &Path) -> ProviderResult<PathBuf> {
        let dest_meta = tokio::fs::metadata(dest_dir).await?;
        if !dest_meta.is_dir() {
            return Err(ProviderError::new(
                ErrorKind::OperationFailed,
                format!("{} is not a directory", dest_dir.display()),
            ));
        }
        if dest_dir.starts_with(source) {
            return Err(ProviderError::new(
                ErrorKind::OperationFailed,
                "cannot place a directory inside itself",
            ));
        }
        let name = source.file_name().ok_or_else(|| {
            ProviderError::new(ErrorKind::OperationFailed, "source has no file name")
        })?;
        let target = dest_dir.join(name);
        Self::ensure_absent(&target).await?;
        Ok(target)
    }

    fn walk<'a>(
        &'a self,
        dir: PathBuf,
        depth: usize,
        needle: &'a str,
        filter: Option<ContentType>,
        out: &'a mut Vec<FileItem>,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        async move {
            let mut children = match self.read_children(&dir).await {
                Ok(children) => children,
                Err(e) if depth > 0 => {
                    debug!(dir = %dir.display(), error = %e, "Skipping unreadable directory");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };
            children.sort_by(|(a_path, a_meta), (b_path, b_meta)| {
                b_meta
                    .is_dir()
                    .cmp(&a_meta.is_dir())
                    .then_with(|| a_path.file_name().cmp(&b_path.file_name()))
            });

            for (path, metadata) in children {
                if out.len() >= self.limits.max_results {
                    return Ok(());
                }
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_lowercase())
                    .unwrap_or_default();
                if name.contains(needle) {
                    match self.to_item(&path, &metadata) {
                        Ok(item) if matches_filter(&item, filter) => out.push(item),
                        Ok(_) => {}
                        Err(e) => debug!(path = %path.display(), error = %e, "Skipping match"),
                    }
                }
                if metadata.is_dir() && depth + 1 < self.limits.max_depth {
                    self.walk(path, depth + 1, needle, filter, out).await?;
                }
            }
            Ok(())
        }
        .boxed()
    }
}

fn item_id_for(path: &Path) -> ProviderResult<ItemId> {
    let s = path.to_str().ok_or_else(|| {
        ProviderError::new(
            ErrorKind::UnsupportedFormat,
            format!("non UTF-8 path: {}", path.display()),
        )
    })?;
    Ok(ItemId::new(s)?)
}

fn matches_filter(item: &FileItem, filter: Option<ContentType>) -> bool {
    match filter {
        None => true,
        Some(wanted) => !item.is_directory() && item.content_type() == Some(wanted),
    }
}

/// Recursive copy that refuses to overwrite anything
async fn copy_tree(source: &Path, target: &Path) -> io::Result<u64> {
    let mut copied = 0u64;
    let mut pending = vec![(source.to_path_buf(), target.to_path_buf())];
    while let Some((from, to)) = pending.pop() {
        // Links are copied as links, never followed
        let metadata = tokio::fs::symlink_metadata(&from).await?;
        if metadata.is_dir() {
            tokio::fs::create_dir(&to).await?;
            let mut entries = tokio::fs::read_dir(&from).await?;
            while let Some(entry) = entries.next_entry().await? {
                pending.push((entry.path(), to.join(entry.file_name())));
            }
            continue;
        }
        if tokio::fs::symlink_metadata(&to).await.is_ok() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", to.display()),
            ));
        }
        if metadata.file_type().is_symlink() {
            copy_link(&from, &to).await?;
        } else {
            copied += tokio::fs::copy(&from, &to).await?;
        }
    }
    Ok(copied)
}

#[cfg(unix)]
async fn copy_link(from: &Path, to: &Path) -> io::Result<()> {
    let target = tokio::fs::read_link(from).await?;
    tokio::fs::symlink(target, to).await
}

#[cfg(not(unix))]
async fn copy_link(from: &Path, _to: &Path) -> io::Result<()> {
    debug!(path = %from.display(), "Skipping symbolic link");
    Ok(())
}

// ============================================================================
// IProviderAdapter implementation
// ============================================================================

#[async_trait]
impl IProviderAdapter for LocalAdapter {
    fn provider_id(&self) -> &ProviderId {
        &self.provider_id
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Local
    }

    fn root_id(&self) -> ItemId {
        self.root_id.clone()
    }

    #[instrument(skip(self))]
    async fn list(&self, directory: Option<&ItemId>) -> ProviderResult<Vec<FileItem>> {
        let dir = self.resolve(directory)?;
        let metadata = tokio::fs::metadata(&dir).await?;
        if !metadata.is_dir() {
            return Err(ProviderError::new(
                ErrorKind::OperationFailed,
                format!("{} is not a directory", dir.display()),
            ));
        }

        let children = self.read_children(&dir).await?;
        let mut items = Vec::with_capacity(children.len());
        for (path, metadata) in children {
            match self.to_item(&path, &metadata) {
                Ok(item) => items.push(item),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping entry"),
            }
        }
        debug!(count = items.len(), "Listed directory");
        Ok(items)
    }

    #[instrument(skip(self), fields(item = %id))]
    async fn get_item(&self, id: &ItemId) -> ProviderResult<FileItem> {
        let path = self.resolve(Some(id))?;
        self.item_at(&path).await
    }

    #[instrument(skip(self))]
    async fn create(
        &self,
        parent: Option<&ItemId>,
        name: &str,
        kind: CreateKind,
    ) -> ProviderResult<FileItem> {
        validate_name(name)?;
        let path = self.resolve(parent)?.join(name);
        match kind {
            CreateKind::Directory => tokio::fs::create_dir(&path).await?,
            CreateKind::File => {
                tokio::fs::OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .open(&path)
                    .await?;
            }
        }
        info!(path = %path.display(), ?kind, "Created local item");
        self.item_at(&path).await
    }

    #[instrument(skip(self), fields(item = %id))]
    async fn delete(&self, id: &ItemId) -> ProviderResult<()> {
        let path = self.resolve(Some(id))?;
        self.ensure_not_root(&path, "delete")?;
        let metadata = tokio::fs::symlink_metadata(&path).await?;
        if metadata.is_dir() {
            debug!("Removing directory recursively");
            tokio::fs::remove_dir_all(&path).await?;
        } else {
            tokio::fs::remove_file(&path).await?;
        }
        info!(path = %path.display(), "Deleted local item");
        Ok(())
    }

    #[instrument(skip(self), fields(item = %id, destination = %destination))]
    async fn move_item(&self, id: &ItemId, destination: &ItemId) -> ProviderResult<FileItem> {
        let source = self.resolve(Some(id))?;
        self.ensure_not_root(&source, "move")?;
        let dest_dir = self.resolve(Some(destination))?;
        let target = self.target_in(&source, &dest_dir).await?;
        tokio::fs::rename(&source, &target).await?;
        info!(from = %source.display(), to = %target.display(), "Moved local item");
        self.item_at(&target).await
    }

    #[instrument(skip(self), fields(item = %id))]
    async fn rename(&self, id: &ItemId, new_name: &str) -> ProviderResult<FileItem> {
        validate_name(new_name)?;
        let source = self.resolve(Some(id))?;
        self.ensure_not_root(&source, "rename")?;
        let target = source.with_file_name(new_name);
        if target == source {
            return self.item_at(&source).await;
        }
        Self::ensure_absent(&target).await?;
        tokio::fs::rename(&source, &target).await?;
        info!(from = %source.display(), to = %target.display(), "Renamed local item");
        self.item_at(&target).await
    }

    #[instrument(skip(self), fields(item = %id, destination = %destination))]
    async fn copy(&self, id: &ItemId, destination: &ItemId) -> ProviderResult<FileItem> {
        let source = self.resolve(Some(id))?;
        let dest_dir = self.resolve(Some(destination))?;
        let target = self.target_in(&source, &dest_dir).await?;
        let bytes = copy_tree(&source, &target).await?;
        info!(from = %source.display(), to = %target.display(), bytes, "Copied local item");
        self.item_at(&target).await
    }

    #[instrument(skip(self))]
    async fn search(
        &self,
        query: &str,
        root: Option<&ItemId>,
        filter: Option<ContentType>,
    ) -> ProviderResult<Vec<FileItem>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        let start = self.resolve(root)?;
        let mut results = Vec::new();
        self.walk(start, 0, &needle, filter, &mut results).await?;
        debug!(matches = results.len(), "Local search complete");
        Ok(results)
    }

    async fn resolve_local_url(&self, item: &FileItem) -> ProviderResult<PathBuf> {
        let path = self.resolve(Some(item.id()))?;
        if !tokio::fs::try_exists(&path).await? {
            return Err(ProviderError::new(
                ErrorKind::FileNotFound,
                format!("{} no longer exists", path.display()),
            ));
        }
        Ok(path)
    }

    async fn probe(&self) -> ProbeOutcome {
        match tokio::fs::metadata(&self.root).await {
            Ok(m) if m.is_dir() => ProbeOutcome::available(),
            Ok(_) => ProbeOutcome::failed(ProviderStatus::Error, "root is not a directory"),
            Err(e) => ProbeOutcome::failed(ProviderStatus::Error, e.to_string()),
        }
    }

    async fn change_hints(&self, directory: Option<&ItemId>) -> ProviderResult<Option<ChangeHint>> {
        let dir = self.resolve(directory)?;
        let hint = ChangeHint::try_channel(|tx| {
            let mut watcher = RecommendedWatcher::new(
                move |res: Result<notify::Event, notify::Error>| match res {
                    Ok(event) if !matches!(event.kind, EventKind::Access(_)) => {
                        // Full means a hint is already pending
                        let _ = tx.try_send(());
                    }
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "Directory watch error"),
                },
                notify::Config::default(),
            )?;
            watcher.watch(&dir, RecursiveMode::NonRecursive)?;
            debug!(dir = %dir.display(), "Directory watch started");
            Ok::<_, notify::Error>(WatchHandle::new(move || drop(watcher)))
        })
        .map_err(|e| ProviderError::new(ErrorKind::OperationFailed, e.to_string()))?;
        Ok(Some(hint))
    }
}
