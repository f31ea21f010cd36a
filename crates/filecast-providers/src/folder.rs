//! Directory-backed `IBackendClient`
//!
//! Serves a directory tree through opaque, `/`-separated item ids relative
//! to its root (the root itself is `"/"`). Used for the `remotes` listed in
//! the configuration, e.g. a mounted NAS share, and as the reference client
//! for [`RemoteAdapter`](crate::RemoteAdapter).
//!
//! Move and copy are not offered; they fail with status 501, which the
//! adapter surfaces as `OperationNotSupported`.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use futures_util::stream::{self, BoxStream, StreamExt};
use tracing::debug;

use filecast_core::ports::{BackendMutation, IBackendClient, RawRecord};
use filecast_core::BackendStatus;

const ROOT: &str = "/";

/// Back-end client over a local directory
#[derive(Debug, Clone)]
pub struct FolderBackend {
    root: PathBuf,
}

impl FolderBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Filesystem path for an item id
    fn path_of(&self, item: &str) -> anyhow::Result<PathBuf> {
        let relative = Path::new(item.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(BackendStatus::new(403, format!("invalid item id {item}")).into());
        }
        Ok(self.root.join(relative))
    }

    fn child_id(container: &str, name: &str) -> String {
        if container == ROOT || container.is_empty() {
            format!("/{name}")
        } else {
            format!("{}/{name}", container.trim_end_matches('/'))
        }
    }

    fn parent_id(item: &str) -> String {
        match item.trim_end_matches('/').rsplit_once('/') {
            Some(("", _)) | None => ROOT.to_string(),
            Some((parent, _)) => parent.to_string(),
        }
    }

    fn name_of(item: &str) -> String {
        match item.trim_end_matches('/').rsplit('/').next() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => ROOT.to_string(),
        }
    }

    async fn record_at(id: String, name: String, path: &Path) -> anyhow::Result<RawRecord> {
        let metadata = tokio::fs::metadata(path).await?;
        let modified = metadata
            .modified()
            .ok()
            .map(|t| DateTime::<Utc>::from(t).to_rfc3339_opts(SecondsFormat::Millis, true));
        let parent = Self::parent_id(&id);
        let mut record = if metadata.is_dir() {
            RawRecord::folder(id, name)
        } else {
            RawRecord::file(id, name, metadata.len() as i64)
        };
        record.modified = modified;
        record.parent_id = Some(parent);
        Ok(record)
    }

    async fn ensure_absent(path: &Path) -> anyhow::Result<()> {
        if tokio::fs::try_exists(path).await? {
            return Err(BackendStatus::new(409, format!("{} exists", path.display())).into());
        }
        Ok(())
    }
}

#[async_trait]
impl IBackendClient for FolderBackend {
    fn root_container(&self) -> String {
        ROOT.to_string()
    }

    async fn enumerate(
        &self,
        container: &str,
    ) -> anyhow::Result<BoxStream<'static, anyhow::Result<RawRecord>>> {
        let dir = self.path_of(container)?;
        let mut entries = tokio::fs::read_dir(&dir).await?;
        let mut records = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            let id = Self::child_id(container, &name);
            match Self::record_at(id, name, &entry.path()).await {
                Ok(record) => records.push(Ok(record)),
                Err(e) => debug!(path = %entry.path().display(), error = %e, "Skipping entry"),
            }
        }
        debug!(container, count = records.len(), "Enumerated folder");
        Ok(stream::iter(records).boxed())
    }

    async fn record(&self, item: &str) -> anyhow::Result<RawRecord> {
        let path = self.path_of(item)?;
        let id = if item.is_empty() { ROOT } else { item };
        Self::record_at(id.to_string(), Self::name_of(id), &path).await
    }

    async fn fetch_bytes(&self, item: &str) -> anyhow::Result<PathBuf> {
        let path = self.path_of(item)?;
        let metadata = tokio::fs::metadata(&path).await?;
        if metadata.is_dir() {
            return Err(BackendStatus::new(405, "folders have no content").into());
        }
        Ok(path)
    }

    async fn mutate(&self, mutation: &BackendMutation) -> anyhow::Result<Option<RawRecord>> {
        match mutation {
            BackendMutation::CreateFolder { parent, name } => {
                let path = self.path_of(parent)?.join(name);
                tokio::fs::create_dir(&path).await?;
                let id = Self::child_id(parent, name);
                Ok(Some(Self::record_at(id, name.clone(), &path).await?))
            }
            BackendMutation::CreateFile { parent, name } => {
                let path = self.path_of(parent)?.join(name);
                tokio::fs::OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .open(&path)
                    .await?;
                let id = Self::child_id(parent, name);
                Ok(Some(Self::record_at(id, name.clone(), &path).await?))
            }
            BackendMutation::Delete { item } => {
                let path = self.path_of(item)?;
                if path == self.root {
                    return Err(BackendStatus::new(403, "cannot delete the root").into());
                }
                if tokio::fs::metadata(&path).await?.is_dir() {
                    tokio::fs::remove_dir_all(&path).await?;
                } else {
                    tokio::fs::remove_file(&path).await?;
                }
                Ok(None)
            }
            BackendMutation::Rename { item, new_name } => {
                let path = self.path_of(item)?;
                if path == self.root {
                    return Err(BackendStatus::new(403, "cannot rename the root").into());
                }
                let parent = Self::parent_id(item);
                let target = self.path_of(&parent)?.join(new_name);
                Self::ensure_absent(&target).await?;
                tokio::fs::rename(&path, &target).await?;
                let id = Self::child_id(&parent, new_name);
                Ok(Some(Self::record_at(id, new_name.clone(), &target).await?))
            }
            BackendMutation::Move { .. } | BackendMutation::Copy { .. } => Err(BackendStatus::new(
                501,
                format!("{} is not offered by folder back-ends", mutation.name()),
            )
            .into()),
        }
    }

    async fn probe(&self) -> anyhow::Result<bool> {
        Ok(tokio::fs::metadata(&self.root)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false))
    }
}
