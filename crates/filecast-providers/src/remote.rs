//! Remote provider adapter
//!
//! Drives an injected [`IBackendClient`] and translates its loosely typed
//! [`RawRecord`]s into [`FileItem`]s. The adapter never knows the wire
//! protocol; every native failure is classified here, once.
//!
//! ## Listing semantics
//!
//! ```text
//!  enumerate(container) ──► Ok(record)  ──► translate ──► Ok(item)  → kept
//!                                                    └──► Err(..)   → warn!, skipped
//!                      ──► Err(native) ──► classify   → listing fails
//! ```

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use tracing::{debug, info, instrument, warn};

use filecast_core::domain::{
    validate_name, ContentType, DomainError, FileItem, ItemId, ProviderId, ProviderKind,
    ProviderStatus,
};
use filecast_core::ports::{
    BackendMutation, CreateKind, IBackendClient, IProviderAdapter, ProbeOutcome, RawRecord,
    SearchLimits,
};
use filecast_core::{classify, ErrorKind, ProviderError, ProviderResult};

// ============================================================================
// Record translation
// ============================================================================

/// Why a raw record could not become a `FileItem`
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("record has no {0}")]
    MissingField(&'static str),

    #[error("unknown record kind: {0}")]
    UnknownKind(String),

    #[error("negative size: {0}")]
    NegativeSize(i64),

    #[error("unparsable {field} timestamp: {value}")]
    BadTimestamp { field: &'static str, value: String },

    #[error(transparent)]
    InvalidId(#[from] DomainError),
}

fn parse_timestamp(
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<DateTime<Utc>>, RecordError> {
    value
        .map(|v| {
            DateTime::parse_from_rfc3339(v)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|_| RecordError::BadTimestamp {
                    field,
                    value: v.to_string(),
                })
        })
        .transpose()
}

/// Translate one back-end record owned by `provider`
///
/// `container` is used as the parent when the record does not name one.
pub fn translate_record(
    provider: &ProviderId,
    record: &RawRecord,
    container: Option<&str>,
) -> Result<FileItem, RecordError> {
    let id = record.id.as_deref().ok_or(RecordError::MissingField("id"))?;
    let name = record
        .name
        .as_deref()
        .filter(|n| !n.is_empty())
        .ok_or(RecordError::MissingField("name"))?;
    let kind = record.kind.as_deref().ok_or(RecordError::MissingField("kind"))?;
    let id = ItemId::new(id)?;

    let mut item = match kind.to_ascii_lowercase().as_str() {
        "folder" | "directory" => FileItem::directory(provider.clone(), id, name),
        "file" => {
            let mut item = FileItem::file(provider.clone(), id, name);
            if let Some(size) = record.size {
                if size < 0 {
                    return Err(RecordError::NegativeSize(size));
                }
                item = item.with_size(size as u64);
            }
            if let Some(content_type) = record.mime_type.as_deref().and_then(ContentType::from_mime)
            {
                item = item.with_content_type(content_type);
            }
            item
        }
        other => return Err(RecordError::UnknownKind(other.to_string())),
    };

    if let Some(created) = parse_timestamp("created", record.created.as_deref())? {
        item = item.with_created_at(created);
    }
    if let Some(modified) = parse_timestamp("modified", record.modified.as_deref())? {
        item = item.with_modified_at(modified);
    }
    if let Some(parent) = record.parent_id.as_deref().or(container) {
        item = item.with_parent(ItemId::new(parent)?);
    }
    Ok(item)
}

// ============================================================================
// RemoteAdapter
// ============================================================================

/// Adapter for one remote provider backed by an `IBackendClient`
pub struct RemoteAdapter {
    provider_id: ProviderId,
    client: Arc<dyn IBackendClient>,
    root: ItemId,
    probe_timeout: Duration,
    limits: SearchLimits,
}

impl RemoteAdapter {
    /// # Errors
    /// `OperationFailed` if the client reports an empty root container id.
    pub fn new(
        provider_id: ProviderId,
        client: Arc<dyn IBackendClient>,
        probe_timeout: Duration,
        limits: SearchLimits,
    ) -> ProviderResult<Self> {
        let root = ItemId::new(client.root_container())?;
        Ok(Self {
            provider_id,
            client,
            root,
            probe_timeout,
            limits,
        })
    }

    fn native(&self, operation: &'static str, err: anyhow::Error) -> ProviderError {
        ProviderError::from_native(&err).with_context(&self.provider_id, operation)
    }

    fn container<'a>(&'a self, id: Option<&'a ItemId>) -> &'a str {
        id.unwrap_or(&self.root).as_str()
    }

    fn translate(&self, record: &RawRecord, container: Option<&str>) -> ProviderResult<FileItem> {
        translate_record(&self.provider_id, record, container)
            .map_err(|e| ProviderError::new(ErrorKind::Corrupted, e.to_string()))
    }

    /// Drain `enumerate(container)`, skipping records that fail translation
    async fn enumerate_items(&self, container: &str) -> ProviderResult<Vec<FileItem>> {
        let mut stream = self
            .client
            .enumerate(container)
            .await
            .map_err(|e| self.native("list", e))?;

        let mut items = Vec::new();
        let mut skipped = 0usize;
        while let Some(next) = stream.next().await {
            let record = next.map_err(|e| self.native("list", e))?;
            match translate_record(&self.provider_id, &record, Some(container)) {
                Ok(item) => items.push(item),
                Err(e) => {
                    skipped += 1;
                    warn!(
                        provider = %self.provider_id,
                        record = ?record.id,
                        error = %e,
                        "Skipping untranslatable record"
                    );
                }
            }
        }
        debug!(count = items.len(), skipped, "Enumerated container");
        Ok(items)
    }

    /// Turn a mutation response into an item, falling back to a lookup
    async fn resulting_item(
        &self,
        response: Option<RawRecord>,
        container: &str,
        name: &str,
    ) -> ProviderResult<FileItem> {
        if let Some(record) = response {
            return self.translate(&record, Some(container));
        }
        self.enumerate_items(container)
            .await?
            .into_iter()
            .find(|item| item.name() == name)
            .ok_or_else(|| {
                ProviderError::new(
                    ErrorKind::OperationFailed,
                    format!("{name} not found in {container} after mutation"),
                )
            })
    }

    async fn apply(&self, mutation: BackendMutation) -> ProviderResult<Option<RawRecord>> {
        let operation = mutation.name();
        let response = self
            .client
            .mutate(&mutation)
            .await
            .map_err(|e| self.native(operation, e))?;
        info!(provider = %self.provider_id, operation, "Applied remote mutation");
        Ok(response)
    }

    async fn fetch_record(&self, id: &ItemId) -> ProviderResult<RawRecord> {
        self.client
            .record(id.as_str())
            .await
            .map_err(|e| self.native("get_item", e))
    }

    /// Breadth-first name search through `enumerate`, for back-ends without
    /// server-side search
    async fn walk_search(
        &self,
        needle: &str,
        start: &str,
        filter: Option<ContentType>,
    ) -> ProviderResult<Vec<FileItem>> {
        let mut results = Vec::new();
        let mut queue = VecDeque::from([(start.to_string(), 0usize)]);
        while let Some((container, depth)) = queue.pop_front() {
            let items = match self.enumerate_items(&container).await {
                Ok(items) => items,
                Err(e) if depth > 0 => {
                    warn!(container = %container, error = %e, "Skipping container during search");
                    continue;
                }
                Err(e) => return Err(e),
            };
            for item in items {
                if item.is_directory() && depth + 1 < self.limits.max_depth {
                    queue.push_back((item.id().as_str().to_string(), depth + 1));
                }
                if item.name().to_lowercase().contains(needle) && matches_filter(&item, filter) {
                    results.push(item);
                    if results.len() >= self.limits.max_results {
                        return Ok(results);
                    }
                }
            }
        }
        Ok(results)
    }
}

fn matches_filter(item: &FileItem, filter: Option<ContentType>) -> bool {
    match filter {
        None => true,
        Some(wanted) => !item.is_directory() && item.content_type() == Some(wanted),
    }
}

#[async_trait]
impl IProviderAdapter for RemoteAdapter {
    fn provider_id(&self) -> &ProviderId {
        &self.provider_id
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Remote
    }

    fn root_id(&self) -> ItemId {
        self.root.clone()
    }

    #[instrument(skip(self), fields(provider = %self.provider_id))]
    async fn list(&self, directory: Option<&ItemId>) -> ProviderResult<Vec<FileItem>> {
        self.enumerate_items(self.container(directory)).await
    }

    #[instrument(skip(self), fields(provider = %self.provider_id))]
    async fn get_item(&self, id: &ItemId) -> ProviderResult<FileItem> {
        let record = self.fetch_record(id).await?;
        self.translate(&record, None)
    }

    #[instrument(skip(self), fields(provider = %self.provider_id))]
    async fn create(
        &self,
        parent: Option<&ItemId>,
        name: &str,
        kind: CreateKind,
    ) -> ProviderResult<FileItem> {
        validate_name(name)?;
        let container = self.container(parent);

        // Back-ends often auto-rename duplicates; refuse up front instead
        let existing = self.enumerate_items(container).await?;
        if existing.iter().any(|item| item.name() == name) {
            return Err(ProviderError::new(
                ErrorKind::AlreadyExists,
                format!("{name} already exists in {container}"),
            )
            .with_context(&self.provider_id, "create"));
        }

        let mutation = match kind {
            CreateKind::Directory => BackendMutation::CreateFolder {
                parent: container.to_string(),
                name: name.to_string(),
            },
            CreateKind::File => BackendMutation::CreateFile {
                parent: container.to_string(),
                name: name.to_string(),
            },
        };
        let response = self.apply(mutation).await?;
        self.resulting_item(response, container, name).await
    }

    #[instrument(skip(self), fields(provider = %self.provider_id))]
    async fn delete(&self, id: &ItemId) -> ProviderResult<()> {
        self.apply(BackendMutation::Delete {
            item: id.as_str().to_string(),
        })
        .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(provider = %self.provider_id))]
    async fn move_item(&self, id: &ItemId, destination: &ItemId) -> ProviderResult<FileItem> {
        let response = self
            .apply(BackendMutation::Move {
                item: id.as_str().to_string(),
                new_parent: destination.as_str().to_string(),
            })
            .await?;
        match response {
            Some(record) => self.translate(&record, Some(destination.as_str())),
            None => self.get_item(id).await,
        }
    }

    #[instrument(skip(self), fields(provider = %self.provider_id))]
    async fn rename(&self, id: &ItemId, new_name: &str) -> ProviderResult<FileItem> {
        validate_name(new_name)?;
        let response = self
            .apply(BackendMutation::Rename {
                item: id.as_str().to_string(),
                new_name: new_name.to_string(),
            })
            .await?;
        match response {
            Some(record) => self.translate(&record, None),
            None => self.get_item(id).await,
        }
    }

    #[instrument(skip(self), fields(provider = %self.provider_id))]
    async fn copy(&self, id: &ItemId, destination: &ItemId) -> ProviderResult<FileItem> {
        let response = self
            .apply(BackendMutation::Copy {
                item: id.as_str().to_string(),
                new_parent: destination.as_str().to_string(),
            })
            .await?;
        match response {
            Some(record) => self.translate(&record, Some(destination.as_str())),
            None => {
                // The copy has a new id; find it by name in the destination
                let source = self.get_item(id).await?;
                self.resulting_item(None, destination.as_str(), source.name())
                    .await
            }
        }
    }

    #[instrument(skip(self), fields(provider = %self.provider_id))]
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
        let container = self.container(root);

        let server_side = self
            .client
            .search(query.trim(), container)
            .await
            .map_err(|e| self.native("search", e))?;
        let Some(records) = server_side else {
            return self.walk_search(&needle, container, filter).await;
        };

        let mut results = Vec::new();
        for record in &records {
            match translate_record(&self.provider_id, record, None) {
                Ok(item) if matches_filter(&item, filter) => results.push(item),
                Ok(_) => {}
                Err(e) => warn!(record = ?record.id, error = %e, "Skipping search hit"),
            }
            if results.len() >= self.limits.max_results {
                break;
            }
        }
        Ok(results)
    }

    #[instrument(skip(self, item), fields(provider = %self.provider_id, item = %item.id()))]
    async fn resolve_local_url(&self, item: &FileItem) -> ProviderResult<PathBuf> {
        let path = self
            .client
            .fetch_bytes(item.id().as_str())
            .await
            .map_err(|e| self.native("resolve_local_url", e))?;
        debug!(path = %path.display(), "Fetched remote bytes");
        Ok(path)
    }

    async fn probe(&self) -> ProbeOutcome {
        match tokio::time::timeout(self.probe_timeout, self.client.probe()).await {
            Err(_) => ProbeOutcome::failed(
                ProviderStatus::Offline,
                format!("probe timed out after {:?}", self.probe_timeout),
            ),
            Ok(Ok(true)) => ProbeOutcome::available(),
            Ok(Ok(false)) => ProbeOutcome::failed(ProviderStatus::Offline, "back-end unreachable"),
            Ok(Err(e)) => {
                let status = match classify(&e) {
                    ErrorKind::AuthenticationRequired => ProviderStatus::Unauthorized,
                    ErrorKind::ProviderOffline
                    | ErrorKind::ConnectionError
                    | ErrorKind::OperationTimedOut => ProviderStatus::Offline,
                    _ => ProviderStatus::Error,
                };
                ProbeOutcome::failed(status, format!("{e:#}"))
            }
        }
    }
}
