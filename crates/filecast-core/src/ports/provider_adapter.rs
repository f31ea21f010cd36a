//! Provider adapter port
//!
//! One implementation per back-end family (local filesystem, remote). The
//! router selects an adapter once per provider when the registry is built,
//! so no caller ever branches on the back-end type.
//!
//! ## Contract
//!
//! - Every method returns one [`ErrorKind`](crate::error::ErrorKind) on
//!   failure; native errors are classified inside the adapter.
//! - `directory = None` / `parent = None` always means the provider root.
//! - Everything except `create` is safe to retry. `create` fails with
//!   `AlreadyExists` instead of succeeding twice.
//! - Mutations may fail with `OperationNotSupported` when the back-end lacks
//!   the primitive; callers treat that as an expected outcome.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::domain::{ContentType, FileItem, ItemId, ProviderId, ProviderKind, ProviderStatus};
use crate::error::ProviderResult;
use crate::ports::watch::ChangeHint;

/// What `create` should make
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateKind {
    Directory,
    File,
}

/// Bounds applied to recursive searches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    /// Maximum directory depth below the search root
    pub max_depth: usize,
    /// Stop after this many matches
    pub max_results: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            max_depth: 8,
            max_results: 500,
        }
    }
}

/// Result of a reachability probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub status: ProviderStatus,
    /// Diagnostic for non-available outcomes
    pub error: Option<String>,
}

impl ProbeOutcome {
    pub fn available() -> Self {
        Self {
            status: ProviderStatus::Available,
            error: None,
        }
    }

    pub fn failed(status: ProviderStatus, error: impl Into<String>) -> Self {
        Self {
            status,
            error: Some(error.into()),
        }
    }
}

/// Capability set every back-end adapter implements
#[async_trait]
pub trait IProviderAdapter: Send + Sync {
    /// Provider this adapter serves
    fn provider_id(&self) -> &ProviderId;

    /// Adapter family
    fn kind(&self) -> ProviderKind;

    /// Identifier of the provider root container
    fn root_id(&self) -> ItemId;

    /// Immediate children of `directory` (no recursion)
    async fn list(&self, directory: Option<&ItemId>) -> ProviderResult<Vec<FileItem>>;

    /// Metadata for a single item
    async fn get_item(&self, id: &ItemId) -> ProviderResult<FileItem>;

    /// Create a file or directory named `name` under `parent`
    async fn create(
        &self,
        parent: Option<&ItemId>,
        name: &str,
        kind: CreateKind,
    ) -> ProviderResult<FileItem>;

    /// Delete an item (directories recursively)
    async fn delete(&self, id: &ItemId) -> ProviderResult<()>;

    /// Move an item into `destination` (a directory), keeping its name
    async fn move_item(&self, id: &ItemId, destination: &ItemId) -> ProviderResult<FileItem>;

    /// Rename an item in place
    async fn rename(&self, id: &ItemId, new_name: &str) -> ProviderResult<FileItem>;

    /// Copy an item into `destination` (a directory), keeping its name
    async fn copy(&self, id: &ItemId, destination: &ItemId) -> ProviderResult<FileItem>;

    /// Case-insensitive name search below `root`
    ///
    /// `filter` is a hint; adapters that cannot filter may ignore it and the
    /// router post-filters.
    async fn search(
        &self,
        query: &str,
        root: Option<&ItemId>,
        filter: Option<ContentType>,
    ) -> ProviderResult<Vec<FileItem>>;

    /// A local path holding the item's bytes; may download
    async fn resolve_local_url(&self, item: &FileItem) -> ProviderResult<PathBuf>;

    /// Reachability check; callers bound it in time
    async fn probe(&self) -> ProbeOutcome;

    /// Push hints for `directory`, if the back-end can produce them
    async fn change_hints(&self, _directory: Option<&ItemId>) -> ProviderResult<Option<ChangeHint>> {
        Ok(None)
    }
}
