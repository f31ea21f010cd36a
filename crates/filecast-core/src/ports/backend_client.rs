//! Back-end client port (driven/secondary port)
//!
//! The remote adapter is written against this trait and never against a
//! concrete wire protocol. A client is injected at adapter construction and
//! exposes enumerate / fetch / mutate / probe primitives scoped to opaque
//! container and item identifiers.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because failures at this boundary are native to
//!   the back-end; the remote adapter classifies them. Clients that know an
//!   HTTP-like status should wrap it in
//!   [`BackendStatus`](crate::error::BackendStatus).
//! - [`RawRecord`] is a port-level DTO with every field optional. The adapter
//!   decides whether a record is usable; one malformed record never fails a
//!   whole listing.

use std::path::PathBuf;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};

// ============================================================================
// RawRecord
// ============================================================================

/// One item as reported by a back-end, before normalization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Back-end item identifier
    pub id: Option<String>,
    /// Display name
    pub name: Option<String>,
    /// `"file"` or `"folder"` (`"directory"` is accepted as an alias)
    pub kind: Option<String>,
    /// Size in bytes; negative values make the record unusable
    pub size: Option<i64>,
    /// MIME type, if the back-end knows it
    pub mime_type: Option<String>,
    /// RFC 3339 creation timestamp
    pub created: Option<String>,
    /// RFC 3339 modification timestamp
    pub modified: Option<String>,
    /// Identifier of the containing folder
    pub parent_id: Option<String>,
    /// Back-end specific fields the core does not interpret
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RawRecord {
    /// Convenience constructor for a file record
    pub fn file(id: impl Into<String>, name: impl Into<String>, size: i64) -> Self {
        Self {
            id: Some(id.into()),
            name: Some(name.into()),
            kind: Some("file".to_string()),
            size: Some(size),
            ..Default::default()
        }
    }

    /// Convenience constructor for a folder record
    pub fn folder(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: Some(name.into()),
            kind: Some("folder".to_string()),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    #[must_use]
    pub fn with_modified(mut self, modified: impl Into<String>) -> Self {
        self.modified = Some(modified.into());
        self
    }
}

// ============================================================================
// BackendMutation
// ============================================================================

/// A mutation request forwarded to the back-end
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendMutation {
    CreateFolder { parent: String, name: String },
    CreateFile { parent: String, name: String },
    Delete { item: String },
    Move { item: String, new_parent: String },
    Rename { item: String, new_name: String },
    Copy { item: String, new_parent: String },
}

impl BackendMutation {
    /// Short operation name for logs
    pub fn name(&self) -> &'static str {
        match self {
            BackendMutation::CreateFolder { .. } => "create_folder",
            BackendMutation::CreateFile { .. } => "create_file",
            BackendMutation::Delete { .. } => "delete",
            BackendMutation::Move { .. } => "move",
            BackendMutation::Rename { .. } => "rename",
            BackendMutation::Copy { .. } => "copy",
        }
    }
}

// ============================================================================
// IBackendClient
// ============================================================================

/// Port trait for a remote storage back-end
#[async_trait]
pub trait IBackendClient: Send + Sync {
    /// Identifier of the root container
    fn root_container(&self) -> String;

    /// Stream the children of `container`
    ///
    /// Pagination is the client's concern; the stream ends after the last
    /// page. An `Err` item means the enumeration itself broke.
    async fn enumerate(
        &self,
        container: &str,
    ) -> anyhow::Result<BoxStream<'static, anyhow::Result<RawRecord>>>;

    /// Metadata of one item
    async fn record(&self, item: &str) -> anyhow::Result<RawRecord>;

    /// Materialize an item's bytes to a local path (downloading if needed)
    async fn fetch_bytes(&self, item: &str) -> anyhow::Result<PathBuf>;

    /// Apply a mutation; returns the resulting record when there is one
    async fn mutate(&self, mutation: &BackendMutation) -> anyhow::Result<Option<RawRecord>>;

    /// Cheap reachability check
    async fn probe(&self) -> anyhow::Result<bool>;

    /// Server-side name search; `Ok(None)` means "not supported"
    async fn search(&self, _query: &str, _container: &str) -> anyhow::Result<Option<Vec<RawRecord>>> {
        Ok(None)
    }
}
