//! Filecast Providers - back-end adapters
//!
//! Implementations of the `IProviderAdapter` port:
//!
//! - [`LocalAdapter`] - a directory tree on a mounted filesystem, via
//!   `tokio::fs`, with `notify`-based change hints
//! - [`RemoteAdapter`] - any back-end reachable through an injected
//!   `IBackendClient`
//!
//! Plus [`FolderBackend`], an `IBackendClient` that serves a local directory
//! through opaque item ids. It backs the `remotes` configured in
//! `config.yaml` and doubles as a reference client.

pub mod folder;
pub mod local;
pub mod remote;

pub use folder::FolderBackend;
pub use local::LocalAdapter;
pub use remote::{translate_record, RecordError, RemoteAdapter};
