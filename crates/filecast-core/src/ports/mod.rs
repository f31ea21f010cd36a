//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! core. Ports are interfaces the core depends on, but whose implementations
//! live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IProviderAdapter`] - Listing, CRUD, search and URL resolution for one back-end
//! - [`IBackendClient`] - Opaque remote storage primitives consumed by the remote adapter
//! - [`IStateStore`] - Durable key/value state (recent items)
//! - [`ChangeHint`] / [`WatchHandle`] - "Poll now" notifications from a back-end

pub mod backend_client;
pub mod provider_adapter;
pub mod state_store;
pub mod watch;

pub use backend_client::{BackendMutation, IBackendClient, RawRecord};
pub use provider_adapter::{CreateKind, IProviderAdapter, ProbeOutcome, SearchLimits};
pub use state_store::{IStateStore, MemoryStateStore};
pub use watch::{ChangeHint, WatchHandle};
