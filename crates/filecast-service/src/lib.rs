//! Filecast Service - Browsing services over the provider adapters
//!
//! - [`ProviderRouter`] - provider registry and facade routing each call to
//!   the adapter that owns the item, with cache-backed local URL resolution
//! - [`DirectoryMonitor`] - shared polling watches publishing directory
//!   listings to any number of subscribers
//! - [`RecentItems`] - persisted most-recent-first item list
//! - [`NavigationState`] - breadcrumb, sort and filter state of one browser
//! - [`Services`] - everything above wired from a `Config`

pub mod monitor;
pub mod navigation;
pub mod recent;
pub mod router;
pub mod services;

pub use monitor::{DirectoryKey, DirectoryMonitor, DirectorySubscription, Listing};
pub use navigation::{NavigationState, ROOT_INDEX};
pub use recent::{RecentItems, DEFAULT_RECENT_CAPACITY, RECENT_FILES_KEY};
pub use router::{CacheUsage, MutationOp, ProviderRouter};
pub use services::{ServiceError, Services};
