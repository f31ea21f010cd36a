//! Domain entities
//!
//! This module contains the value types every other crate speaks in:
//! - Newtypes for provider and item identifiers and cache keys
//! - `FileItem` and its content-type classification
//! - Provider descriptors and status
//! - Listing order and change detection
//! - Domain validation errors

pub mod errors;
pub mod file_item;
pub mod listing;
pub mod newtypes;
pub mod provider;

pub use errors::DomainError;
pub use file_item::{format_size, ContentType, FileItem};
pub use listing::{listings_differ, sort_listing, SortKey, SortOrder};
pub use newtypes::{validate_name, ContentKey, ItemId, ProviderId};
pub use provider::{ProviderDescriptor, ProviderKind, ProviderStatus};
