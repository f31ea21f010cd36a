//! Filecast Core - Domain model, error taxonomy and ports
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `FileItem`, `ProviderDescriptor`, identifier newtypes
//! - **Error taxonomy** - the closed `ErrorKind` set, `ProviderError`, and `classify`
//! - **Port definitions** - `IProviderAdapter`, `IBackendClient`, `IStateStore`
//! - **Configuration** - typed YAML configuration with validation
//!
//! # Architecture
//!
//! The domain module is pure data with no I/O. Ports define trait interfaces
//! that adapter crates implement; the service crate orchestrates them.

pub mod config;
pub mod domain;
pub mod error;
pub mod ports;

pub use error::{classify, classify_io, BackendStatus, ErrorKind, ProviderError, ProviderResult};
