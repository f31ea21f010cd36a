//! Domain error types
//!
//! Validation failures raised while constructing domain values. These never
//! cross the router boundary directly; they are folded into a
//! [`ProviderError`](crate::error::ProviderError) first.

use thiserror::Error;

/// Errors that can occur while building domain values
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid provider identifier
    #[error("Invalid provider id: {0}")]
    InvalidProviderId(String),

    /// Invalid item identifier
    #[error("Invalid item id: {0}")]
    InvalidItemId(String),

    /// Invalid file or directory name
    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}
