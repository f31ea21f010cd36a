//! Domain newtypes with validation
//!
//! Strongly-typed wrappers for provider and item identifiers. Each newtype
//! rejects empty input at construction time so the rest of the crate never
//! has to re-check.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// ProviderId
// ============================================================================

/// Identifier of one provider (the local filesystem or a remote back-end)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(String);

impl ProviderId {
    /// Reserved identifier of the always-present local provider
    pub const LOCAL: &'static str = "local";

    /// Create a new ProviderId
    ///
    /// # Errors
    /// Returns `DomainError::InvalidProviderId` if the id is empty or contains
    /// whitespace or a `:` (which is the content key separator).
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.is_empty() || id.contains(':') || id.chars().any(char::is_whitespace) {
            return Err(DomainError::InvalidProviderId(id));
        }
        Ok(Self(id))
    }

    /// The reserved local provider id
    #[must_use]
    pub fn local() -> Self {
        Self(Self::LOCAL.to_string())
    }

    /// Returns true if this is the reserved local provider id
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.0 == Self::LOCAL
    }

    /// Get the id as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// ItemId
// ============================================================================

/// Identifier of one item, unique within its provider
///
/// For the local provider this is the canonical path; for remote providers it
/// is the back-end's own opaque identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Create a new ItemId
    ///
    /// # Errors
    /// Returns `DomainError::InvalidItemId` if the id is empty.
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.is_empty() {
            return Err(DomainError::InvalidItemId(id));
        }
        Ok(Self(id))
    }

    /// Get the id as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ItemId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// ContentKey
// ============================================================================

/// Cache address of an item's bytes, derived from provider id + item id
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentKey(String);

impl ContentKey {
    /// Derive the key for an item of a provider
    #[must_use]
    pub fn new(provider: &ProviderId, item: &ItemId) -> Self {
        Self(format!("{}:{}", provider.as_str(), item.as_str()))
    }

    /// Get the key as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ContentKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validate a single path component used as a file or directory name
///
/// # Errors
/// Returns `DomainError::InvalidName` for empty names, `.`/`..`, and names
/// containing a path separator or NUL.
pub fn validate_name(name: &str) -> Result<(), DomainError> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
    {
        return Err(DomainError::InvalidName(name.to_string()));
    }
    Ok(())
}
