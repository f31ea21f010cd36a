//! Provider descriptors
//!
//! A [`ProviderDescriptor`] names one reachable back-end and carries its last
//! known status. Descriptors are created when the registry is built and are
//! never removed during a session; an unreachable provider is only marked
//! offline or errored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::ProviderId;

/// Which family of adapter serves a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Local,
    Remote,
}

/// Reachability of a provider as of the last probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    Available,
    Connecting,
    Offline,
    Error,
    Unauthorized,
    #[default]
    Unknown,
}

impl ProviderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderStatus::Available => "available",
            ProviderStatus::Connecting => "connecting",
            ProviderStatus::Offline => "offline",
            ProviderStatus::Error => "error",
            ProviderStatus::Unauthorized => "unauthorized",
            ProviderStatus::Unknown => "unknown",
        }
    }

    /// True if operations against the provider are expected to succeed
    pub fn is_usable(&self) -> bool {
        matches!(self, ProviderStatus::Available)
    }
}

impl std::fmt::Display for ProviderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity and status of one provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    pub id: ProviderId,
    pub display_name: String,
    pub kind: ProviderKind,
    pub status: ProviderStatus,
    pub last_error: Option<String>,
    pub last_sync_time: Option<DateTime<Utc>>,
}

impl ProviderDescriptor {
    /// The always-present, always-available local provider
    pub fn local(display_name: impl Into<String>) -> Self {
        Self {
            id: ProviderId::local(),
            display_name: display_name.into(),
            kind: ProviderKind::Local,
            status: ProviderStatus::Available,
            last_error: None,
            last_sync_time: None,
        }
    }

    /// A remote provider whose status has not been probed yet
    pub fn remote(id: ProviderId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            kind: ProviderKind::Remote,
            status: ProviderStatus::Unknown,
            last_error: None,
            last_sync_time: None,
        }
    }

    pub fn is_local(&self) -> bool {
        self.kind == ProviderKind::Local
    }
}
