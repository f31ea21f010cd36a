//! `filecast` subcommands

pub mod cache;
pub mod fetch;
pub mod ls;
pub mod providers;
pub mod recent;
pub mod search;
pub mod watch;

use anyhow::{Context, Result};
use filecast_core::domain::{ItemId, ProviderId};

/// Parse a `--provider` value
pub(crate) fn provider_arg(provider: &str) -> Result<ProviderId> {
    ProviderId::new(provider).with_context(|| format!("Invalid provider id '{provider}'"))
}

/// Parse an optional directory argument; absent means the provider root
pub(crate) fn directory_arg(directory: Option<&str>) -> Result<Option<ItemId>> {
    directory
        .map(|d| ItemId::new(d).with_context(|| format!("Invalid item id '{d}'")))
        .transpose()
}
