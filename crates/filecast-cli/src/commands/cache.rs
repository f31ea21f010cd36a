//! Cache command - Inspect and maintain the content cache
//!
//! `limit` applies the new limit immediately (evicting least recently
//! accessed entries as needed) and writes it to the configuration file so
//! later runs keep it.

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use filecast_core::config::Config;
use filecast_core::domain::format_size;
use filecast_service::Services;
use tracing::info;

use crate::output::{Output, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum CacheCommand {
    /// Show used and maximum cache size
    Usage,
    /// Remove every cached item
    Clear,
    /// Set the maximum cache size
    Limit {
        /// New limit in MiB
        mb: u64,
    },
}

impl CacheCommand {
    pub async fn execute(
        &self,
        services: &Services,
        config_path: &Path,
        format: OutputFormat,
    ) -> Result<()> {
        match self {
            CacheCommand::Usage => self.execute_usage(services, format).await,
            CacheCommand::Clear => self.execute_clear(services, format).await,
            CacheCommand::Limit { mb } => {
                self.execute_limit(services, config_path, *mb, format).await
            }
        }
    }

    async fn execute_usage(&self, services: &Services, format: OutputFormat) -> Result<()> {
        let formatter = Output::new(format);
        let usage = services.router.cache_usage().await;

        if formatter.is_json() {
            let mut json = serde_json::to_value(usage).context("Failed to serialize cache usage")?;
            json["entries_detail"] = serde_json::to_value(
                services
                    .cache
                    .entries()
                    .await
                    .iter()
                    .map(|e| serde_json::json!({
                        "key": e.key,
                        "size_bytes": e.size_bytes,
                        "last_accessed_at": e.last_accessed_at.to_rfc3339(),
                    }))
                    .collect::<Vec<_>>(),
            )?;
            formatter.print_json(&json);
            return Ok(());
        }

        formatter.success(&format!(
            "{} of {} used by {} item(s)",
            format_size(usage.used_bytes),
            format_size(usage.max_bytes),
            usage.entries
        ));
        for entry in services.cache.entries().await {
            formatter.info(&format!(
                "{:>10}  {}  {}",
                format_size(entry.size_bytes),
                entry.last_accessed_at.format("%Y-%m-%d %H:%M:%S"),
                entry.key.as_deref().unwrap_or("(from a previous run)")
            ));
        }
        Ok(())
    }

    async fn execute_clear(&self, services: &Services, format: OutputFormat) -> Result<()> {
        let formatter = Output::new(format);
        let removed = services.router.clear_cache().await;
        info!(removed, "Cleared content cache");
        formatter.success(&format!("Removed {removed} cached item(s)"));
        Ok(())
    }

    async fn execute_limit(
        &self,
        services: &Services,
        config_path: &Path,
        mb: u64,
        format: OutputFormat,
    ) -> Result<()> {
        let formatter = Output::new(format);
        if mb == 0 {
            bail!("Cache limit must be greater than 0");
        }

        let config = persist_limit(config_path, mb)?;
        services.router.set_cache_max_size(config.cache_max_bytes()).await;
        let usage = services.router.cache_usage().await;
        info!(max_bytes = usage.max_bytes, used_bytes = usage.used_bytes, "Cache limit changed");
        formatter.success(&format!(
            "Cache limit set to {} ({} in use)",
            format_size(usage.max_bytes),
            format_size(usage.used_bytes)
        ));
        Ok(())
    }
}

/// Write `cache.max_size_mb` into the config file, keeping every other
/// setting; a config file that fails to parse is reported, not replaced
fn persist_limit(config_path: &Path, mb: u64) -> Result<Config> {
    let mut config = Config::load_existing(config_path)
        .with_context(|| format!("Failed to read {}", config_path.display()))?;
    config.cache.max_size_mb = mb;
    config
        .save(config_path)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    Ok(config)
}
