//! Fetch command - Resolve an item to a local path
//!
//! Remote items are downloaded into the content cache (or served from it);
//! local items resolve to their own path. The item is recorded in the
//! recent items list.

use anyhow::{Context, Result};
use clap::Args;
use filecast_core::domain::ItemId;
use filecast_service::Services;
use tracing::info;

use super::provider_arg;
use crate::output::{Output, OutputFormat};

#[derive(Debug, Args)]
pub struct FetchCommand {
    /// Item id to fetch
    pub item: String,

    /// Provider owning the item
    #[arg(long, short, default_value = "local")]
    pub provider: String,
}

impl FetchCommand {
    pub async fn execute(&self, services: &Services, format: OutputFormat) -> Result<()> {
        let formatter = Output::new(format);
        let provider = provider_arg(&self.provider)?;
        let id = ItemId::new(self.item.as_str())
            .with_context(|| format!("Invalid item id '{}'", self.item))?;

        let mut item = services
            .router
            .get_item(&id, &provider)
            .await
            .with_context(|| format!("Failed to look up {}", self.item))?;
        let path = services
            .router
            .hydrate(&mut item)
            .await
            .with_context(|| format!("Failed to fetch {}", item.name()))?;
        services
            .recent
            .record(&item)
            .await
            .context("Failed to update recent items")?;
        info!(item = %id, path = %path.display(), "Fetched item");

        if formatter.is_json() {
            formatter.print_json(&serde_json::json!({
                "item": item,
                "path": path,
            }));
        } else {
            formatter.success(&format!("{} is available locally", item.name()));
            formatter.info(&path.display().to_string());
        }
        Ok(())
    }
}
