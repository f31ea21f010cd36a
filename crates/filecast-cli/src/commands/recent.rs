//! Recent command - Show or clear recently fetched items

use anyhow::{Context, Result};
use clap::Args;
use filecast_service::Services;

use crate::output::{Output, OutputFormat};

#[derive(Debug, Args)]
pub struct RecentCommand {
    /// Forget every recent item
    #[arg(long)]
    pub clear: bool,
}

impl RecentCommand {
    pub async fn execute(&self, services: &Services, format: OutputFormat) -> Result<()> {
        let formatter = Output::new(format);

        if self.clear {
            services
                .recent
                .clear()
                .await
                .context("Failed to clear recent items")?;
            formatter.success("Recent items cleared");
            return Ok(());
        }

        let items = services.recent.items().await;
        if !formatter.is_json() {
            formatter.success(&format!(
                "{} recent item(s) (keeping {})",
                items.len(),
                services.recent.capacity()
            ));
        }
        formatter.print_items(&items);
        Ok(())
    }
}
