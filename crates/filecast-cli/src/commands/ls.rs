//! Ls command - List a directory of any provider

use anyhow::{Context, Result};
use clap::Args;
use filecast_service::Services;

use super::{directory_arg, provider_arg};
use crate::output::{Output, OutputFormat};

#[derive(Debug, Args)]
pub struct LsCommand {
    /// Directory item id; the provider root when omitted
    pub dir: Option<String>,

    /// Provider to list
    #[arg(long, short, default_value = "local")]
    pub provider: String,
}

impl LsCommand {
    pub async fn execute(&self, services: &Services, format: OutputFormat) -> Result<()> {
        let formatter = Output::new(format);
        let provider = provider_arg(&self.provider)?;
        let directory = directory_arg(self.dir.as_deref())?;

        let items = services
            .router
            .contents(directory.as_ref(), &provider)
            .await
            .with_context(|| format!("Failed to list {}", self.dir.as_deref().unwrap_or("root")))?;

        if !formatter.is_json() {
            formatter.success(&format!(
                "{}:{} ({} items)",
                provider,
                self.dir.as_deref().unwrap_or("/"),
                items.len()
            ));
        }
        formatter.print_items(&items);
        Ok(())
    }
}
