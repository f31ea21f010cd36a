//! Search command - Case-insensitive name search below a provider root

use anyhow::{bail, Context, Result};
use clap::Args;
use filecast_core::domain::ContentType;
use filecast_service::Services;

use super::provider_arg;
use crate::output::{Output, OutputFormat};

#[derive(Debug, Args)]
pub struct SearchCommand {
    /// Text to look for in item names
    pub query: String,

    /// Provider to search
    #[arg(long, short, default_value = "local")]
    pub provider: String,

    /// Only return items of this type (video, audio, image, document, archive)
    #[arg(long = "type", short = 't')]
    pub content_type: Option<String>,
}

impl SearchCommand {
    pub async fn execute(&self, services: &Services, format: OutputFormat) -> Result<()> {
        let formatter = Output::new(format);
        let provider = provider_arg(&self.provider)?;
        let filter = match self.content_type.as_deref() {
            None => None,
            Some(name) => match ContentType::parse(name) {
                Some(content_type) => Some(content_type),
                None => bail!("Unknown content type '{name}'"),
            },
        };

        let results = services
            .router
            .search(&self.query, &provider, filter)
            .await
            .with_context(|| format!("Search for '{}' failed", self.query))?;

        if !formatter.is_json() {
            formatter.success(&format!("{} match(es) for '{}'", results.len(), self.query));
        }
        formatter.print_items(&results);
        Ok(())
    }
}
