//! Providers command - List providers and their reachability
//!
//! Probes every remote provider (bounded by the configured probe timeout)
//! and prints one line per provider, local first.

use anyhow::{Context, Result};
use clap::Args;
use filecast_service::Services;
use tracing::info;

use crate::output::{Output, OutputFormat};

#[derive(Debug, Args)]
pub struct ProvidersCommand {}

impl ProvidersCommand {
    pub async fn execute(&self, services: &Services, format: OutputFormat) -> Result<()> {
        let formatter = Output::new(format);
        let descriptors = services.router.list_providers().await;
        info!(count = descriptors.len(), "Listed providers");

        if formatter.is_json() {
            let json = serde_json::to_value(&descriptors).context("Failed to serialize providers")?;
            formatter.print_json(&json);
            return Ok(());
        }

        formatter.success(&format!("{} provider(s)", descriptors.len()));
        for descriptor in &descriptors {
            formatter.info(&format!(
                "{:<12} {:<12} {}",
                descriptor.id, descriptor.status, descriptor.display_name
            ));
            if let Some(error) = &descriptor.last_error {
                formatter.info(&format!("{:<12} last error: {}", "", error));
            }
        }
        Ok(())
    }
}
