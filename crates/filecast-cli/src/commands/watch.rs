//! Watch command - Print a directory listing every time it changes
//!
//! Subscribes to the directory monitor and prints each published listing
//! until `--count` listings were shown, the watch fails, or Ctrl+C.

use anyhow::{Context, Result};
use clap::Args;
use filecast_service::Services;
use tracing::info;

use super::{directory_arg, provider_arg};
use crate::output::{Output, OutputFormat};

#[derive(Debug, Args)]
pub struct WatchCommand {
    /// Directory item id; the provider root when omitted
    pub dir: Option<String>,

    /// Provider to watch
    #[arg(long, short, default_value = "local")]
    pub provider: String,

    /// Stop after this many listings
    #[arg(long, short = 'n')]
    pub count: Option<usize>,
}

impl WatchCommand {
    pub async fn execute(&self, services: &Services, format: OutputFormat) -> Result<()> {
        let formatter = Output::new(format);
        let provider = provider_arg(&self.provider)?;
        let directory = directory_arg(self.dir.as_deref())?;

        let mut subscription = services
            .monitor
            .subscribe(&provider, directory.as_ref())
            .context("Failed to start watching")?;
        info!(key = %subscription.key(), interval = ?services.monitor.poll_interval(), "Watching");
        if !formatter.is_json() {
            formatter.success(&format!(
                "Watching {} every {}s (Ctrl+C to stop)",
                subscription.key(),
                services.monitor.poll_interval().as_secs()
            ));
        }

        let mut shown = 0usize;
        loop {
            if self.count.is_some_and(|count| shown >= count) {
                break;
            }
            let next = tokio::select! {
                next = subscription.next() => next,
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted");
                    break;
                }
            };
            match next {
                Some(Ok(listing)) => {
                    shown += 1;
                    if !formatter.is_json() {
                        formatter.success(&format!("Listing #{shown} ({} items)", listing.len()));
                    }
                    formatter.print_items(&listing);
                }
                Some(Err(e)) => {
                    formatter.error(&e.to_string());
                    break;
                }
                None => {
                    formatter.warn("Watch ended");
                    break;
                }
            }
        }
        subscription.unsubscribe();
        Ok(())
    }
}
