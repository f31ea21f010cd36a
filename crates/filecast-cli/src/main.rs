//! Filecast CLI - Command-line interface for Filecast
//!
//! Provides commands for:
//! - Listing providers and their reachability
//! - Browsing and searching any provider
//! - Fetching items to a local path through the content cache
//! - Watching a directory for changes
//! - Maintaining the content cache and the recent items list

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use filecast_core::config::Config;
use filecast_service::Services;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    cache::CacheCommand, fetch::FetchCommand, ls::LsCommand, providers::ProvidersCommand,
    recent::RecentCommand, search::SearchCommand, watch::WatchCommand,
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "filecast", version, about = "Browse local and remote media providers")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List providers and probe their reachability
    Providers(ProvidersCommand),
    /// List a directory
    Ls(LsCommand),
    /// Search item names
    Search(SearchCommand),
    /// Fetch an item to a local path
    Fetch(FetchCommand),
    /// Print a directory listing whenever it changes
    Watch(WatchCommand),
    /// Inspect and maintain the content cache
    #[command(subcommand)]
    Cache(CacheCommand),
    /// Show recently fetched items
    Recent(RecentCommand),
}

/// Log filter: `RUST_LOG` wins, then `-v`, then the configured level
fn log_filter(verbose: u8, configured: &str) -> EnvFilter {
    let level = match verbose {
        0 => configured,
        1 => "debug",
        _ => "trace",
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

fn init_tracing(cli: &Cli, config: &Config) {
    let filter = log_filter(cli.verbose, &config.logging.level);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<(Config, PathBuf)> {
    match path {
        Some(path) => {
            let config = Config::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            Ok((config, path.clone()))
        }
        None => {
            let path = Config::default_path();
            Ok((Config::load_or_default(&path), path))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, config_path) = load_config(cli.config.as_ref())?;
    init_tracing(&cli, &config);
    info!(config_path = %config_path.display(), "Loaded configuration");

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    let services = Services::from_config(&config)
        .await
        .context("Failed to start services")?;

    match &cli.command {
        Commands::Providers(cmd) => cmd.execute(&services, format).await,
        Commands::Ls(cmd) => cmd.execute(&services, format).await,
        Commands::Search(cmd) => cmd.execute(&services, format).await,
        Commands::Fetch(cmd) => cmd.execute(&services, format).await,
        Commands::Watch(cmd) => cmd.execute(&services, format).await,
        Commands::Cache(cmd) => cmd.execute(&services, &config_path, format).await,
        Commands::Recent(cmd) => cmd.execute(&services, format).await,
    }
}
