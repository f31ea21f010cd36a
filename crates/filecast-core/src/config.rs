//! Configuration module for Filecast.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::ProviderId;
use crate::ports::SearchLimits;

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for Filecast.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub local: LocalConfig,
    pub remotes: Vec<RemoteConfig>,
    pub cache: CacheConfig,
    pub monitor: MonitorConfig,
    pub providers: ProvidersConfig,
    pub search: SearchConfig,
    pub state: StateConfig,
    pub logging: LoggingConfig,
}

/// Local filesystem provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    /// Directory the local provider exposes as its root.
    pub root: PathBuf,
    /// Name shown for the local provider.
    pub display_name: String,
    /// Whether dot-files are listed.
    pub show_hidden: bool,
}

/// One folder-backed remote provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Provider id; must be unique and must not be `local`.
    pub id: String,
    /// Name shown for the provider.
    pub display_name: String,
    /// Directory served through the remote adapter.
    pub root: PathBuf,
}

/// Content cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory holding cached content.
    pub dir: PathBuf,
    /// Maximum total size of cached content (in MiB).
    pub max_size_mb: u64,
}

/// Directory change monitor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Seconds between polls of a watched directory.
    pub poll_interval_secs: u64,
}

/// Provider registry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Upper bound on a reachability probe (in milliseconds).
    pub probe_timeout_ms: u64,
}

/// Search bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub max_depth: usize,
    pub max_results: usize,
}

/// Durable state settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// SQLite database holding persisted state.
    pub db_path: PathBuf,
    /// Number of recently accessed items kept.
    pub recent_capacity: usize,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Load from `path`, or the defaults if no file exists there yet.
    ///
    /// Unlike [`Config::load_or_default`], a file that exists but does not
    /// parse is an error, so callers that write the config back never
    /// replace a file they could not read.
    pub fn load_existing(path: &Path) -> anyhow::Result<Self> {
        if !path.try_exists()? {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Write the configuration as YAML, creating parent directories.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/filecast/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("filecast")
            .join("config.yaml")
    }

    /// Cache limit in bytes.
    pub fn cache_max_bytes(&self) -> u64 {
        self.cache.max_size_mb.saturating_mul(1024 * 1024)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.monitor.poll_interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.providers.probe_timeout_ms)
    }

    pub fn search_limits(&self) -> SearchLimits {
        SearchLimits {
            max_depth: self.search.max_depth,
            max_results: self.search.max_results,
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            root: dirs::home_dir().unwrap_or_else(|| PathBuf::from("/")),
            display_name: "On My Device".to_string(),
            show_hidden: false,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("~/.cache"))
                .join("filecast"),
            max_size_mb: 2048,
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: 3000,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        let limits = SearchLimits::default();
        Self {
            max_depth: limits.max_depth,
            max_results: limits.max_results,
        }
    }
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            db_path: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("~/.local/share"))
                .join("filecast")
                .join("state.db"),
            recent_capacity: 10,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"monitor.poll_interval_secs"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let mut push = |field: &str, message: String| {
            errors.push(ValidationError {
                field: field.into(),
                message,
            });
        };

        // --- cache ---
        if self.cache.max_size_mb == 0 {
            push("cache.max_size_mb", "must be greater than 0".into());
        }

        // --- monitor ---
        if self.monitor.poll_interval_secs == 0 {
            push("monitor.poll_interval_secs", "must be greater than 0".into());
        }

        // --- providers ---
        if self.providers.probe_timeout_ms == 0 {
            push("providers.probe_timeout_ms", "must be greater than 0".into());
        }

        // --- search ---
        if self.search.max_depth == 0 {
            push("search.max_depth", "must be greater than 0".into());
        }
        if self.search.max_results == 0 {
            push("search.max_results", "must be greater than 0".into());
        }

        // --- state ---
        if self.state.recent_capacity == 0 || self.state.recent_capacity > 100 {
            push("state.recent_capacity", "must be in range 1..=100".into());
        }

        // --- remotes ---
        let mut seen = HashSet::new();
        for (i, remote) in self.remotes.iter().enumerate() {
            let field = format!("remotes[{i}].id");
            if remote.id == ProviderId::LOCAL {
                push(&field, "`local` is reserved for the local provider".into());
            } else if ProviderId::new(remote.id.clone()).is_err() {
                push(
                    &field,
                    format!("invalid provider id '{}'", remote.id),
                );
            } else if !seen.insert(remote.id.as_str()) {
                push(&field, format!("duplicate provider id '{}'", remote.id));
            }
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            push(
                "logging.level",
                format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            );
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use filecast_core::config::ConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .local_root(PathBuf::from("/srv/media"))
///     .cache_max_size_mb(512)
///     .poll_interval_secs(10)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- local ---

    pub fn local_root(mut self, root: PathBuf) -> Self {
        self.config.local.root = root;
        self
    }

    pub fn local_display_name(mut self, name: impl Into<String>) -> Self {
        self.config.local.display_name = name.into();
        self
    }

    pub fn show_hidden(mut self, show: bool) -> Self {
        self.config.local.show_hidden = show;
        self
    }

    // --- remotes ---

    pub fn remote(mut self, id: impl Into<String>, display_name: impl Into<String>, root: PathBuf) -> Self {
        self.config.remotes.push(RemoteConfig {
            id: id.into(),
            display_name: display_name.into(),
            root,
        });
        self
    }

    // --- cache ---

    pub fn cache_dir(mut self, dir: PathBuf) -> Self {
        self.config.cache.dir = dir;
        self
    }

    pub fn cache_max_size_mb(mut self, mb: u64) -> Self {
        self.config.cache.max_size_mb = mb;
        self
    }

    // --- monitor / providers / search ---

    pub fn poll_interval_secs(mut self, seconds: u64) -> Self {
        self.config.monitor.poll_interval_secs = seconds;
        self
    }

    pub fn probe_timeout_ms(mut self, ms: u64) -> Self {
        self.config.providers.probe_timeout_ms = ms;
        self
    }

    pub fn search_max_depth(mut self, depth: usize) -> Self {
        self.config.search.max_depth = depth;
        self
    }

    pub fn search_max_results(mut self, n: usize) -> Self {
        self.config.search.max_results = n;
        self
    }

    // --- state ---

    pub fn state_db_path(mut self, path: PathBuf) -> Self {
        self.config.state.db_path = path;
        self
    }

    pub fn recent_capacity(mut self, n: usize) -> Self {
        self.config.state.recent_capacity = n;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
