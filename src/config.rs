//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::chart::LabelLocale;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub polling: PollingConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend HTTP API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl BackendConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Refresh intervals for the polled pages
#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_user_stats_interval")]
    pub user_stats_secs: u64,

    #[serde(default = "default_worklist_interval")]
    pub worklist_secs: u64,
}

fn default_user_stats_interval() -> u64 {
    10
}

fn default_worklist_interval() -> u64 {
    15
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            user_stats_secs: default_user_stats_interval(),
            worklist_secs: default_worklist_interval(),
        }
    }
}

impl PollingConfig {
    pub fn user_stats_interval(&self) -> Duration {
        Duration::from_secs(self.user_stats_secs.max(1))
    }

    pub fn worklist_interval(&self) -> Duration {
        Duration::from_secs(self.worklist_secs.max(1))
    }
}

/// Where the client keeps its small local state (session cookie, theme)
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_data_dir() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("choco-limpio").to_string_lossy().to_string())
        .unwrap_or_else(|| "./choco_limpio_data".to_string())
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl StorageConfig {
    /// Data directory with a leading `~/` expanded
    pub fn data_dir(&self) -> PathBuf {
        match (self.data_dir.strip_prefix("~/"), dirs::home_dir()) {
            (Some(rest), Some(home)) => home.join(rest),
            _ => PathBuf::from(&self.data_dir),
        }
    }

    pub fn session_path(&self) -> PathBuf {
        self.data_dir().join("session")
    }

    pub fn theme_path(&self) -> PathBuf {
        self.data_dir().join("theme")
    }
}

/// Presentation settings
#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_locale")]
    pub locale: String,
}

fn default_locale() -> String {
    "es-CO".to_string()
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            locale: default_locale(),
        }
    }
}

impl DisplayConfig {
    pub fn label_locale(&self) -> LabelLocale {
        LabelLocale::from_tag(&self.locale)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("choco-limpio").join("config.toml")),
            Some(PathBuf::from("/etc/choco-limpio/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::debug!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::debug!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("CHOCO_BACKEND_URL") {
            self.backend.base_url = url;
        }

        if let Ok(data_dir) = std::env::var("CHOCO_DATA_DIR") {
            self.storage.data_dir = data_dir;
        }

        if let Ok(locale) = std::env::var("CHOCO_LOCALE") {
            self.display.locale = locale;
        }

        if let Ok(level) = std::env::var("CHOCO_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("CHOCO_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Chocó Limpio client configuration
#
# Environment variables override these settings:
# - CHOCO_BACKEND_URL
# - CHOCO_DATA_DIR
# - CHOCO_LOCALE
# - CHOCO_LOG_LEVEL
# - CHOCO_LOG_FORMAT

[backend]
# Base URL of the Chocó Limpio web backend
base_url = "http://127.0.0.1:5000"

# Request timeout in seconds
request_timeout_secs = 10

[polling]
# Dashboard user stats and ranking refresh (seconds)
user_stats_secs = 10

# Collector worklist refresh (seconds)
worklist_secs = 15

[storage]
# Directory for the session cookie and the theme preference
data_dir = "~/.local/share/choco-limpio"

[display]
# Chart label locale: es-CO or en
locale = "es-CO"

[logging]
# Log level: trace, debug, info, warn, error
level = "warn"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
