//! Configuration management for bsa
//!
//! Config files are stored in platform-appropriate locations:
//! - Linux: ~/.config/bsa/
//! - macOS: ~/Library/Application Support/bsa/
//! - Windows: %APPDATA%\bsa\

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "BSA_CONFIG";

/// Environment variable overriding `api.base_url`
pub const API_URL_ENV: &str = "BSA_API_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Config directory not found")]
    NoDirFound,
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Session persistence settings
    #[serde(default)]
    pub session: SessionConfig,

    /// Dashboard client settings
    #[serde(default)]
    pub client: ClientConfig,
}

/// Remote API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL every `v1/...` path is joined to
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Delay before a request is replayed after token renewal, in milliseconds
    #[serde(default = "default_renewal_delay")]
    pub renewal_delay_ms: u64,

    /// Request timeout in seconds. Unset means the HTTP client default.
    pub timeout_secs: Option<u64>,
}

/// Session persistence configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session file path. Defaults to `<data_dir>/bsa/bsa-auth.json`.
    pub path: Option<PathBuf>,
}

/// Dashboard client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Products per page on paginated lists
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Confirm before delete
    #[serde(default = "default_true")]
    pub confirm_delete: bool,
}

fn default_base_url() -> String {
    crate::DEFAULT_API_URL.to_string()
}
fn default_renewal_delay() -> u64 {
    1000
}
fn default_page_size() -> u32 {
    5
}
fn default_true() -> bool {
    true
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            renewal_delay_ms: default_renewal_delay(),
            timeout_secs: None,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            confirm_delete: true,
        }
    }
}

impl ApiConfig {
    pub fn renewal_delay(&self) -> Duration {
        Duration::from_millis(self.renewal_delay_ms)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Config {
    /// Get config directory path
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|p| p.join("bsa"))
            .ok_or(ConfigError::NoDirFound)
    }

    /// Get config file path, honouring `BSA_CONFIG`
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Ok(PathBuf::from(path));
        }
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load config from default location, then apply environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;

        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Self::default()
        };

        if let Ok(url) = std::env::var(API_URL_ENV) {
            config.api.base_url = url;
        }

        Ok(config)
    }

    /// Load config from specific path
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to specific path
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Resolve where the session blob lives
    pub fn session_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(ref path) = self.session.path {
            return Ok(path.clone());
        }
        dirs::data_dir()
            .map(|p| p.join("bsa").join(format!("{}.json", crate::STORAGE_KEY)))
            .ok_or(ConfigError::NoDirFound)
    }
}
