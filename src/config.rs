//! Configuration management for Mira
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{MiraError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure for Mira
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Assistant backend connection settings
    #[serde(default)]
    pub api: ApiConfig,
    /// Where chat state is persisted
    #[serde(default)]
    pub storage: StorageConfig,
    /// Session list limits
    #[serde(default)]
    pub sessions: SessionsConfig,
}

/// Assistant backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the backend; `/api/...` paths are resolved against it
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout (seconds)
    #[serde(default = "default_api_timeout")]
    pub timeout_seconds: u64,

    /// How many times a failed `/api/initialize` is retried
    #[serde(default = "default_initialize_max_retries")]
    pub initialize_max_retries: u32,

    /// Delay before each initialize retry (milliseconds)
    #[serde(default = "default_initialize_retry_delay_ms")]
    pub initialize_retry_delay_ms: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_api_timeout() -> u64 {
    120
}

fn default_initialize_max_retries() -> u32 {
    1
}

fn default_initialize_retry_delay_ms() -> u64 {
    3000
}

impl ApiConfig {
    /// Request timeout as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Initialize retry delay as a `Duration`
    pub fn initialize_retry_delay(&self) -> Duration {
        Duration::from_millis(self.initialize_retry_delay_ms)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_api_timeout(),
            initialize_max_retries: default_initialize_max_retries(),
            initialize_retry_delay_ms: default_initialize_retry_delay_ms(),
        }
    }
}

/// Snapshot storage backend
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Single SQLite database file
    #[default]
    Sqlite,
    /// Directory with one JSON file per slot
    Json,
}

impl std::str::FromStr for StorageBackend {
    type Err = MiraError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(StorageBackend::Sqlite),
            "json" => Ok(StorageBackend::Json),
            other => Err(MiraError::Config(format!(
                "Invalid storage backend: {}. Must be one of: sqlite, json",
                other
            ))),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend to use
    #[serde(default)]
    pub backend: StorageBackend,

    /// Database file (sqlite) or directory (json); platform data dir when unset
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Session list configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionsConfig {
    /// Maximum number of session summaries kept
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Characters of the first user message used as the session title
    #[serde(default = "default_title_chars")]
    pub title_chars: usize,

    /// Characters of the latest message used as the session preview
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
}

fn default_max_sessions() -> usize {
    20
}

fn default_title_chars() -> usize {
    50
}

fn default_preview_chars() -> usize {
    100
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            max_sessions: default_max_sessions(),
            title_chars: default_title_chars(),
            preview_chars: default_preview_chars(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| MiraError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| MiraError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(base_url) = std::env::var("MIRA_API_BASE") {
            tracing::debug!(base_url = %base_url, "Env override: MIRA_API_BASE");
            self.api.base_url = base_url;
        }

        if let Ok(timeout) = std::env::var("MIRA_API_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.api.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid MIRA_API_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(backend) = std::env::var("MIRA_STORAGE_BACKEND") {
            match backend.parse::<StorageBackend>() {
                Ok(value) => self.storage.backend = value,
                Err(e) => tracing::warn!("{}, using {:?}", e, self.storage.backend),
            }
        }

        if let Ok(path) = std::env::var("MIRA_STORAGE_PATH") {
            tracing::debug!(path = %path, "Env override: MIRA_STORAGE_PATH");
            self.storage.path = Some(PathBuf::from(path));
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(base_url) = &cli.api_base {
            self.api.base_url = base_url.clone();
        }
        if let Some(path) = &cli.storage_path {
            tracing::info!("Using storage override from CLI: {}", path);
            self.storage.path = Some(PathBuf::from(path));
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.api.base_url).map_err(|e| {
            MiraError::Config(format!("Invalid api.base_url {}: {}", self.api.base_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(MiraError::Config(format!(
                "api.base_url must use http or https, got {}",
                url.scheme()
            ))
            .into());
        }

        if self.api.timeout_seconds == 0 {
            return Err(MiraError::Config(
                "api.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.sessions.max_sessions == 0 {
            return Err(MiraError::Config(
                "sessions.max_sessions must be greater than 0".to_string(),
            )
            .into());
        }

        if self.sessions.title_chars == 0 || self.sessions.preview_chars == 0 {
            return Err(MiraError::Config(
                "sessions.title_chars and sessions.preview_chars must be greater than 0"
                    .to_string(),
            )
            .into());
        }

        Ok(())
    }
}
