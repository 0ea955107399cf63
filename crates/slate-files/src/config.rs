//! Files-service configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Top-level service configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Completion service settings for search.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Directory for uploaded file bytes.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,
}

/// Completion service settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_llm_model")]
    pub model: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "slate_files=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    5000
}

fn default_db_path() -> String {
    "files.db".to_string()
}

fn default_upload_dir() -> String {
    "uploads".to_string()
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            upload_dir: default_upload_dir(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            api_key: String::new(),
            model: default_llm_model(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `SLATE_FILES_HOST` overrides `server.host`
/// - `SLATE_FILES_PORT` overrides `server.port`
/// - `SLATE_FILES_DB_PATH` overrides `storage.db_path`
/// - `SLATE_FILES_UPLOAD_DIR` overrides `storage.upload_dir`
/// - `SLATE_LLM_BASE_URL` / `SLATE_LLM_API_KEY` / `SLATE_LLM_MODEL`
/// - `SLATE_LOG_LEVEL` overrides `logging.level`
/// - `SLATE_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    // Environment variable overrides
    if let Ok(host) = std::env::var("SLATE_FILES_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Ok(port) = std::env::var("SLATE_FILES_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Ok(db_path) = std::env::var("SLATE_FILES_DB_PATH") {
        config.storage.db_path = db_path;
    }
    if let Ok(upload_dir) = std::env::var("SLATE_FILES_UPLOAD_DIR") {
        config.storage.upload_dir = upload_dir;
    }
    if let Ok(url) = std::env::var("SLATE_LLM_BASE_URL") {
        config.llm.base_url = url;
    }
    if let Ok(key) = std::env::var("SLATE_LLM_API_KEY") {
        config.llm.api_key = key;
    }
    if let Ok(model) = std::env::var("SLATE_LLM_MODEL") {
        config.llm.model = model;
    }
    if let Ok(level) = std::env::var("SLATE_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(json) = std::env::var("SLATE_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }

    Ok(config)
}
