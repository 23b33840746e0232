use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub notification_bus: NotificationBusConfig,
    pub capture: CaptureConfig,
}

/// API server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// API server address
    pub address: String,
    /// API server port
    pub port: u16,
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Database URL
    #[serde(default = "default_db_url")]
    pub url: String,
    /// Connection pool max size
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Automatic migration on startup
    #[serde(default = "default_auto_migrate")]
    pub auto_migrate: bool,
}

fn default_db_url() -> String {
    "sqlite://siskamling.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_auto_migrate() -> bool {
    true
}

/// Notification bus configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationBusConfig {
    /// Per-subscriber buffer capacity; the oldest events are dropped when a
    /// slow dashboard falls this far behind
    #[serde(default = "default_bus_capacity")]
    pub buffer_capacity: usize,
}

fn default_bus_capacity() -> usize {
    256
}

/// External collaborator (geolocation / evidence upload) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CaptureConfig {
    /// Geolocation capture timeout in seconds
    #[serde(default = "default_geo_timeout")]
    pub geo_timeout_secs: u64,
    /// Evidence upload timeout in seconds
    #[serde(default = "default_upload_timeout")]
    pub upload_timeout_secs: u64,
}

fn default_geo_timeout() -> u64 {
    10
}

fn default_upload_timeout() -> u64 {
    30
}

impl Default for NotificationBusConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: default_bus_capacity(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            geo_timeout_secs: default_geo_timeout(),
            upload_timeout_secs: default_upload_timeout(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                address: "0.0.0.0".to_string(),
                port: 4850,
                log_level: "info".to_string(),
            },
            database: DatabaseConfig {
                url: default_db_url(),
                max_connections: default_max_connections(),
                auto_migrate: true,
            },
            notification_bus: NotificationBusConfig::default(),
            capture: CaptureConfig::default(),
        }
    }
}

/// Load configuration from a file or use default
pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
    match config_path {
        Some(path) => {
            let config_str = std::fs::read_to_string(path)
                .context(format!("Failed to read config file: {:?}", path))?;

            let config = if path.extension().map_or(false, |ext| ext == "json") {
                serde_json::from_str(&config_str).context("Failed to parse JSON config")?
            } else if path.extension().map_or(false, |ext| ext == "toml") {
                toml::from_str(&config_str).context("Failed to parse TOML config")?
            } else {
                return Err(anyhow::anyhow!("Unsupported config file format"));
            };

            Ok(config)
        }
        None => Ok(Config::default()),
    }
}
