use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct UpstreamConfig {
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        UpstreamConfig {
            base_url: "https://api.binance.com".to_string(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_save_interval_secs")]
    pub save_interval_secs: u64,
    #[serde(default = "default_symbol_refresh_secs")]
    pub symbol_refresh_secs: u64,
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
    #[serde(default = "default_freshness_secs")]
    pub freshness_secs: i64,
    pub data_path: Option<String>,
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_save_interval_secs() -> u64 {
    30
}

fn default_symbol_refresh_secs() -> u64 {
    3600
}

fn default_retention_days() -> i64 {
    7
}

fn default_freshness_secs() -> i64 {
    60
}

impl AppConfig {
    /// Loads the config from its default location, falling back to defaults
    /// when no file has been written yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config file found, using defaults");
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "coinconv", "coinconv")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    /// Directory holding the quote store.
    pub fn data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("dev", "coinconv", "coinconv")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
upstream:
  base_url: "http://localhost:9000"
server:
  host: "127.0.0.1"
  port: 8080
poll_interval_secs: 5
save_interval_secs: 15
retention_days: 14
freshness_secs: 120
data_path: "/tmp/coinconv"
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.upstream.base_url, "http://localhost:9000");
        assert_eq!(config.upstream.request_timeout_secs, 10);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.poll_interval_secs, 5);
        assert_eq!(config.save_interval_secs, 15);
        assert_eq!(config.retention_days, 14);
        assert_eq!(config.freshness_secs, 120);
        assert_eq!(config.data_path.as_deref(), Some("/tmp/coinconv"));
    }

    #[test]
    fn test_config_defaults() {
        let config: AppConfig = serde_yaml::from_str("{}").expect("Failed to deserialize");
        assert_eq!(config.upstream.base_url, "https://api.binance.com");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.poll_interval_secs, 10);
        assert_eq!(config.save_interval_secs, 30);
        assert_eq!(config.symbol_refresh_secs, 3600);
        assert_eq!(config.retention_days, 7);
        assert_eq!(config.freshness_secs, 60);
        assert!(config.data_path.is_none());
    }
}
