use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

mod defaults;

use defaults::*;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub relay: RelayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Where the session-reload key/value store lives
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Pre-buffer size in bytes when the request does not set `cache`
    #[serde(default = "default_prebuffer")]
    pub default_prebuffer: u64,
    /// Ceiling for the client-supplied `cache` pre-buffer; requests
    /// asking for more are clamped, never allocated verbatim
    #[serde(default = "default_max_prebuffer")]
    pub max_prebuffer: u64,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            default_prebuffer: default_prebuffer(),
            max_prebuffer: default_max_prebuffer(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file. A missing file yields the
    /// defaults, so the relay runs without any configuration at all.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("no config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&raw)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.web.host, "127.0.0.1");
        assert_eq!(config.web.port, 53422);
        assert_eq!(config.relay.default_prebuffer, 4096);
        assert_eq!(config.relay.max_prebuffer, 16 * 1024 * 1024);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str("[web]\nport = 9090\n").unwrap();
        assert_eq!(config.web.port, 9090);
        assert_eq!(config.web.host, "127.0.0.1");
        assert_eq!(config.cache.path, PathBuf::from("streamdata.json"));
    }
}
