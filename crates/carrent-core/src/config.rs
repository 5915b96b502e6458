//! Application configuration management.
//!
//! This module handles loading and saving the client configuration: the
//! marketplace API address, where the session token is kept, the polling
//! interval and the last wallet account used.
//!
//! Configuration is stored at `~/.config/carrent/config.json`; the
//! `CARRENT_API_URL` and `CARRENT_TOKEN_STORAGE` environment variables
//! override the file.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "carrent";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Marketplace API used when nothing else is configured
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";

/// GPS and notification refresh period
const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

const ENV_API_URL: &str = "CARRENT_API_URL";
const ENV_TOKEN_STORAGE: &str = "CARRENT_TOKEN_STORAGE";

/// Where the session token is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenBackend {
    #[default]
    File,
    Keyring,
    Memory,
}

impl FromStr for TokenBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(TokenBackend::File),
            "keyring" => Ok(TokenBackend::Keyring),
            "memory" => Ok(TokenBackend::Memory),
            other => Err(anyhow::anyhow!("Unknown token storage: {}", other)),
        }
    }
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default)]
    pub token_storage: TokenBackend,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default)]
    pub last_account: Option<String>,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            token_storage: TokenBackend::default(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            last_account: None,
            log_file: None,
        }
    }
}

impl Config {
    /// Load the config file (or defaults) and apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path).context("Failed to read config file")?;
            serde_json::from_str(&contents).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var(ENV_API_URL).filter(|u| !u.trim().is_empty()) {
            self.api_base_url = url.trim().to_string();
        }
        if let Some(backend) = var(ENV_TOKEN_STORAGE) {
            match backend.parse() {
                Ok(backend) => self.token_storage = backend,
                Err(e) => warn!(error = %e, "Ignoring {}", ENV_TOKEN_STORAGE),
            }
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_for_missing_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = Config::load_from(&dir.path().join("config.json")).expect("load");
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.token_storage, TokenBackend::File);
        assert_eq!(config.poll_interval(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"token_storage":"keyring","last_account":"0xabc"}"#)
            .expect("write");
        let config = Config::load_from(&path).expect("load");
        assert_eq!(config.token_storage, TokenBackend::Keyring);
        assert_eq!(config.last_account.as_deref(), Some("0xabc"));
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            poll_interval_secs: 5,
            ..Config::default()
        };
        config.save_to(&path).expect("save");
        let reloaded = Config::load_from(&path).expect("load");
        assert_eq!(reloaded.poll_interval_secs, 5);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env(|key| match key {
            ENV_API_URL => Some("http://api.example:9000".to_string()),
            ENV_TOKEN_STORAGE => Some("Memory".to_string()),
            _ => None,
        });
        assert_eq!(config.api_base_url, "http://api.example:9000");
        assert_eq!(config.token_storage, TokenBackend::Memory);

        config.apply_env(|key| (key == ENV_TOKEN_STORAGE).then(|| "vault".to_string()));
        assert_eq!(config.token_storage, TokenBackend::Memory);
    }
}
