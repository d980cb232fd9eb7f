use crate::error::{ConnectorError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Main configuration structure
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub repository: RepositoryConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub training: TrainingConfigDefaults,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct RepositoryConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_manifest_timeout_secs")]
    pub manifest_timeout_secs: u64,
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,
}

/// Filesystem layout; unset paths resolve under the XDG data directory
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct StorageConfig {
    pub modules_dir: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct TrainingConfigDefaults {
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
    #[serde(default = "default_epochs")]
    pub default_epochs: u32,
    #[serde(default)]
    pub clear_active_on_failure: bool,
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    5000
}
fn default_base_url() -> String {
    "http://tmeduca.org/annotix/modules/".to_string()
}
fn default_manifest_timeout_secs() -> u64 {
    10
}
fn default_download_timeout_secs() -> u64 {
    30
}
fn default_interpreter() -> String {
    "python3".to_string()
}
fn default_epochs() -> u32 {
    100
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            manifest_timeout_secs: default_manifest_timeout_secs(),
            download_timeout_secs: default_download_timeout_secs(),
        }
    }
}

impl Default for TrainingConfigDefaults {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            default_epochs: default_epochs(),
            clear_active_on_failure: false,
        }
    }
}

impl Config {
    /// Load config from the XDG config path, falling back to defaults
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;

        toml::from_str(&content).map_err(|e| {
            ConnectorError::Config(format!("Failed to parse {}: {e}", path.display()))
        })
    }

    /// Config file location
    pub fn config_path() -> Result<PathBuf> {
        let base = dirs::config_dir()
            .ok_or_else(|| ConnectorError::Config("could not determine config directory".to_string()))?;
        Ok(base.join("annotix-connector").join("config.toml"))
    }
}

impl StorageConfig {
    /// Directory holding one subdirectory per installed module
    pub fn modules_dir(&self) -> Result<PathBuf> {
        match &self.modules_dir {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("modules")),
        }
    }

    /// Directory for transient downloaded archives
    pub fn cache_dir(&self) -> Result<PathBuf> {
        match &self.cache_dir {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("cache")),
        }
    }
}

fn data_dir() -> Result<PathBuf> {
    let base = dirs::data_dir()
        .ok_or_else(|| ConnectorError::Config("could not determine data directory".to_string()))?;
    Ok(base.join("annotix-connector"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.repository.manifest_timeout_secs, 10);
        assert_eq!(config.training.interpreter, "python3");
        assert_eq!(config.training.default_epochs, 100);
        assert!(!config.training.clear_active_on_failure);
    }

    #[test]
    fn test_partial_config_merges_with_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 8080

            [training]
            interpreter = "python3.12"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.training.interpreter, "python3.12");
        assert_eq!(config.training.default_epochs, 100);
        assert_eq!(config.repository.base_url, "http://tmeduca.org/annotix/modules/");
    }

    #[test]
    fn test_storage_overrides() {
        let config: Config = toml::from_str(
            r#"
            [storage]
            modules_dir = "/tmp/annotix-modules"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.storage.modules_dir().unwrap(),
            PathBuf::from("/tmp/annotix-modules")
        );
        // cache dir still resolves to the XDG default
        let cache = config.storage.cache_dir().unwrap();
        assert!(cache.ends_with("annotix-connector/cache"));
    }
}
