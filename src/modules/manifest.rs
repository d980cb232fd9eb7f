use crate::error::{ConnectorError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A module advertised by the remote repository
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModuleDescriptor {
    pub id: String,
    #[serde(default = "unknown_version")]
    pub version: String,
    #[serde(default)]
    pub download_url: String,
}

fn unknown_version() -> String {
    "unknown".to_string()
}

/// Remote catalog of downloadable modules
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteManifest {
    #[serde(default)]
    pub modules: Vec<ModuleDescriptor>,
}

impl RemoteManifest {
    /// Find descriptor by module id
    #[must_use]
    pub fn find(&self, module_id: &str) -> Option<&ModuleDescriptor> {
        self.modules.iter().find(|m| m.id == module_id)
    }
}

/// Fetches the remote module catalog, with a local-file fallback
pub struct ManifestClient {
    client: reqwest::Client,
    manifest_url: String,
    fallback_path: PathBuf,
    timeout: Duration,
}

impl ManifestClient {
    /// Create a client for the repository at `base_url`
    ///
    /// The fallback manifest lives at `<modules_dir>/manifest.json`.
    #[must_use]
    pub fn new(base_url: &str, modules_dir: &Path, timeout: Duration) -> Self {
        let manifest_url = format!("{}/manifest.json", base_url.trim_end_matches('/'));
        Self {
            client: reqwest::Client::new(),
            manifest_url,
            fallback_path: modules_dir.join("manifest.json"),
            timeout,
        }
    }

    /// Fetch the remote catalog
    ///
    /// Never fails the caller: any fetch or parse problem falls back to the
    /// cached local manifest, and to an empty catalog if that is missing too.
    /// Lookups for modules that are actually unavailable then fail downstream.
    pub async fn fetch(&self) -> RemoteManifest {
        match self.fetch_remote().await {
            Ok(manifest) => manifest,
            Err(e) => {
                tracing::warn!("Failed to fetch remote manifest: {e}");
                self.load_fallback()
            }
        }
    }

    async fn fetch_remote(&self) -> Result<RemoteManifest> {
        let response = self
            .client
            .get(&self.manifest_url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ConnectorError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ConnectorError::Network(format!(
                "manifest request returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ConnectorError::Network(format!("malformed manifest: {e}")))
    }

    fn load_fallback(&self) -> RemoteManifest {
        match std::fs::read_to_string(&self.fallback_path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(manifest) => {
                    tracing::info!("Using local manifest at {}", self.fallback_path.display());
                    manifest
                }
                Err(e) => {
                    tracing::warn!(
                        "Local manifest {} is malformed: {e}",
                        self.fallback_path.display()
                    );
                    RemoteManifest::default()
                }
            },
            Err(_) => RemoteManifest::default(),
        }
    }
}
