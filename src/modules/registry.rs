use crate::modules::manifest::ModuleDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// File marking a directory as a module package
pub const PACKAGE_MARKER: &str = "__init__.py";

/// Per-module metadata file
pub const METADATA_FILE: &str = "module.json";

/// A module present in the local modules directory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstalledModule {
    pub id: String,
    pub version: String,
    pub installed_at: String,
    /// The module's metadata document, stored verbatim
    pub metadata: serde_json::Value,
}

/// Result of checking whether a module is usable or fetchable
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Availability {
    pub installed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_available: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

impl Availability {
    /// Module is installed locally; the manifest is not consulted
    #[must_use]
    pub fn installed(version: &str) -> Self {
        Self {
            installed: true,
            available: None,
            version: Some(version.to_string()),
            update_available: Some(false),
            download_url: None,
        }
    }

    /// Module is absent locally but advertised by the repository
    #[must_use]
    pub fn downloadable(descriptor: &ModuleDescriptor) -> Self {
        Self {
            installed: false,
            available: Some(true),
            version: Some(descriptor.version.clone()),
            update_available: None,
            download_url: Some(descriptor.download_url.clone()),
        }
    }

    /// Module is neither installed nor in the catalog
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            installed: false,
            available: Some(false),
            version: None,
            update_available: None,
            download_url: None,
        }
    }
}

/// Snapshot of the modules installed on disk
///
/// The snapshot is taken at construction and refreshed after every
/// successful install.
pub struct ModuleRegistry {
    modules_dir: PathBuf,
    installed: RwLock<HashMap<String, InstalledModule>>,
}

impl ModuleRegistry {
    /// Create a registry over `modules_dir`, scanning it immediately
    #[must_use]
    pub fn new(modules_dir: PathBuf) -> Self {
        let installed = RwLock::new(Self::scan_dir(&modules_dir));
        Self {
            modules_dir,
            installed,
        }
    }

    /// Replace the snapshot with a fresh scan of the modules directory
    pub async fn rescan(&self) {
        let scanned = Self::scan_dir(&self.modules_dir);
        *self.installed.write().await = scanned;
    }

    /// All installed modules, keyed by id
    pub async fn installed(&self) -> HashMap<String, InstalledModule> {
        self.installed.read().await.clone()
    }

    /// Installed module ids, sorted
    pub async fn installed_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.installed.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Look up a single installed module
    pub async fn get(&self, module_id: &str) -> Option<InstalledModule> {
        self.installed.read().await.get(module_id).cloned()
    }

    pub async fn is_installed(&self, module_id: &str) -> bool {
        self.installed.read().await.contains_key(module_id)
    }

    /// Walk the modules directory, collecting valid module packages
    ///
    /// A subdirectory counts only if it has both the package marker and a
    /// parseable metadata file; anything else is skipped without error.
    fn scan_dir(modules_dir: &Path) -> HashMap<String, InstalledModule> {
        let mut installed = HashMap::new();

        let Ok(entries) = fs::read_dir(modules_dir) else {
            return installed;
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() || !path.join(PACKAGE_MARKER).exists() {
                continue;
            }

            let metadata_path = path.join(METADATA_FILE);
            let Ok(content) = fs::read_to_string(&metadata_path) else {
                continue;
            };
            let Ok(metadata) = serde_json::from_str::<serde_json::Value>(&content) else {
                tracing::debug!("Skipping module with malformed metadata: {}", path.display());
                continue;
            };
            let Some(id) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };

            let version = metadata
                .get("version")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_string();

            let installed_at = fs::metadata(&path)
                .ok()
                .and_then(|m| m.modified().ok())
                .map(|t| chrono::DateTime::<chrono::Utc>::from(t).to_rfc3339())
                .unwrap_or_default();

            installed.insert(
                id.to_string(),
                InstalledModule {
                    id: id.to_string(),
                    version,
                    installed_at,
                    metadata,
                },
            );
        }

        installed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_module(dir: &Path, id: &str, metadata: &str) {
        let module_dir = dir.join(id);
        fs::create_dir_all(&module_dir).unwrap();
        fs::write(module_dir.join(PACKAGE_MARKER), "").unwrap();
        fs::write(module_dir.join(METADATA_FILE), metadata).unwrap();
    }

    #[tokio::test]
    async fn test_scan_finds_valid_modules() {
        let temp = TempDir::new().unwrap();
        write_module(temp.path(), "ultralytics_yolo", r#"{"version": "1.2.0", "author": "tmh"}"#);
        write_module(temp.path(), "pytorch_custom", r#"{"version": "0.9.1"}"#);

        let registry = ModuleRegistry::new(temp.path().to_path_buf());
        let installed = registry.installed().await;

        assert_eq!(installed.len(), 2);
        let yolo = &installed["ultralytics_yolo"];
        assert_eq!(yolo.version, "1.2.0");
        assert_eq!(yolo.metadata["author"], "tmh");
        assert!(!yolo.installed_at.is_empty());
        assert_eq!(registry.installed_ids().await, vec!["pytorch_custom", "ultralytics_yolo"]);
    }

    #[tokio::test]
    async fn test_scan_skips_directories_missing_marker_or_metadata() {
        let temp = TempDir::new().unwrap();

        // No package marker
        let no_marker = temp.path().join("no_marker");
        fs::create_dir_all(&no_marker).unwrap();
        fs::write(no_marker.join(METADATA_FILE), r#"{"version": "1.0"}"#).unwrap();

        // No metadata file
        let no_metadata = temp.path().join("no_metadata");
        fs::create_dir_all(&no_metadata).unwrap();
        fs::write(no_metadata.join(PACKAGE_MARKER), "").unwrap();

        // Malformed metadata
        write_module(temp.path(), "broken", "{not json");

        // Plain file at the top level
        fs::write(temp.path().join("manifest.json"), "{}").unwrap();

        let registry = ModuleRegistry::new(temp.path().to_path_buf());
        assert!(registry.installed().await.is_empty());
    }

    #[tokio::test]
    async fn test_version_defaults_to_unknown() {
        let temp = TempDir::new().unwrap();
        write_module(temp.path(), "m1", r#"{"description": "no version field"}"#);

        let registry = ModuleRegistry::new(temp.path().to_path_buf());
        assert_eq!(registry.get("m1").await.unwrap().version, "unknown");
    }

    #[tokio::test]
    async fn test_rescan_picks_up_new_modules() {
        let temp = TempDir::new().unwrap();
        let registry = ModuleRegistry::new(temp.path().to_path_buf());
        assert!(!registry.is_installed("m1").await);

        write_module(temp.path(), "m1", r#"{"version": "1.0"}"#);
        registry.rescan().await;

        assert!(registry.is_installed("m1").await);
    }

    #[tokio::test]
    async fn test_missing_modules_dir_is_empty() {
        let temp = TempDir::new().unwrap();
        let registry = ModuleRegistry::new(temp.path().join("does_not_exist"));
        assert!(registry.installed().await.is_empty());
    }

    #[test]
    fn test_availability_shapes() {
        let installed = Availability::installed("1.0");
        let json = serde_json::to_value(&installed).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"installed": true, "version": "1.0", "update_available": false})
        );

        let descriptor = ModuleDescriptor {
            id: "m1".to_string(),
            version: "2.0".to_string(),
            download_url: "m1.zip".to_string(),
        };
        let downloadable = serde_json::to_value(Availability::downloadable(&descriptor)).unwrap();
        assert_eq!(
            downloadable,
            serde_json::json!({
                "installed": false,
                "available": true,
                "version": "2.0",
                "download_url": "m1.zip"
            })
        );

        let unavailable = serde_json::to_value(Availability::unavailable()).unwrap();
        assert_eq!(
            unavailable,
            serde_json::json!({"installed": false, "available": false})
        );
    }
}
