use crate::config::Config;
use crate::error::Result;
use crate::modules::installer::{ModuleInstaller, ProgressFn};
use crate::modules::loader::ModuleLoader;
use crate::modules::manifest::{ManifestClient, RemoteManifest};
use crate::modules::registry::{Availability, InstalledModule, ModuleRegistry};
use crate::training::Trainer;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Façade over the module subsystem: catalog, local registry, installer,
/// and trainer resolution behind one handle
pub struct ModuleManager {
    manifest: ManifestClient,
    registry: ModuleRegistry,
    installer: ModuleInstaller,
    loader: ModuleLoader,
}

impl ModuleManager {
    /// Create a manager using the configured storage locations
    pub fn new(config: &Config) -> Result<Self> {
        let modules_dir = config.storage.modules_dir()?;
        let cache_dir = config.storage.cache_dir()?;
        Self::with_dirs(config, modules_dir, cache_dir)
    }

    /// Create a manager over explicit directories (for testing)
    pub fn with_dirs(config: &Config, modules_dir: PathBuf, cache_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&modules_dir)?;
        std::fs::create_dir_all(&cache_dir)?;

        let repository = &config.repository;
        let manifest = ManifestClient::new(
            &repository.base_url,
            &modules_dir,
            Duration::from_secs(repository.manifest_timeout_secs),
        );
        let installer = ModuleInstaller::new(
            &repository.base_url,
            modules_dir.clone(),
            cache_dir,
            Duration::from_secs(repository.download_timeout_secs),
        )?;
        let loader = ModuleLoader::new(modules_dir.clone(), config.training.interpreter.clone());
        let registry = ModuleRegistry::new(modules_dir);

        Ok(Self {
            manifest,
            registry,
            installer,
            loader,
        })
    }

    /// All installed modules, keyed by id
    pub async fn installed(&self) -> HashMap<String, InstalledModule> {
        self.registry.installed().await
    }

    /// Installed module ids, sorted
    pub async fn installed_ids(&self) -> Vec<String> {
        self.registry.installed_ids().await
    }

    pub async fn is_installed(&self, module_id: &str) -> bool {
        self.registry.is_installed(module_id).await
    }

    /// The remote catalog, fetched fresh (with local fallback)
    pub async fn remote_manifest(&self) -> RemoteManifest {
        self.manifest.fetch().await
    }

    /// Whether a module is installed, downloadable, or neither
    ///
    /// An installed module wins outright; the catalog is only consulted for
    /// ids that are absent locally.
    pub async fn availability(&self, module_id: &str) -> Availability {
        if let Some(record) = self.registry.get(module_id).await {
            return Availability::installed(&record.version);
        }

        let manifest = self.manifest.fetch().await;
        match manifest.find(module_id) {
            Some(descriptor) => Availability::downloadable(descriptor),
            None => Availability::unavailable(),
        }
    }

    /// Download and install a module, then refresh the registry snapshot
    pub async fn install(&self, module_id: &str, progress: Option<ProgressFn<'_>>) -> Result<()> {
        let manifest = self.manifest.fetch().await;
        self.installer.install(&manifest, module_id, progress).await?;
        self.registry.rescan().await;
        Ok(())
    }

    /// Install a module only if it isn't present yet
    pub async fn ensure_installed(&self, module_id: &str) -> Result<()> {
        if self.is_installed(module_id).await {
            return Ok(());
        }
        tracing::info!("Module '{module_id}' not installed, downloading");
        self.install(module_id, None).await
    }

    /// Resolve the training entry point of an installed module
    pub fn resolve_trainer(&self, module_id: &str) -> Result<Arc<dyn Trainer>> {
        Ok(Arc::new(self.loader.resolve(module_id)?))
    }
}
