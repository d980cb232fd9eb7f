use crate::error::{ConnectorError, Result};
use crate::modules::manifest::RemoteManifest;
use futures_util::StreamExt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// Callback receiving download progress as a percentage (0-100)
pub type ProgressFn<'a> = &'a (dyn Fn(f64) + Send + Sync);

/// Downloads module archives and unpacks them into the modules directory
pub struct ModuleInstaller {
    client: reqwest::Client,
    base_url: String,
    modules_dir: PathBuf,
    cache_dir: PathBuf,
    timeout: Duration,
}

impl ModuleInstaller {
    /// Create an installer, ensuring both directories exist
    pub fn new(
        base_url: &str,
        modules_dir: PathBuf,
        cache_dir: PathBuf,
        timeout: Duration,
    ) -> Result<Self> {
        fs::create_dir_all(&modules_dir)?;
        fs::create_dir_all(&cache_dir)?;

        Ok(Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            modules_dir,
            cache_dir,
            timeout,
        })
    }

    /// Download and install a module, replacing any existing install
    ///
    /// The archive is streamed into the cache directory first; the module
    /// directory is only touched once the download has completed. On any
    /// failure the cached archive is removed, so no temporary state survives
    /// a failed install.
    pub async fn install(
        &self,
        manifest: &RemoteManifest,
        module_id: &str,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<()> {
        let descriptor = manifest.find(module_id).ok_or_else(|| {
            ConnectorError::NotFound(format!("module '{module_id}' not found in manifest"))
        })?;

        let url = format!(
            "{}/{}",
            self.base_url,
            descriptor.download_url.trim_start_matches('/')
        );
        let archive_path = self.cache_dir.join(format!("{module_id}.zip"));

        tracing::info!("Downloading module '{module_id}' from {url}");

        let result = self
            .download_and_extract(&url, &archive_path, module_id, progress)
            .await;

        if result.is_err() && archive_path.exists() {
            let _ = fs::remove_file(&archive_path);
        }

        result
    }

    async fn download_and_extract(
        &self,
        url: &str,
        archive_path: &Path,
        module_id: &str,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<()> {
        self.download_archive(url, archive_path, progress).await?;

        // Replace semantics: a reinstall never merges with the old contents
        let module_path = self.modules_dir.join(module_id);
        if module_path.exists() {
            fs::remove_dir_all(&module_path)?;
        }

        self.extract(archive_path)?;
        fs::remove_file(archive_path)?;

        tracing::info!("Module '{module_id}' installed");
        Ok(())
    }

    async fn download_archive(
        &self,
        url: &str,
        dest: &Path,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<()> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ConnectorError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ConnectorError::Network(format!(
                "download returned {}",
                response.status()
            )));
        }

        let total_size = response.content_length();
        let mut downloaded: u64 = 0;

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| ConnectorError::Network(e.to_string()))?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;

            // No progress reports when the server doesn't declare a size
            if let (Some(callback), Some(total)) = (progress, total_size) {
                if total > 0 {
                    #[allow(clippy::cast_precision_loss)]
                    callback(downloaded as f64 / total as f64 * 100.0);
                }
            }
        }

        file.flush().await?;
        Ok(())
    }

    /// Unpack the archive into the modules root
    ///
    /// The archive is expected to carry a top-level directory named after the
    /// module; that is not validated. Entries with absolute or traversal
    /// paths are refused.
    fn extract(&self, archive_path: &Path) -> Result<()> {
        let file = fs::File::open(archive_path)?;
        let mut archive = zip::ZipArchive::new(file)
            .map_err(|e| ConnectorError::Module(format!("invalid module archive: {e}")))?;

        for i in 0..archive.len() {
            let mut entry = archive
                .by_index(i)
                .map_err(|e| ConnectorError::Module(format!("invalid module archive: {e}")))?;

            let entry_path = match entry.enclosed_name() {
                Some(path) => path.to_owned(),
                None => {
                    return Err(ConnectorError::Module(format!(
                        "refusing to extract entry with unsafe path: {}",
                        entry.name()
                    )));
                }
            };

            let target = self.modules_dir.join(entry_path);

            if entry.is_dir() {
                fs::create_dir_all(&target)?;
            } else {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                let mut outfile = fs::File::create(&target)?;
                std::io::copy(&mut entry, &mut outfile)?;
            }
        }

        Ok(())
    }
}
