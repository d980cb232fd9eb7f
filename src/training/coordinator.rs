use crate::training::status::{ProgressSink, StatusHandle, TrainingStatus};
use crate::training::trainer::Trainer;
use crate::training::TrainingConfig;
use std::path::PathBuf;
use std::sync::Arc;

/// Owns the single training slot and launches background runs
///
/// Submissions are not serialized: a second request while one run is active
/// overwrites the shared record, and whichever trainer reports last wins.
pub struct RunCoordinator {
    status: StatusHandle,
    default_epochs: u32,
    /// When set, an uncaught trainer failure also clears the active flag.
    /// Off by default: historically a failed run left the slot marked active
    /// and clients relied on polling the unchanged record.
    clear_active_on_failure: bool,
}

impl RunCoordinator {
    #[must_use]
    pub fn new(default_epochs: u32, clear_active_on_failure: bool) -> Self {
        Self {
            status: StatusHandle::new(),
            default_epochs,
            clear_active_on_failure,
        }
    }

    /// Current status snapshot for polling callers
    pub async fn snapshot(&self) -> TrainingStatus {
        self.status.snapshot().await
    }

    /// Launch a training run detached from the caller
    ///
    /// Returns as soon as the run is spawned; completion is only observable
    /// through the status record.
    pub async fn start(&self, trainer: Arc<dyn Trainer>, config: TrainingConfig, dataset: PathBuf) {
        let total_epochs = config.epochs.unwrap_or(self.default_epochs);
        self.status.begin(total_epochs).await;

        let sink: Arc<dyn ProgressSink> = Arc::new(self.status.clone());
        let status = self.status.clone();
        let clear_on_failure = self.clear_active_on_failure;

        tokio::spawn(async move {
            tracing::info!("Training run started");
            if let Err(e) = trainer.run(&config, &dataset, sink).await {
                tracing::error!("Training run failed: {e}");
                if clear_on_failure {
                    status.fail(&format!("training failed: {e}")).await;
                }
            }
        });
    }
}
