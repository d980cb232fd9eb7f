use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Snapshot of the single training slot
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TrainingStatus {
    pub active: bool,
    pub progress: f64,
    pub current_epoch: u32,
    pub total_epochs: u32,
    pub message: String,
}

impl Default for TrainingStatus {
    fn default() -> Self {
        Self {
            active: false,
            progress: 0.0,
            current_epoch: 0,
            total_epochs: 0,
            message: String::new(),
        }
    }
}

/// Receives progress reports from a running trainer
///
/// Implementations must tolerate being called zero or more times; a trainer
/// that never reports is valid (if unhelpful).
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn report(&self, progress: f64, epoch: u32, message: &str);
}

/// Shared handle to the training status record
///
/// Cloning is cheap; all clones observe the same record. Readers always see
/// a consistent snapshot, but overlapping runs are not excluded: the last
/// writer wins.
#[derive(Clone, Default)]
pub struct StatusHandle {
    inner: Arc<RwLock<TrainingStatus>>,
}

impl StatusHandle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status, cloned out of the lock
    pub async fn snapshot(&self) -> TrainingStatus {
        self.inner.read().await.clone()
    }

    /// Reset the record for a freshly started run
    pub(crate) async fn begin(&self, total_epochs: u32) {
        *self.inner.write().await = TrainingStatus {
            active: true,
            progress: 0.0,
            current_epoch: 0,
            total_epochs,
            message: "starting training".to_string(),
        };
    }

    /// Mark the run as failed, clearing the active flag
    pub(crate) async fn fail(&self, message: &str) {
        let mut status = self.inner.write().await;
        status.active = false;
        status.message = message.to_string();
    }
}

#[async_trait]
impl ProgressSink for StatusHandle {
    async fn report(&self, progress: f64, epoch: u32, message: &str) {
        let mut status = self.inner.write().await;
        status.progress = progress;
        status.current_epoch = epoch;
        status.message = message.to_string();

        // Completion is signalled through the progress value itself
        if progress >= 100.0 {
            status.active = false;
        }
    }
}
