pub mod coordinator;
pub mod status;
pub mod trainer;

use serde::{Deserialize, Serialize};

pub use coordinator::RunCoordinator;
pub use status::{ProgressSink, StatusHandle, TrainingStatus};
pub use trainer::{ProcessTrainer, Trainer};

/// Training configuration passed through from the web UI
///
/// Only the keys the connector itself routes on are modelled; everything
/// else is kept verbatim and handed to the trainer untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
    #[serde(
        default,
        rename = "projectType",
        skip_serializing_if = "Option::is_none"
    )]
    pub project_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epochs: Option<u32>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TrainingConfig {
    /// True when the request carried no recognizable configuration at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.framework.is_none()
            && self.project_type.is_none()
            && self.epochs.is_none()
            && self.extra.is_empty()
    }
}
