use crate::error::{ConnectorError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;

const DIALOG_TITLE: &str = "Select the dataset folder with images and labels";

/// Asks the user for the dataset directory
#[async_trait]
pub trait FolderPicker: Send + Sync {
    /// `Ok(None)` means the user cancelled the dialog
    async fn pick_folder(&self) -> Result<Option<PathBuf>>;
}

/// Folder picker backed by the desktop's native dialog helper
///
/// Uses whichever helper is installed: zenity or kdialog on Linux/BSD,
/// osascript on macOS. The helper prints the chosen path on stdout and
/// exits non-zero when the dialog is dismissed.
pub struct NativeDialogPicker;

#[cfg(target_os = "macos")]
fn dialog_command() -> Result<Command> {
    let program = which::which("osascript")
        .map_err(|_| ConnectorError::Dialog("osascript not found in PATH".to_string()))?;
    let mut cmd = Command::new(program);
    cmd.arg("-e").arg(format!(
        "POSIX path of (choose folder with prompt \"{DIALOG_TITLE}\")"
    ));
    Ok(cmd)
}

#[cfg(not(target_os = "macos"))]
fn dialog_command() -> Result<Command> {
    if let Ok(zenity) = which::which("zenity") {
        let mut cmd = Command::new(zenity);
        cmd.arg("--file-selection")
            .arg("--directory")
            .arg(format!("--title={DIALOG_TITLE}"));
        return Ok(cmd);
    }

    if let Ok(kdialog) = which::which("kdialog") {
        let mut cmd = Command::new(kdialog);
        cmd.arg("--getexistingdirectory")
            .arg(".")
            .arg("--title")
            .arg(DIALOG_TITLE);
        return Ok(cmd);
    }

    Err(ConnectorError::Dialog(
        "no folder dialog helper found in PATH. Install zenity or kdialog".to_string(),
    ))
}

#[async_trait]
impl FolderPicker for NativeDialogPicker {
    async fn pick_folder(&self) -> Result<Option<PathBuf>> {
        let mut cmd = dialog_command()?;

        tracing::info!("Waiting for dataset folder selection");
        let output = cmd
            .output()
            .await
            .map_err(|e| ConnectorError::Dialog(format!("failed to run folder dialog: {e}")))?;

        if !output.status.success() {
            // Dialog dismissed
            return Ok(None);
        }

        let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if path.is_empty() {
            return Ok(None);
        }

        Ok(Some(PathBuf::from(path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialog_command_availability() {
        // Environment-dependent: on a headless CI box no helper is
        // installed, and we expect the install-hint error
        if let Err(err) = dialog_command() {
            assert!(matches!(err, ConnectorError::Dialog(_)));
            assert!(err.to_string().contains("Install"));
        }
    }
}
