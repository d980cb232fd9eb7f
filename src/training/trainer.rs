use crate::error::{ConnectorError, Result};
use crate::training::status::ProgressSink;
use crate::training::TrainingConfig;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;

/// A training entry point resolved from an installed module
///
/// The connector never calls a trainer more than once per request; the
/// implementation runs to completion or errors, reporting progress through
/// the sink as it goes.
#[async_trait]
pub trait Trainer: Send + Sync {
    async fn run(
        &self,
        config: &TrainingConfig,
        dataset: &Path,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<()>;
}

/// Progress event a trainer process emits on stdout, one JSON object per line
#[derive(Debug, Deserialize)]
struct ProgressEvent {
    progress: f64,
    #[serde(default)]
    epoch: u32,
    #[serde(default)]
    message: String,
}

/// Runs a module's `train.py` in a child interpreter
///
/// The configuration is fed to the child as JSON on stdin and the dataset
/// path as an argument. The modules root goes on `PYTHONPATH` so the entry
/// script can import its own package. Progress comes back as line-delimited
/// JSON on stdout; anything that doesn't parse is treated as ordinary
/// trainer output and logged.
#[derive(Debug)]
pub struct ProcessTrainer {
    interpreter: String,
    script: PathBuf,
    modules_dir: PathBuf,
}

impl ProcessTrainer {
    #[must_use]
    pub fn new(interpreter: String, script: PathBuf, modules_dir: PathBuf) -> Self {
        Self {
            interpreter,
            script,
            modules_dir,
        }
    }

    /// Path of the entry script this trainer will execute
    #[must_use]
    pub fn script(&self) -> &Path {
        &self.script
    }
}

#[async_trait]
impl Trainer for ProcessTrainer {
    async fn run(
        &self,
        config: &TrainingConfig,
        dataset: &Path,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<()> {
        let config_json = serde_json::to_string(config)
            .map_err(|e| ConnectorError::Trainer(format!("failed to encode config: {e}")))?;

        let mut child = Command::new(&self.interpreter)
            .arg("-u")
            .arg(&self.script)
            .arg("--dataset")
            .arg(dataset)
            .env("PYTHONPATH", &self.modules_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                ConnectorError::Trainer(format!("failed to spawn {}: {e}", self.interpreter))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // A trainer that never reads its config closes the pipe early;
            // that is its business, not a failure
            if let Err(e) = stdin.write_all(config_json.as_bytes()).await {
                tracing::debug!("trainer did not read config: {e}");
            }
            // Dropping the handle closes the pipe so the child sees EOF
        }

        // Drain stderr in the background so a chatty child can't block on a
        // full pipe while we read stdout
        let stderr_task = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut buf = String::new();
                let _ = stderr.read_to_string(&mut buf).await;
                buf
            })
        });

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ConnectorError::Trainer("child stdout not captured".to_string()))?;
        let mut lines = BufReader::new(stdout).lines();

        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| ConnectorError::Trainer(format!("failed to read trainer output: {e}")))?
        {
            match serde_json::from_str::<ProgressEvent>(&line) {
                Ok(event) => sink.report(event.progress, event.epoch, &event.message).await,
                Err(_) => tracing::debug!("trainer output: {line}"),
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| ConnectorError::Trainer(format!("failed to wait for trainer: {e}")))?;

        let stderr_text = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        if !status.success() {
            return Err(ConnectorError::Trainer(format!(
                "training process exited with {status}: {}",
                stderr_text.trim()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Sink that records every report for later inspection
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub reports: Mutex<Vec<(f64, u32, String)>>,
    }

    #[async_trait]
    impl ProgressSink for RecordingSink {
        async fn report(&self, progress: f64, epoch: u32, message: &str) {
            self.reports
                .lock()
                .unwrap()
                .push((progress, epoch, message.to_string()));
        }
    }

    fn write_script(dir: &Path, content: &str) -> PathBuf {
        let script = dir.join("train.py");
        std::fs::write(&script, content).unwrap();
        script
    }

    // `sh -u` stands in for the interpreter so the tests don't need python
    fn sh_trainer(script: PathBuf, modules_dir: PathBuf) -> ProcessTrainer {
        ProcessTrainer::new("sh".to_string(), script, modules_dir)
    }

    #[tokio::test]
    async fn test_process_trainer_forwards_progress_events() {
        let temp = TempDir::new().unwrap();
        let script = write_script(
            temp.path(),
            concat!(
                "cat > /dev/null\n",
                "printf '{\"progress\": 50.0, \"epoch\": 1, \"message\": \"halfway\"}\\n'\n",
                "printf 'plain log line\\n'\n",
                "printf '{\"progress\": 100.0, \"epoch\": 2, \"message\": \"done\"}\\n'\n",
            ),
        );

        let trainer = sh_trainer(script, temp.path().to_path_buf());
        let sink = Arc::new(RecordingSink::default());

        trainer
            .run(
                &TrainingConfig::default(),
                Path::new("/tmp/dataset"),
                sink.clone(),
            )
            .await
            .unwrap();

        let reports = sink.reports.lock().unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0], (50.0, 1, "halfway".to_string()));
        assert_eq!(reports[1], (100.0, 2, "done".to_string()));
    }

    #[tokio::test]
    async fn test_process_trainer_surfaces_nonzero_exit() {
        let temp = TempDir::new().unwrap();
        let script = write_script(
            temp.path(),
            concat!(
                "cat > /dev/null\n",
                "echo 'dataset missing labels' >&2\n",
                "exit 3\n",
            ),
        );

        let trainer = sh_trainer(script, temp.path().to_path_buf());
        let sink = Arc::new(RecordingSink::default());

        let result = trainer
            .run(&TrainingConfig::default(), Path::new("/tmp/dataset"), sink)
            .await;

        match result {
            Err(ConnectorError::Trainer(message)) => {
                assert!(message.contains("dataset missing labels"));
            }
            other => panic!("expected trainer error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_process_trainer_missing_interpreter() {
        let temp = TempDir::new().unwrap();
        let script = write_script(temp.path(), "exit 0\n");

        let trainer = ProcessTrainer::new(
            "definitely-not-an-interpreter".to_string(),
            script,
            temp.path().to_path_buf(),
        );
        let sink = Arc::new(RecordingSink::default());

        let result = trainer
            .run(&TrainingConfig::default(), Path::new("/tmp/dataset"), sink)
            .await;

        assert!(matches!(result, Err(ConnectorError::Trainer(_))));
    }

    #[tokio::test]
    async fn test_trainer_receives_config_and_dataset() {
        let temp = TempDir::new().unwrap();
        // Echo what the child was given back as the progress message; strip
        // quotes and braces so the config survives inside a JSON string
        let script = write_script(
            temp.path(),
            concat!(
                "config=$(cat | tr -d '\"{}')\n",
                "printf '{\"progress\": 100.0, \"message\": \"%s %s\"}\\n' \"$2\" \"$config\"\n",
            ),
        );

        let trainer = sh_trainer(script, temp.path().to_path_buf());
        let sink = Arc::new(RecordingSink::default());

        let config: TrainingConfig =
            serde_json::from_str(r#"{"framework": "ultralytics", "epochs": 5}"#).unwrap();

        trainer
            .run(&config, Path::new("/data/set"), sink.clone())
            .await
            .unwrap();

        let reports = sink.reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        let message = &reports[0].2;
        assert!(message.contains("/data/set"));
        assert!(message.contains("ultralytics"));
    }
}
