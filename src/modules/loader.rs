use crate::error::{ConnectorError, Result};
use crate::training::ProcessTrainer;
use std::path::PathBuf;

/// Entry script every runnable module must ship at its root
pub const TRAIN_ENTRY: &str = "train.py";

/// Resolves installed modules to their training entry points
///
/// This is a capability lookup, not a type check: any module directory that
/// ships the entry script satisfies the contract.
pub struct ModuleLoader {
    modules_dir: PathBuf,
    interpreter: String,
}

impl ModuleLoader {
    #[must_use]
    pub fn new(modules_dir: PathBuf, interpreter: String) -> Self {
        Self {
            modules_dir,
            interpreter,
        }
    }

    /// Resolve the training entry point of an installed module
    ///
    /// Fails with `NotInstalled` before anything else if the module
    /// directory is absent.
    pub fn resolve(&self, module_id: &str) -> Result<ProcessTrainer> {
        let module_path = self.modules_dir.join(module_id);

        if !module_path.exists() {
            return Err(ConnectorError::NotInstalled(format!(
                "module '{module_id}' is not installed"
            )));
        }

        let entry = module_path.join(TRAIN_ENTRY);
        if !entry.exists() {
            return Err(ConnectorError::Module(format!(
                "module '{module_id}' has no {TRAIN_ENTRY} entry point"
            )));
        }

        Ok(ProcessTrainer::new(
            self.interpreter.clone(),
            entry,
            self.modules_dir.clone(),
        ))
    }
}
