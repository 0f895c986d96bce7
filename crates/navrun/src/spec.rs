//! Loading run specs and orchestrator configuration from disk.

use crate::model::{OrchestratorConfig, RunSpec};
use crate::runner::error::{ErrorCode, RunError, RunResult};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext == "yaml" || ext == "yml")
}

fn load_document<T: DeserializeOwned>(path: &Path, what: &str) -> RunResult<T> {
    let data = fs::read_to_string(path).map_err(|err| {
        RunError::io(ErrorCode::Spec, format!("failed to read {what} file"), err)
    })?;
    if is_yaml(path) {
        serde_yml::from_str(&data).map_err(|err| {
            RunError::io(ErrorCode::Spec, format!("failed to parse {what} yaml"), err)
        })
    } else {
        serde_json::from_str(&data).map_err(|err| {
            RunError::io(ErrorCode::Spec, format!("failed to parse {what} json"), err)
        })
    }
}

/// Load a run spec; a relative working directory is taken relative to the file.
pub fn load_run_spec_file(path: &Path) -> RunResult<RunSpec> {
    let mut spec: RunSpec = load_document(path, "run spec")?;
    if spec.working_directory.is_relative() {
        if let Some(parent) = path.parent() {
            spec.working_directory = parent.join(&spec.working_directory);
        }
    }
    Ok(spec)
}

pub fn load_config_file(path: &Path) -> RunResult<OrchestratorConfig> {
    load_document(path, "config")
}
