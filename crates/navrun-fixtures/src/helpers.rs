//! Common test helper functions.

use std::fs;
use std::path::Path;

use tempfile::TempDir;

/// Create a temporary directory that is deleted when dropped.
///
/// # Panics
///
/// Panics if the directory cannot be created.
#[must_use]
pub fn temp_dir(prefix: &str) -> TempDir {
    tempfile::Builder::new()
        .prefix(&format!("navrun-{prefix}-"))
        .tempdir()
        .expect("failed to create temp directory")
}

/// Write a value as pretty JSON.
///
/// # Panics
///
/// Panics if serialization or file writing fails.
pub fn write_json<T: serde::Serialize>(path: &Path, value: &T) {
    let data = serde_json::to_vec_pretty(value).expect("failed to serialize json");
    fs::write(path, data).expect("failed to write json file");
}

/// Write YAML text verbatim.
///
/// # Panics
///
/// Panics if the file cannot be written.
pub fn write_yaml_text(path: &Path, yaml: &str) {
    fs::write(path, yaml).expect("failed to write yaml file");
}

/// A playbook artifact document with the given status and stdout lines.
#[must_use]
pub fn artifact_json(status: &str, stdout: &[&str]) -> serde_json::Value {
    serde_json::json!({
        "version": "2.0.0",
        "status": status,
        "status_color": 10,
        "stdout": stdout,
        "plays": [],
    })
}
