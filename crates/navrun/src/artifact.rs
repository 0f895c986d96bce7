//! Reading the playbook artifact the navigator writes at the end of a run.

use crate::runner::error::{ErrorCode, RunError, RunResult};
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Status the navigator records when ansible-runner hit its own timeout.
pub const STATUS_TIMEOUT: &str = "timeout";

#[derive(Clone, Debug, PartialEq)]
pub struct PlaybookArtifact {
    pub status: String,
    pub stdout: Vec<String>,
    /// The full document, for queries.
    pub document: Value,
}

#[derive(Deserialize)]
struct ArtifactFields {
    status: String,
    #[serde(default)]
    stdout: Vec<String>,
}

impl PlaybookArtifact {
    pub fn from_value(document: Value) -> RunResult<Self> {
        let fields = ArtifactFields::deserialize(&document).map_err(|err| {
            RunError::io(ErrorCode::Artifact, "playbook artifact is missing required fields", err)
        })?;
        Ok(Self {
            status: fields.status,
            stdout: fields.stdout,
            document,
        })
    }

    pub fn timed_out(&self) -> bool {
        self.status == STATUS_TIMEOUT
    }

    /// Captured playbook output as one block of text.
    pub fn stdout_text(&self) -> String {
        self.stdout.join("\n")
    }
}

pub fn read(path: &Path) -> RunResult<PlaybookArtifact> {
    let data = fs::read(path).map_err(|err| {
        RunError::post_processing(
            ErrorCode::Artifact,
            "failed to read playbook artifact",
            serde_json::json!({"path": path, "source": err.to_string()}),
        )
    })?;
    let document: Value = serde_json::from_slice(&data).map_err(|err| {
        RunError::post_processing(
            ErrorCode::Artifact,
            "playbook artifact is not valid JSON",
            serde_json::json!({"path": path, "source": err.to_string()}),
        )
    })?;
    PlaybookArtifact::from_value(document)
}
