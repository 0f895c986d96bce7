use crate::model::{ArtifactQuery, RunId};
use crate::runner::error::Diagnostics;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Succeeded,
    Failed,
    TimedOut,
    /// Stopped by validation or preflight; nothing was staged or spawned.
    Rejected,
}

/// Stages a run moves through, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    Validating,
    Preflighting,
    Staging,
    SettingsGenerated,
    Executing,
    ArtifactRead,
    Queried,
    Cleanup,
    Terminal,
}

impl RunPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::Preflighting => "preflighting",
            Self::Staging => "staging",
            Self::SettingsGenerated => "settings_generated",
            Self::Executing => "executing",
            Self::ArtifactRead => "artifact_read",
            Self::Queried => "queried",
            Self::Cleanup => "cleanup",
            Self::Terminal => "terminal",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub run_id: RunId,
    pub run_counter: u64,
    pub status: RunStatus,
    pub phase: RunPhase,
    pub diagnostics: Diagnostics,
    pub command: Option<String>,
    pub artifact_queries: BTreeMap<String, ArtifactQuery>,
    pub known_hosts: Option<Vec<String>>,
    pub run_directory: Option<PathBuf>,
    pub duration_ms: u64,
}

impl RunOutcome {
    pub fn succeeded(&self) -> bool {
        self.status == RunStatus::Succeeded && !self.diagnostics.has_errors()
    }
}
