use crate::model::{ContainerEngine, PullPolicy};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_IMAGE: &str = "ghcr.io/ansible/creator-ee:v24.2.0";
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_TERMINATION_GRACE_MS: u64 = 10_000;
pub const DEFAULT_NAVIGATOR_PROGRAM: &str = "ansible-navigator";
pub const DEFAULT_PLAYBOOK_PROGRAM: &str = "ansible-playbook";

/// Caller-wide defaults applied to every run an orchestrator performs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Parent of every run directory.
    pub base_run_directory: PathBuf,
    /// Keep run directories after the run for troubleshooting.
    pub persist_run_directory: bool,
    pub default_image: String,
    pub default_container_engine: ContainerEngine,
    pub default_pull_policy: PullPolicy,
    pub default_timeout_secs: u64,
    /// Time between SIGTERM and SIGKILL when a run is stopped.
    pub termination_grace_ms: u64,
    pub navigator_program: String,
    pub playbook_program: String,
    /// Lookup path for programs; `None` uses `PATH`.
    pub search_path: Option<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            base_run_directory: std::env::temp_dir(),
            persist_run_directory: false,
            default_image: DEFAULT_IMAGE.to_string(),
            default_container_engine: ContainerEngine::Auto,
            default_pull_policy: PullPolicy::Missing,
            default_timeout_secs: DEFAULT_TIMEOUT_SECS,
            termination_grace_ms: DEFAULT_TERMINATION_GRACE_MS,
            navigator_program: DEFAULT_NAVIGATOR_PROGRAM.to_string(),
            playbook_program: DEFAULT_PLAYBOOK_PROGRAM.to_string(),
            search_path: None,
        }
    }
}

impl OrchestratorConfig {
    pub fn termination_grace(&self) -> Duration {
        Duration::from_millis(self.termination_grace_ms)
    }

    /// Effective timeout for a run, preferring the run's own value.
    pub fn effective_timeout_secs(&self, requested: Option<u64>) -> u64 {
        requested.unwrap_or(self.default_timeout_secs)
    }
}
