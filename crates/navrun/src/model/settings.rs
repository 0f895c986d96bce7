use crate::model::{ExecutionEnvironment, OrchestratorConfig, PullPolicy};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Navigator settings for one run, assembled while the run is staged.
///
/// Created from the run's execution environment, then extended by the run
/// directory (its own mount), the secret provisioner (key and known-hosts
/// mounts) and the command builder (marker variables to pass through).
/// [`crate::settings::write`] serializes it once staging is complete.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavigatorSettings {
    pub container_engine: String,
    pub enabled: bool,
    pub image: String,
    pub pull_policy: PullPolicy,
    pub pull_arguments: Vec<String>,
    pub container_options: Vec<String>,
    pub environment_variables_pass: Vec<String>,
    pub environment_variables_set: BTreeMap<String, String>,
    pub time_zone: Option<String>,
    /// Host path to in-container path. Keys are unique.
    pub volume_mounts: BTreeMap<PathBuf, PathBuf>,
    pub timeout_secs: u64,
}

impl NavigatorSettings {
    /// `container_engine` is the engine preflight resolved, or the
    /// configured value when no resolution happened.
    pub fn from_environment(
        environment: &ExecutionEnvironment,
        config: &OrchestratorConfig,
        container_engine: impl Into<String>,
        timeout_secs: u64,
    ) -> Self {
        let mut settings = Self {
            container_engine: container_engine.into(),
            enabled: environment.enabled,
            image: environment
                .image
                .clone()
                .filter(|image| !image.trim().is_empty())
                .unwrap_or_else(|| config.default_image.clone()),
            pull_policy: environment
                .pull_policy
                .unwrap_or(config.default_pull_policy),
            pull_arguments: environment.pull_arguments.clone(),
            container_options: environment.container_options.clone(),
            environment_variables_pass: Vec::new(),
            environment_variables_set: environment.environment_variables_set.clone(),
            time_zone: environment
                .time_zone
                .clone()
                .filter(|tz| !tz.trim().is_empty()),
            volume_mounts: BTreeMap::new(),
            timeout_secs,
        };
        for name in &environment.environment_variables_pass {
            settings.pass_variable(name);
        }
        settings
    }

    /// Add a variable to the pass-through list, once.
    pub fn pass_variable(&mut self, name: &str) {
        if !self.environment_variables_pass.iter().any(|n| n == name) {
            self.environment_variables_pass.push(name.to_string());
        }
    }

    pub fn add_volume_mount(&mut self, host: impl Into<PathBuf>, container: impl Into<PathBuf>) {
        self.volume_mounts.insert(host.into(), container.into());
    }

    pub fn volume_mount(&self, host: &Path) -> Option<&Path> {
        self.volume_mounts.get(host).map(PathBuf::as_path)
    }
}
