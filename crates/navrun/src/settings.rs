//! Navigator settings file generation.

use crate::model::NavigatorSettings;
use crate::rundir::{RunDirectory, StagedPath, SETTINGS_FILE};
use crate::runner::error::{ErrorCode, RunError, RunResult};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Serialize)]
struct SettingsDocument {
    #[serde(rename = "ansible-navigator")]
    navigator: NavigatorSection,
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct NavigatorSection {
    ansible_runner: RunnerSection,
    color: ColorSection,
    execution_environment: ExecutionEnvironmentSection,
    logging: LoggingSection,
    mode: &'static str,
    playbook_artifact: PlaybookArtifactSection,
    #[serde(skip_serializing_if = "Option::is_none")]
    time_zone: Option<String>,
}

#[derive(Serialize)]
struct RunnerSection {
    timeout: u64,
}

#[derive(Serialize)]
struct ColorSection {
    enable: bool,
}

#[derive(Serialize)]
struct LoggingSection {
    level: &'static str,
}

#[derive(Serialize)]
struct PlaybookArtifactSection {
    enable: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct ExecutionEnvironmentSection {
    container_engine: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    container_options: Vec<String>,
    enabled: bool,
    #[serde(skip_serializing_if = "EnvironmentVariablesSection::is_empty")]
    environment_variables: EnvironmentVariablesSection,
    image: String,
    pull: PullSection,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    volume_mounts: Vec<VolumeMount>,
}

#[derive(Serialize)]
struct EnvironmentVariablesSection {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pass: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    set: BTreeMap<String, String>,
}

impl EnvironmentVariablesSection {
    fn is_empty(&self) -> bool {
        self.pass.is_empty() && self.set.is_empty()
    }
}

#[derive(Serialize)]
struct PullSection {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    arguments: Vec<String>,
    policy: &'static str,
}

#[derive(Serialize)]
struct VolumeMount {
    src: String,
    dest: String,
    options: &'static str,
}

/// Render the settings as navigator YAML.
pub fn render(settings: &NavigatorSettings) -> RunResult<String> {
    let document = SettingsDocument {
        navigator: NavigatorSection {
            ansible_runner: RunnerSection {
                timeout: settings.timeout_secs,
            },
            color: ColorSection { enable: false },
            execution_environment: ExecutionEnvironmentSection {
                container_engine: settings.container_engine.clone(),
                container_options: settings.container_options.clone(),
                enabled: settings.enabled,
                environment_variables: EnvironmentVariablesSection {
                    pass: settings.environment_variables_pass.clone(),
                    set: settings.environment_variables_set.clone(),
                },
                image: settings.image.clone(),
                pull: PullSection {
                    arguments: settings.pull_arguments.clone(),
                    policy: settings.pull_policy.as_str(),
                },
                volume_mounts: settings
                    .volume_mounts
                    .iter()
                    .map(|(src, dest)| VolumeMount {
                        src: src.display().to_string(),
                        dest: dest.display().to_string(),
                        options: "Z",
                    })
                    .collect(),
            },
            logging: LoggingSection { level: "debug" },
            mode: "stdout",
            playbook_artifact: PlaybookArtifactSection { enable: true },
            time_zone: settings.time_zone.clone(),
        },
    };

    serde_yml::to_string(&document).map_err(|err| {
        RunError::io(ErrorCode::Settings, "failed to serialize navigator settings", err)
    })
}

/// Serialize the settings into the run directory.
pub fn write(dir: &RunDirectory, settings: &NavigatorSettings) -> RunResult<StagedPath> {
    let content = render(settings)?;
    let staged = dir
        .write_file(SETTINGS_FILE, content.as_bytes())
        .map_err(|err| RunError::new(ErrorCode::Settings, err.message, err.context))?;
    debug!(
        path = %staged.host.display(),
        mounts = settings.volume_mounts.len(),
        "wrote navigator settings"
    );
    Ok(staged)
}
