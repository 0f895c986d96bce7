use crate::model::RunId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Lifecycle operation a run is performed for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    #[default]
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerEngine {
    /// Use whichever of podman or docker is installed.
    #[default]
    Auto,
    Podman,
    Docker,
}

impl ContainerEngine {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Podman => "podman",
            Self::Docker => "docker",
        }
    }
}

impl fmt::Display for ContainerEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PullPolicy {
    Always,
    #[default]
    Missing,
    Never,
    Tag,
}

impl PullPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::Missing => "missing",
            Self::Never => "never",
            Self::Tag => "tag",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub name: String,
    pub content: String,
}

impl Inventory {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// An SSH private key handed to the navigator.
///
/// `data` is the OpenSSH-encoded key text; it must not be passphrase protected.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateKey {
    pub name: String,
    pub data: String,
}

impl PrivateKey {
    pub fn new(name: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("name", &self.name)
            .field("data", &"<redacted>")
            .finish()
    }
}

/// One `known_hosts` line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KnownHost(pub String);

impl KnownHost {
    pub fn new(line: impl Into<String>) -> Self {
        Self(line.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A jq filter evaluated against the playbook artifact after a run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactQuery {
    pub filter: String,
    /// JSON-encoded outputs, filled after execution.
    #[serde(default)]
    pub results: Vec<String>,
}

impl ArtifactQuery {
    pub fn new(filter: impl Into<String>) -> Self {
        Self {
            filter: filter.into(),
            results: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionEnvironment {
    pub enabled: bool,
    /// `None` falls back to the orchestrator default.
    pub container_engine: Option<ContainerEngine>,
    pub image: Option<String>,
    pub pull_policy: Option<PullPolicy>,
    pub pull_arguments: Vec<String>,
    pub container_options: Vec<String>,
    pub environment_variables_pass: Vec<String>,
    pub environment_variables_set: BTreeMap<String, String>,
    pub time_zone: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    pub force_handlers: bool,
    pub skip_tags: Vec<String>,
    pub start_at_task: Option<String>,
    pub limit: Vec<String>,
    pub tags: Vec<String>,
    pub host_key_checking: bool,
    pub extra_vars: Map<String, Value>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            force_handlers: false,
            skip_tags: Vec::new(),
            start_at_task: None,
            limit: Vec::new(),
            tags: Vec::new(),
            host_key_checking: true,
            extra_vars: Map::new(),
        }
    }
}

/// Fully resolved input for one navigator run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunSpec {
    #[serde(default)]
    pub id: RunId,
    #[serde(default)]
    pub run_counter: u64,
    #[serde(default)]
    pub operation: Operation,
    pub playbook: String,
    #[serde(default)]
    pub inventories: Vec<Inventory>,
    #[serde(default)]
    pub previous_inventories: Vec<Inventory>,
    pub working_directory: PathBuf,
    #[serde(default)]
    pub navigator_binary: Option<String>,
    #[serde(default)]
    pub execution_environment: ExecutionEnvironment,
    #[serde(default)]
    pub options: RunOptions,
    #[serde(default)]
    pub private_keys: Vec<PrivateKey>,
    /// `None` disables known hosts; `Some(vec![])` lets the first run populate them.
    #[serde(default)]
    pub known_hosts: Option<Vec<KnownHost>>,
    #[serde(default)]
    pub artifact_queries: BTreeMap<String, ArtifactQuery>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl RunSpec {
    pub fn new(playbook: impl Into<String>, working_directory: impl Into<PathBuf>) -> Self {
        Self {
            id: RunId::new(),
            run_counter: 0,
            operation: Operation::Create,
            playbook: playbook.into(),
            inventories: Vec::new(),
            previous_inventories: Vec::new(),
            working_directory: working_directory.into(),
            navigator_binary: None,
            execution_environment: ExecutionEnvironment::default(),
            options: RunOptions::default(),
            private_keys: Vec::new(),
            known_hosts: None,
            artifact_queries: BTreeMap::new(),
            timeout_secs: None,
        }
    }

    /// Explicit navigator path, treating an empty string as unset.
    pub fn explicit_navigator(&self) -> Option<&str> {
        self.navigator_binary
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}
