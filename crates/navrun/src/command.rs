//! Navigator command line and environment.

use crate::model::{NavigatorSettings, Operation, RunSpec};
use crate::rundir::StagedPath;
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const ENV_NAVIGATOR_CONFIG: &str = "ANSIBLE_NAVIGATOR_CONFIG";
pub const ENV_OPERATION: &str = "ANSIBLE_TF_OPERATION";
pub const ENV_INVENTORY: &str = "ANSIBLE_TF_INVENTORY";
pub const ENV_PREVIOUS_INVENTORY: &str = "ANSIBLE_TF_PREVIOUS_INVENTORY";
pub const ENV_HOST_KEY_CHECKING: &str = "ANSIBLE_HOST_KEY_CHECKING";

/// Paths staged for one run, in the form the command refers to them.
#[derive(Clone, Debug)]
pub struct StagedRun {
    pub playbook: StagedPath,
    pub inventories: Vec<StagedPath>,
    pub inventories_dir: StagedPath,
    pub previous_inventories_dir: Option<StagedPath>,
    pub extra_vars: Option<StagedPath>,
    pub private_keys: Vec<StagedPath>,
    pub known_hosts: Option<StagedPath>,
    pub settings: StagedPath,
    pub artifact: StagedPath,
    pub log: StagedPath,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavigatorCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Added on top of the inherited environment.
    pub env: BTreeMap<String, String>,
    pub working_directory: PathBuf,
}

impl NavigatorCommand {
    /// The command line as one string, for logs and troubleshooting.
    pub fn render(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Variables the playbook can read to learn about the run.
pub fn marker_environment(spec: &RunSpec, staged: &StagedRun) -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();
    env.insert(ENV_OPERATION.to_string(), spec.operation.to_string());
    env.insert(
        ENV_INVENTORY.to_string(),
        staged.inventories_dir.resolved_display(),
    );
    if spec.operation == Operation::Update {
        if let Some(previous) = &staged.previous_inventories_dir {
            env.insert(ENV_PREVIOUS_INVENTORY.to_string(), previous.resolved_display());
        }
    }
    if !spec.options.host_key_checking {
        env.insert(ENV_HOST_KEY_CHECKING.to_string(), "False".to_string());
    }
    env
}

/// Pass the marker variables through to the execution environment.
pub fn register_markers(settings: &mut NavigatorSettings, markers: &BTreeMap<String, String>) {
    for name in markers.keys() {
        settings.pass_variable(name);
    }
}

pub fn build(program: impl Into<String>, spec: &RunSpec, staged: &StagedRun) -> NavigatorCommand {
    let mut args = vec!["run".to_string(), staged.playbook.resolved_display()];
    args.push("--playbook-artifact-save-as".to_string());
    args.push(staged.artifact.host_display());
    args.push("--log-file".to_string());
    args.push(staged.log.host_display());

    for inventory in &staged.inventories {
        args.push("--inventory".to_string());
        args.push(inventory.resolved_display());
    }

    let options = &spec.options;
    if options.force_handlers {
        args.push("--force-handlers".to_string());
    }
    push_list(&mut args, "--skip-tags", &options.skip_tags);
    push_list(&mut args, "--limit", &options.limit);
    push_list(&mut args, "--tags", &options.tags);
    if let Some(task) = options.start_at_task.as_deref().filter(|t| !t.is_empty()) {
        args.push("--start-at-task".to_string());
        args.push(task.to_string());
    }

    for key in &staged.private_keys {
        args.push("--private-key".to_string());
        args.push(key.resolved_display());
    }

    if let Some(extra_vars) = &staged.extra_vars {
        args.push("--extra-vars".to_string());
        args.push(format!("@{}", extra_vars.resolved_display()));
    }
    if let Some(known_hosts) = &staged.known_hosts {
        args.push("--extra-vars".to_string());
        args.push(format!(
            "ansible_ssh_known_hosts_file={}",
            known_hosts.resolved_display()
        ));
    }

    let mut env = marker_environment(spec, staged);
    env.insert(
        ENV_NAVIGATOR_CONFIG.to_string(),
        staged.settings.host_display(),
    );

    NavigatorCommand {
        program: program.into(),
        args,
        env,
        working_directory: spec.working_directory.clone(),
    }
}

fn push_list(args: &mut Vec<String>, flag: &str, values: &[String]) {
    if !values.is_empty() {
        args.push(flag.to_string());
        args.push(values.join(","));
    }
}
