// Test module - relaxed lint rules
#![allow(clippy::default_trait_access)]
#![allow(clippy::indexing_slicing)]
#![allow(clippy::unreadable_literal)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::inefficient_to_string)]
#![allow(clippy::panic)]
#![allow(clippy::manual_assert)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::cast_possible_truncation)]
#![allow(missing_docs)]

use navrun::command::{
    build, marker_environment, register_markers, StagedRun, ENV_HOST_KEY_CHECKING, ENV_INVENTORY,
    ENV_NAVIGATOR_CONFIG, ENV_OPERATION, ENV_PREVIOUS_INVENTORY,
};
use navrun::model::{NavigatorSettings, Operation, OrchestratorConfig, RunSpec};
use navrun::rundir::StagedPath;
use std::path::PathBuf;

fn path(host_root: &str, resolved_root: &str, rel: &str) -> StagedPath {
    StagedPath {
        host: PathBuf::from(host_root).join(rel),
        resolved: PathBuf::from(resolved_root).join(rel),
    }
}

fn staged(resolved_root: &str) -> StagedRun {
    let p = |rel: &str| path("/runs/r", resolved_root, rel);
    StagedRun {
        playbook: p("playbook.yaml"),
        inventories: vec![p("inventories/a.ini"), p("inventories/b.ini")],
        inventories_dir: p("inventories"),
        previous_inventories_dir: None,
        extra_vars: Some(p("extra-vars/extra-vars.json")),
        private_keys: vec![p("private-keys/zeta"), p("private-keys/alpha")],
        known_hosts: Some(p("known-hosts/known_hosts")),
        settings: p("ansible-navigator.yaml"),
        artifact: p("playbook-artifact.json"),
        log: p("ansible-navigator.log"),
    }
}

fn spec() -> RunSpec {
    let mut spec = RunSpec::new("- hosts: all\n", "/work/dir");
    spec.options.force_handlers = true;
    spec.options.skip_tags = vec!["slow".into(), "flaky".into()];
    spec.options.limit = vec!["web".into()];
    spec.options.tags = vec!["deploy".into(), "config".into()];
    spec.options.start_at_task = Some("Install packages".into());
    spec
}

#[test]
fn arguments_follow_fixed_order() {
    let command = build("/usr/bin/ansible-navigator", &spec(), &staged("/tmp/navigator-run"));
    let expected: Vec<String> = [
        "run",
        "/tmp/navigator-run/playbook.yaml",
        "--playbook-artifact-save-as",
        "/runs/r/playbook-artifact.json",
        "--log-file",
        "/runs/r/ansible-navigator.log",
        "--inventory",
        "/tmp/navigator-run/inventories/a.ini",
        "--inventory",
        "/tmp/navigator-run/inventories/b.ini",
        "--force-handlers",
        "--skip-tags",
        "slow,flaky",
        "--limit",
        "web",
        "--tags",
        "deploy,config",
        "--start-at-task",
        "Install packages",
        "--private-key",
        "/tmp/navigator-run/private-keys/zeta",
        "--private-key",
        "/tmp/navigator-run/private-keys/alpha",
        "--extra-vars",
        "@/tmp/navigator-run/extra-vars/extra-vars.json",
        "--extra-vars",
        "ansible_ssh_known_hosts_file=/tmp/navigator-run/known-hosts/known_hosts",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    assert_eq!(command.args, expected);
    assert_eq!(command.program, "/usr/bin/ansible-navigator");
    assert_eq!(command.working_directory, PathBuf::from("/work/dir"));
}

#[test]
fn optional_flags_are_left_out_when_unset() {
    let mut staged = staged("/runs/r");
    staged.extra_vars = None;
    staged.known_hosts = None;
    staged.private_keys.clear();
    let command = build("ansible-navigator", &RunSpec::new("x", "/w"), &staged);
    for flag in [
        "--force-handlers",
        "--skip-tags",
        "--limit",
        "--tags",
        "--start-at-task",
        "--private-key",
        "--extra-vars",
    ] {
        assert!(!command.args.iter().any(|a| a == flag), "{flag}");
    }
}

#[test]
fn environment_carries_markers_and_settings_pointer() {
    let command = build("ansible-navigator", &spec(), &staged("/tmp/navigator-run"));
    assert_eq!(command.env[ENV_NAVIGATOR_CONFIG], "/runs/r/ansible-navigator.yaml");
    assert_eq!(command.env[ENV_OPERATION], "create");
    assert_eq!(command.env[ENV_INVENTORY], "/tmp/navigator-run/inventories");
    assert!(!command.env.contains_key(ENV_PREVIOUS_INVENTORY));
    assert!(!command.env.contains_key(ENV_HOST_KEY_CHECKING));
}

#[test]
fn update_exposes_previous_inventories() {
    let mut spec = spec();
    spec.operation = Operation::Update;
    let mut staged = staged("/runs/r");
    staged.previous_inventories_dir = Some(path("/runs/r", "/runs/r", "previous-inventories"));
    let env = marker_environment(&spec, &staged);
    assert_eq!(env[ENV_OPERATION], "update");
    assert_eq!(env[ENV_PREVIOUS_INVENTORY], "/runs/r/previous-inventories");
}

#[test]
fn disabled_host_key_checking_is_exported() {
    let mut spec = spec();
    spec.options.host_key_checking = false;
    let env = marker_environment(&spec, &staged("/runs/r"));
    assert_eq!(env[ENV_HOST_KEY_CHECKING], "False");
}

#[test]
fn markers_are_passed_through_but_not_the_config_pointer() {
    let mut spec = spec();
    spec.options.host_key_checking = false;
    let mut settings = NavigatorSettings::from_environment(
        &spec.execution_environment,
        &OrchestratorConfig::default(),
        "auto",
        600,
    );
    register_markers(&mut settings, &marker_environment(&spec, &staged("/runs/r")));
    register_markers(&mut settings, &marker_environment(&spec, &staged("/runs/r")));

    let pass = &settings.environment_variables_pass;
    assert!(pass.contains(&ENV_OPERATION.to_string()));
    assert!(pass.contains(&ENV_INVENTORY.to_string()));
    assert!(pass.contains(&ENV_HOST_KEY_CHECKING.to_string()));
    assert!(!pass.contains(&ENV_NAVIGATOR_CONFIG.to_string()));
    assert_eq!(pass.len(), 3);
}

#[test]
fn render_joins_program_and_arguments() {
    let mut staged = staged("/r");
    staged.inventories.truncate(1);
    staged.private_keys.clear();
    staged.extra_vars = None;
    staged.known_hosts = None;
    let command = build("nav", &RunSpec::new("x", "/w"), &staged);
    assert_eq!(
        command.render(),
        "nav run /r/playbook.yaml --playbook-artifact-save-as /runs/r/playbook-artifact.json \
         --log-file /runs/r/ansible-navigator.log --inventory /r/inventories/a.ini"
    );
}
