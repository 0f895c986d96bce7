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

use navrun::model::{ContainerEngine, Operation, PullPolicy, DEFAULT_IMAGE, DEFAULT_TIMEOUT_SECS};
use navrun::runner::error::{ErrorClass, ErrorCode};
use navrun::spec::{load_config_file, load_run_spec_file};
use navrun_fixtures::{temp_dir, write_json, write_yaml_text};
use serde_json::json;
use std::path::PathBuf;

#[test]
fn loads_yaml_run_spec() {
    let dir = temp_dir("spec");
    let path = dir.path().join("run.yaml");
    write_yaml_text(
        &path,
        r#"
operation: update
playbook: |
  - hosts: all
    tasks: []
working_directory: /srv/project
inventories:
  - name: hosts.ini
    content: "[all]\nweb1\n"
previous_inventories:
  - name: hosts.ini
    content: "[all]\nweb0\n"
execution_environment:
  enabled: true
  container_engine: podman
  pull_policy: always
options:
  tags: [deploy]
  host_key_checking: false
  extra_vars:
    region: eu
known_hosts: []
artifact_queries:
  lines:
    filter: .stdout[]
timeout_secs: 120
"#,
    );

    let spec = load_run_spec_file(&path).unwrap();
    assert_eq!(spec.operation, Operation::Update);
    assert!(spec.playbook.starts_with("- hosts: all"));
    assert_eq!(spec.working_directory, PathBuf::from("/srv/project"));
    assert_eq!(spec.inventories[0].content, "[all]\nweb1\n");
    assert_eq!(spec.previous_inventories.len(), 1);
    assert!(spec.execution_environment.enabled);
    assert_eq!(spec.execution_environment.container_engine, Some(ContainerEngine::Podman));
    assert_eq!(spec.execution_environment.pull_policy, Some(PullPolicy::Always));
    assert_eq!(spec.options.tags, ["deploy"]);
    assert!(!spec.options.host_key_checking);
    assert_eq!(spec.options.extra_vars["region"], json!("eu"));
    assert_eq!(spec.known_hosts, Some(Vec::new()));
    assert_eq!(spec.artifact_queries["lines"].filter, ".stdout[]");
    assert!(spec.artifact_queries["lines"].results.is_empty());
    assert_eq!(spec.timeout_secs, Some(120));
}

#[test]
fn loads_minimal_json_run_spec_with_defaults() {
    let dir = temp_dir("spec");
    let path = dir.path().join("run.json");
    write_json(
        &path,
        &json!({"playbook": "- hosts: all\n", "working_directory": "/srv"}),
    );

    let spec = load_run_spec_file(&path).unwrap();
    assert_eq!(spec.operation, Operation::Create);
    assert_eq!(spec.run_counter, 0);
    assert!(spec.inventories.is_empty());
    assert!(!spec.execution_environment.enabled);
    assert!(spec.options.host_key_checking);
    assert_eq!(spec.known_hosts, None);
    assert_eq!(spec.timeout_secs, None);
}

#[test]
fn relative_working_directory_is_resolved_against_the_file() {
    let dir = temp_dir("spec");
    let path = dir.path().join("run.yml");
    write_yaml_text(&path, "playbook: x\nworking_directory: project\n");

    let spec = load_run_spec_file(&path).unwrap();
    assert_eq!(spec.working_directory, dir.path().join("project"));
}

#[test]
fn malformed_spec_is_a_validation_error() {
    let dir = temp_dir("spec");
    let path = dir.path().join("run.yaml");
    write_yaml_text(&path, "operation: [not, an, operation]\n");

    let err = load_run_spec_file(&path).unwrap_err();
    assert_eq!(err.code, ErrorCode::Spec);
    assert_eq!(err.class(), ErrorClass::Validation);
}

#[test]
fn missing_spec_file_is_reported() {
    let dir = temp_dir("spec");
    let err = load_run_spec_file(&dir.path().join("absent.json")).unwrap_err();
    assert_eq!(err.code, ErrorCode::Spec);
    assert!(err.message.contains("failed to read"));
}

#[test]
fn config_file_fills_in_defaults() {
    let dir = temp_dir("spec");
    let path = dir.path().join("navrun.yaml");
    write_yaml_text(
        &path,
        "base_run_directory: /var/lib/navrun\npersist_run_directory: true\ndefault_container_engine: docker\n",
    );

    let config = load_config_file(&path).unwrap();
    assert_eq!(config.base_run_directory, PathBuf::from("/var/lib/navrun"));
    assert!(config.persist_run_directory);
    assert_eq!(config.default_container_engine, ContainerEngine::Docker);
    assert_eq!(config.default_image, DEFAULT_IMAGE);
    assert_eq!(config.default_timeout_secs, DEFAULT_TIMEOUT_SECS);
    assert_eq!(config.effective_timeout_secs(None), DEFAULT_TIMEOUT_SECS);
    assert_eq!(config.effective_timeout_secs(Some(5)), 5);
}
