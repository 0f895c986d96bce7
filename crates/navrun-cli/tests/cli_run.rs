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

use navrun::{OrchestratorConfig, RunSpec};
use navrun_fixtures::{temp_dir, write_json, NavigatorStub, RunSpecBuilder, StubToolchain};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

struct Setup {
    toolchain: StubToolchain,
    base: TempDir,
    files: TempDir,
}

impl Setup {
    fn new(stub: NavigatorStub) -> Self {
        Self {
            toolchain: StubToolchain::new().with_navigator(stub),
            base: temp_dir("cli-runs"),
            files: temp_dir("cli-files"),
        }
    }

    fn builder(&self) -> RunSpecBuilder {
        RunSpecBuilder::new(&self.toolchain.work_dir())
    }

    fn write_spec(&self, spec: &RunSpec) -> PathBuf {
        let path = self.files.path().join("run.json");
        write_json(&path, spec);
        path
    }

    fn write_config(&self, config: &OrchestratorConfig) -> PathBuf {
        let path = self.files.path().join("navrun.json");
        write_json(&path, config);
        path
    }

    fn config(&self) -> OrchestratorConfig {
        self.toolchain.config(self.base.path())
    }
}

fn navrun(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_navrun"))
        .args(args)
        .env_remove("NAVRUN_LOG")
        .env("NO_COLOR", "1")
        .output()
        .expect("failed to execute navrun")
}

fn path_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

fn stdout_json(output: &Output) -> Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(stdout.trim()).unwrap_or_else(|err| {
        panic!(
            "stdout is not json ({err}): {stdout}\nstderr: {}",
            String::from_utf8_lossy(&output.stderr)
        )
    })
}

#[test]
fn run_prints_outcome_as_json() {
    let setup = Setup::new(NavigatorStub::succeeding());
    let spec = setup.write_spec(&setup.builder().with_query("lines", ".stdout[]").build());
    let config = setup.write_config(&setup.config());

    let output = navrun(&[
        "run",
        "--spec",
        path_arg(&spec),
        "--config",
        path_arg(&config),
        "--json",
    ]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let outcome = stdout_json(&output);
    assert_eq!(outcome["status"], "succeeded");
    assert_eq!(outcome["phase"], "queried");
    assert_eq!(
        outcome["artifact_queries"]["lines"]["results"]
            .as_array()
            .unwrap()
            .len(),
        3
    );
    assert_eq!(std::fs::read_dir(setup.base.path()).unwrap().count(), 0);
}

#[test]
fn run_prints_query_results_in_human_mode() {
    let setup = Setup::new(NavigatorStub::succeeding());
    let spec = setup.write_spec(&setup.builder().with_query("status", ".status").build());
    let config = setup.write_config(&setup.config());

    let output = navrun(&["run", "--spec", path_arg(&spec), "--config", path_arg(&config)]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), "status: \"successful\"");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("run succeeded"), "stderr: {stderr}");
}

#[test]
fn persist_flag_keeps_run_directory() {
    let setup = Setup::new(NavigatorStub::succeeding());
    let spec = setup.write_spec(&setup.builder().build());
    let config = setup.write_config(&setup.config());

    let output = navrun(&[
        "run",
        "--spec",
        path_arg(&spec),
        "--config",
        path_arg(&config),
        "--persist",
        "--json",
    ]);
    assert!(output.status.success());
    let outcome = stdout_json(&output);
    let dir = PathBuf::from(outcome["run_directory"].as_str().unwrap());
    assert!(dir.join("ansible-navigator.yaml").is_file());
}

#[test]
fn failed_run_exits_with_execution_code() {
    let setup = Setup::new(NavigatorStub::finishing("failed", &["fatal: boom"], 2));
    let spec = setup.write_spec(&setup.builder().build());
    let config = setup.write_config(&setup.config());

    let output = navrun(&[
        "run",
        "--spec",
        path_arg(&spec),
        "--config",
        path_arg(&config),
        "--json",
    ]);
    assert_eq!(output.status.code(), Some(5));
    let outcome = stdout_json(&output);
    assert_eq!(outcome["status"], "failed");
    assert_eq!(outcome["diagnostics"]["errors"][0]["code"], "E_EXECUTION");
}

#[test]
fn timed_out_run_exits_with_timeout_code() {
    let setup = Setup::new(NavigatorStub::finishing("timeout", &["partial output"], 1));
    let spec = setup.write_spec(&setup.builder().build());
    let config = setup.write_config(&setup.config());

    let output = navrun(&["run", "--spec", path_arg(&spec), "--config", path_arg(&config)]);
    assert_eq!(output.status.code(), Some(6));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("E_TIMEOUT"), "stderr: {stderr}");
    assert!(stderr.contains("partial output"), "stderr: {stderr}");
}

#[test]
fn validate_accepts_a_good_spec() {
    let setup = Setup::new(NavigatorStub::succeeding());
    let spec = setup.write_spec(&setup.builder().with_query("lines", ".stdout[]").build());

    let output = navrun(&["validate", "--spec", path_arg(&spec)]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("spec is valid"));
}

#[test]
fn validate_rejects_a_bad_filter() {
    let setup = Setup::new(NavigatorStub::succeeding());
    let spec = setup.write_spec(&setup.builder().with_query("broken", ".stdout[").build());

    let output = navrun(&["validate", "--spec", path_arg(&spec), "--json"]);
    assert_eq!(output.status.code(), Some(2));
    let diagnostics = stdout_json(&output);
    assert_eq!(diagnostics["errors"][0]["code"], "E_FILTER_SYNTAX");
    assert_eq!(diagnostics["errors"][0]["class"], "validation");
}

#[test]
fn unreadable_spec_is_reported_as_validation_error() {
    let files = temp_dir("cli-files");
    let missing = files.path().join("absent.yaml");

    let output = navrun(&["validate", "--spec", path_arg(&missing), "--json"]);
    assert_eq!(output.status.code(), Some(2));
    let error = stdout_json(&output);
    assert_eq!(error["code"], "E_SPEC");
}

#[test]
fn preflight_reports_missing_navigator() {
    let setup = Setup {
        toolchain: StubToolchain::new(),
        base: temp_dir("cli-runs"),
        files: temp_dir("cli-files"),
    };
    let spec = setup.write_spec(&setup.builder().build());
    let config = setup.write_config(&setup.config());

    let output = navrun(&[
        "preflight",
        "--spec",
        path_arg(&spec),
        "--config",
        path_arg(&config),
        "--json",
    ]);
    assert_eq!(output.status.code(), Some(3));
    let payload = stdout_json(&output);
    assert_eq!(
        payload["diagnostics"]["errors"][0]["code"],
        "E_PREFLIGHT_NAVIGATOR_NOT_FOUND"
    );
    assert!(payload["report"]["navigator"].is_null());
}

#[test]
fn preflight_passes_on_ready_host() {
    let setup = Setup::new(NavigatorStub::succeeding());
    let spec = setup.write_spec(&setup.builder().build());
    let config = setup.write_config(&setup.config());

    let output = navrun(&["preflight", "--spec", path_arg(&spec), "--config", path_arg(&config)]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("preflight passed"));
    assert!(stderr.contains("navigator: "));
}
