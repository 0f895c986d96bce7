//! Host readiness checks run before anything is staged.
//!
//! Every check runs and reports into the same [`Diagnostics`], so a caller
//! sees all missing prerequisites at once.

use crate::model::{ContainerEngine, OrchestratorConfig, RunSpec};
use crate::runner::error::{Diagnostics, ErrorCode, RunError, RunResult};
use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

const NAVIGATOR_VERSION_PREFIX: &str = "ansible-navigator";

/// What preflight resolved, for use by the rest of the run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PreflightReport {
    pub navigator: Option<PathBuf>,
    pub container_engine: Option<ContainerEngine>,
}

pub fn check(spec: &RunSpec, config: &OrchestratorConfig) -> (PreflightReport, Diagnostics) {
    let mut diagnostics = Diagnostics::new();
    let mut report = PreflightReport::default();
    let lookup = Lookup::new(config, &spec.working_directory);

    diagnostics.record(check_working_directory(&spec.working_directory));

    if spec.execution_environment.enabled {
        let requested = spec
            .execution_environment
            .container_engine
            .unwrap_or(config.default_container_engine);
        report.container_engine = diagnostics.record(resolve_engine(&lookup, requested));
    } else {
        diagnostics.record(check_playbook(&lookup, &config.playbook_program));
    }

    report.navigator = diagnostics.record(resolve_navigator(spec, config, &lookup));
    if let Some(navigator) = &report.navigator {
        diagnostics.record(check_navigator_functional(navigator));
    }

    debug!(
        errors = diagnostics.errors.len(),
        navigator = ?report.navigator,
        engine = ?report.container_engine,
        "preflight finished"
    );
    (report, diagnostics)
}

pub fn check_working_directory(path: &Path) -> RunResult<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(RunError::preflight(
            ErrorCode::WorkingDirectory,
            "working directory does not exist or is not a directory",
            serde_json::json!({"path": path}),
        ))
    }
}

/// Pick a container engine and confirm it answers `info`.
pub fn resolve_engine(lookup: &Lookup, requested: ContainerEngine) -> RunResult<ContainerEngine> {
    let (engine, path) = match requested {
        ContainerEngine::Auto => {
            let podman = lookup.find(ContainerEngine::Podman.as_str());
            let docker = lookup.find(ContainerEngine::Docker.as_str());
            match (podman, docker) {
                (Some(path), None) => (ContainerEngine::Podman, path),
                (None, Some(path)) => (ContainerEngine::Docker, path),
                (Some(_), Some(_)) => {
                    return Err(RunError::preflight(
                        ErrorCode::EngineAmbiguous,
                        "both podman and docker are installed; choose a container engine explicitly",
                        None,
                    ))
                }
                (None, None) => {
                    return Err(RunError::preflight(
                        ErrorCode::EngineNotFound,
                        "neither podman nor docker was found",
                        None,
                    ))
                }
            }
        }
        explicit => {
            let path = lookup.find(explicit.as_str()).ok_or_else(|| {
                RunError::preflight(
                    ErrorCode::EngineNotFound,
                    "container engine was not found",
                    serde_json::json!({"engine": explicit}),
                )
            })?;
            (explicit, path)
        }
    };

    let status = Command::new(&path)
        .arg("info")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    match status {
        Ok(exit) if exit.success() => Ok(engine),
        Ok(exit) => Err(RunError::preflight(
            ErrorCode::EngineUnusable,
            "container engine is installed but not usable",
            serde_json::json!({"engine": engine, "path": path, "exit_code": exit.code()}),
        )),
        Err(err) => Err(RunError::preflight(
            ErrorCode::EngineUnusable,
            "container engine could not be started",
            serde_json::json!({"engine": engine, "path": path, "source": err.to_string()}),
        )),
    }
}

pub fn check_playbook(lookup: &Lookup, program: &str) -> RunResult<()> {
    let unavailable = |context: serde_json::Value| {
        RunError::preflight(
            ErrorCode::PlaybookUnavailable,
            "ansible-playbook is required when the execution environment is disabled",
            context,
        )
    };
    let path = lookup
        .find(program)
        .ok_or_else(|| unavailable(serde_json::json!({"program": program})))?;
    let status = Command::new(&path)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    match status {
        Ok(exit) if exit.success() => Ok(()),
        Ok(exit) => Err(unavailable(
            serde_json::json!({"path": path, "exit_code": exit.code()}),
        )),
        Err(err) => Err(unavailable(
            serde_json::json!({"path": path, "source": err.to_string()}),
        )),
    }
}

pub fn resolve_navigator(
    spec: &RunSpec,
    config: &OrchestratorConfig,
    lookup: &Lookup,
) -> RunResult<PathBuf> {
    match spec.explicit_navigator() {
        Some(explicit) => std::fs::canonicalize(explicit).map_err(|err| {
            RunError::preflight(
                ErrorCode::NavigatorNotFound,
                "navigator binary does not exist",
                serde_json::json!({"path": explicit, "source": err.to_string()}),
            )
        }),
        None => lookup.find(&config.navigator_program).ok_or_else(|| {
            RunError::preflight(
                ErrorCode::NavigatorNotFound,
                "navigator was not found on the search path",
                serde_json::json!({"program": config.navigator_program}),
            )
        }),
    }
}

pub fn check_navigator_functional(navigator: &Path) -> RunResult<()> {
    let output = Command::new(navigator)
        .arg("--version")
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .map_err(|err| {
            RunError::preflight(
                ErrorCode::NavigatorNotFunctional,
                "navigator could not be started",
                serde_json::json!({"path": navigator, "source": err.to_string()}),
            )
        })?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    if output.status.success() && stdout.trim_start().starts_with(NAVIGATOR_VERSION_PREFIX) {
        Ok(())
    } else {
        Err(RunError::preflight(
            ErrorCode::NavigatorNotFunctional,
            "navigator did not report its version",
            serde_json::json!({
                "path": navigator,
                "exit_code": output.status.code(),
                "stdout": stdout.trim(),
            }),
        ))
    }
}

/// Program lookup over the configured search path.
pub struct Lookup {
    paths: Option<OsString>,
    cwd: PathBuf,
}

impl Lookup {
    pub fn new(config: &OrchestratorConfig, working_directory: &Path) -> Self {
        let paths = config
            .search_path
            .clone()
            .map(OsString::from)
            .or_else(|| std::env::var_os("PATH"));
        let cwd = if working_directory.is_dir() {
            working_directory.to_path_buf()
        } else {
            std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"))
        };
        Self { paths, cwd }
    }

    pub fn find(&self, program: &str) -> Option<PathBuf> {
        which::which_in(program, self.paths.as_ref(), &self.cwd).ok()
    }
}
