//! Run orchestration: validate, preflight, stage, execute, collect, clean up.

pub mod error;
mod validate;

pub use error::{Diagnostics, ErrorClass, ErrorCode, ErrorInfo, RunError, RunResult};
pub use validate::validate_spec;

use crate::artifact::{self, PlaybookArtifact};
use crate::command::{self, NavigatorCommand, StagedRun};
use crate::exec::{self, Deadline, ExecutionOutput};
use crate::model::{
    ArtifactQuery, Inventory, NavigatorSettings, Operation, OrchestratorConfig, RunOutcome,
    RunPhase, RunSpec, RunStatus,
};
use crate::preflight::{self, PreflightReport};
use crate::query;
use crate::rundir::{
    RunDirectory, StagedPath, ARTIFACT_FILE, EXTRA_VARS_FILE, INVENTORIES_DIR, LOG_FILE,
    PLAYBOOK_FILE, PREVIOUS_INVENTORIES_DIR, SETTINGS_FILE,
};
use crate::secrets;
use crate::settings;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Drives navigator runs with a fixed set of defaults.
#[derive(Clone, Debug, Default)]
pub struct Orchestrator {
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn validate(&self, spec: &RunSpec) -> Diagnostics {
        validate_spec(spec)
    }

    pub fn preflight(&self, spec: &RunSpec) -> (PreflightReport, Diagnostics) {
        preflight::check(spec, &self.config)
    }

    /// Perform one run. Failures are reported in the outcome, never as a panic
    /// or an early return, and the run directory is always cleaned up unless
    /// the configuration asks to keep it.
    pub async fn run(&self, spec: RunSpec, cancel: CancellationToken) -> RunOutcome {
        let mut run = RunState::new(&spec);
        info!(
            run_id = %spec.id,
            run_counter = spec.run_counter,
            operation = %spec.operation,
            "run started"
        );

        run.enter(RunPhase::Validating);
        run.diagnostics.extend(validate_spec(&spec));
        if run.diagnostics.has_errors() {
            return run.finish(RunStatus::Rejected);
        }

        run.enter(RunPhase::Preflighting);
        let Some(report) = self.preflight_blocking(&spec, &mut run).await else {
            return run.finish(RunStatus::Rejected);
        };
        let Some(navigator) = report.navigator.clone() else {
            return run.finish(RunStatus::Rejected);
        };
        if cancel.is_cancelled() {
            run.diagnostics.push_error(&cancelled_before_start());
            return run.finish(RunStatus::TimedOut);
        }

        run.enter(RunPhase::Staging);
        let timeout_secs = self.config.effective_timeout_secs(spec.timeout_secs);
        let engine = report
            .container_engine
            .or(spec.execution_environment.container_engine)
            .unwrap_or(self.config.default_container_engine);
        let mut navigator_settings = NavigatorSettings::from_environment(
            &spec.execution_environment,
            &self.config,
            engine.as_str(),
            timeout_secs,
        );
        let dir = match RunDirectory::create(
            &self.config.base_run_directory,
            spec.id,
            spec.run_counter,
            &mut navigator_settings,
        ) {
            Ok(dir) => dir,
            Err(err) => {
                run.diagnostics.push_error(&err);
                return run.finish(RunStatus::Failed);
            }
        };
        run.run_directory = Some(dir.path().to_path_buf());

        let status = self
            .staged_run(&spec, &dir, navigator_settings, navigator, timeout_secs, cancel, &mut run)
            .await;

        run.enter(RunPhase::Cleanup);
        if self.config.persist_run_directory {
            info!(path = %dir.path().display(), "keeping run directory");
        } else if let Err(err) = dir.remove() {
            warn!(error = %err, "run directory cleanup failed");
            run.diagnostics.push_warning(&err);
        }
        run.finish(status)
    }

    async fn preflight_blocking(
        &self,
        spec: &RunSpec,
        run: &mut RunState,
    ) -> Option<PreflightReport> {
        let spec = spec.clone();
        let config = self.config.clone();
        match tokio::task::spawn_blocking(move || preflight::check(&spec, &config)).await {
            Ok((report, diagnostics)) => {
                let failed = diagnostics.has_errors();
                run.diagnostics.extend(diagnostics);
                (!failed).then_some(report)
            }
            Err(err) => {
                run.diagnostics
                    .push_error(&RunError::io(ErrorCode::Io, "preflight task failed", err));
                None
            }
        }
    }

    /// Everything between creating the run directory and removing it.
    #[allow(clippy::too_many_arguments)]
    async fn staged_run(
        &self,
        spec: &RunSpec,
        dir: &RunDirectory,
        mut navigator_settings: NavigatorSettings,
        navigator: PathBuf,
        timeout_secs: u64,
        cancel: CancellationToken,
        run: &mut RunState,
    ) -> RunStatus {
        let Some(staged) = stage(spec, dir, &mut navigator_settings, &mut run.diagnostics) else {
            return RunStatus::Failed;
        };
        if let Err(err) = settings::write(dir, &navigator_settings) {
            run.diagnostics.push_error(&err);
            return RunStatus::Failed;
        }
        run.enter(RunPhase::SettingsGenerated);

        let navigator_command = command::build(navigator.display().to_string(), spec, &staged);
        let rendered = navigator_command.render();
        info!(command = %rendered, "navigator command built");
        run.command = Some(rendered);
        if cancel.is_cancelled() {
            run.diagnostics.push_error(&cancelled_before_start());
            return RunStatus::TimedOut;
        }

        run.enter(RunPhase::Executing);
        let deadline = Deadline {
            timeout: Duration::from_secs(timeout_secs),
            grace: self.config.termination_grace(),
            cancel,
        };
        let output = match exec::execute(&navigator_command, &deadline).await {
            Ok(output) => output,
            Err(err) => {
                run.diagnostics.push_error(&err);
                return RunStatus::Failed;
            }
        };

        if !output.success {
            let artifact = artifact::read(&staged.artifact.host);
            let err =
                classify_failure(&output, timeout_secs, artifact.as_ref(), &mut run.diagnostics);
            let status = if err.code == ErrorCode::Timeout {
                RunStatus::TimedOut
            } else {
                RunStatus::Failed
            };
            run.diagnostics.push_error(&err);
            if let Ok(artifact) = &artifact {
                run.enter(RunPhase::ArtifactRead);
                answer_queries(spec, artifact, Severity::Warning, run);
            }
            read_back_known_hosts(&staged, Severity::Warning, run);
            return status;
        }

        collect_results(spec, &staged, &navigator_command, run)
    }
}

fn cancelled_before_start() -> RunError {
    RunError::timeout("navigator run was cancelled before it started", None)
}

/// Write the run's inputs and secrets into the run directory.
///
/// Each step reports into `diagnostics`; `None` means at least one failed.
fn stage(
    spec: &RunSpec,
    dir: &RunDirectory,
    navigator_settings: &mut NavigatorSettings,
    diagnostics: &mut Diagnostics,
) -> Option<StagedRun> {
    let before = diagnostics.errors.len();

    let playbook = diagnostics.record(dir.write_file(PLAYBOOK_FILE, spec.playbook.as_bytes()));
    let inventories = write_inventories(dir, INVENTORIES_DIR, &spec.inventories, diagnostics);

    let previous_inventories_dir = if spec.operation == Operation::Update {
        let staged = diagnostics.record(dir.create_subdir(PREVIOUS_INVENTORIES_DIR));
        write_inventories(dir, PREVIOUS_INVENTORIES_DIR, &spec.previous_inventories, diagnostics);
        staged
    } else {
        None
    };

    let extra_vars = if spec.options.extra_vars.is_empty() {
        None
    } else {
        match serde_json::to_vec_pretty(&spec.options.extra_vars) {
            Ok(data) => diagnostics.record(dir.write_file(EXTRA_VARS_FILE, &data)),
            Err(err) => {
                let err = RunError::io(ErrorCode::Io, "failed to encode extra vars", err);
                diagnostics.push_error(&err);
                None
            }
        }
    };

    let private_keys = diagnostics
        .record(secrets::provision_private_keys(dir, navigator_settings, &spec.private_keys))
        .unwrap_or_default();
    let known_hosts = spec.known_hosts.as_ref().and_then(|hosts| {
        diagnostics.record(secrets::provision_known_hosts(dir, navigator_settings, hosts))
    });

    if diagnostics.errors.len() > before {
        return None;
    }

    let staged = StagedRun {
        playbook: playbook?,
        inventories,
        inventories_dir: dir.stage(INVENTORIES_DIR),
        previous_inventories_dir,
        extra_vars,
        private_keys,
        known_hosts,
        settings: dir.stage(SETTINGS_FILE),
        artifact: dir.stage(ARTIFACT_FILE),
        log: dir.stage(LOG_FILE),
    };
    let markers = command::marker_environment(spec, &staged);
    command::register_markers(navigator_settings, &markers);
    Some(staged)
}

fn write_inventories(
    dir: &RunDirectory,
    subdir: &str,
    inventories: &[Inventory],
    diagnostics: &mut Diagnostics,
) -> Vec<StagedPath> {
    inventories
        .iter()
        .filter_map(|inventory| {
            diagnostics.record(dir.write_file(
                format!("{subdir}/{}", inventory.name),
                inventory.content.as_bytes(),
            ))
        })
        .collect()
}

/// Decide why an unsuccessful run failed.
///
/// The playbook artifact is authoritative when it can be read; otherwise
/// the captured output is reported and a warning records the missing
/// artifact.
pub fn classify_failure(
    output: &ExecutionOutput,
    timeout_secs: u64,
    artifact: Result<&PlaybookArtifact, &RunError>,
    diagnostics: &mut Diagnostics,
) -> RunError {
    let stopped = output.deadline_exceeded || output.cancelled;
    let (timed_out, detail) = match artifact {
        Ok(artifact) => (artifact.timed_out() || stopped, artifact.stdout_text()),
        Err(err) => {
            diagnostics.push_warning(err);
            (stopped, output.output.clone())
        }
    };
    let context = serde_json::json!({
        "exit_code": output.exit_code,
        "deadline_exceeded": output.deadline_exceeded,
        "cancelled": output.cancelled,
        "output": detail,
    });

    if timed_out {
        let reason = if output.cancelled {
            "navigator run was cancelled".to_string()
        } else {
            format!("navigator run timed out after {timeout_secs}s")
        };
        RunError::timeout(format!("{reason}:\n{detail}"), context)
    } else {
        RunError::execution(
            format!(
                "navigator run failed with exit code {}:\n{detail}",
                output
                    .exit_code
                    .map_or_else(|| "unknown".to_string(), |code| code.to_string())
            ),
            context,
        )
    }
}

/// How a post-processing failure is recorded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Severity {
    /// Fails the run.
    Error,
    /// Reported alongside an error that already failed the run.
    Warning,
}

impl Severity {
    fn record(self, diagnostics: &mut Diagnostics, err: &RunError) {
        match self {
            Self::Error => diagnostics.push_error(err),
            Self::Warning => diagnostics.push_warning(err),
        }
    }
}

/// Read the artifact, answer the queries and read back known hosts.
fn collect_results(
    spec: &RunSpec,
    staged: &StagedRun,
    navigator_command: &NavigatorCommand,
    run: &mut RunState,
) -> RunStatus {
    let artifact = match artifact::read(&staged.artifact.host) {
        Ok(artifact) => artifact,
        Err(err) => {
            run.diagnostics.push_error(&err);
            return RunStatus::Failed;
        }
    };
    run.enter(RunPhase::ArtifactRead);
    answer_queries(spec, &artifact, Severity::Error, run);
    read_back_known_hosts(staged, Severity::Error, run);

    info!(
        program = %navigator_command.program,
        queries = run.artifact_queries.len(),
        "run results collected"
    );
    if run.diagnostics.has_errors() {
        RunStatus::Failed
    } else {
        RunStatus::Succeeded
    }
}

/// Evaluate every query; a failing query keeps an empty result list.
fn answer_queries(
    spec: &RunSpec,
    artifact: &PlaybookArtifact,
    severity: Severity,
    run: &mut RunState,
) {
    let mut answered = BTreeMap::new();
    for (name, query) in &spec.artifact_queries {
        let results = match query::evaluate(&query.filter, &artifact.document) {
            Ok(results) => results,
            Err(mut err) => {
                if let Some(serde_json::Value::Object(context)) = err.context.as_mut() {
                    context.insert("query".to_string(), serde_json::json!(name));
                }
                severity.record(&mut run.diagnostics, &err);
                Vec::new()
            }
        };
        answered.insert(
            name.clone(),
            ArtifactQuery {
                filter: query.filter.clone(),
                results,
            },
        );
    }
    run.artifact_queries = answered;
    run.enter(RunPhase::Queried);
}

fn read_back_known_hosts(staged: &StagedRun, severity: Severity, run: &mut RunState) {
    let Some(path) = &staged.known_hosts else {
        return;
    };
    match secrets::read_known_hosts(path) {
        Ok(hosts) => run.known_hosts = Some(hosts),
        Err(err) => severity.record(&mut run.diagnostics, &err),
    }
}

/// Mutable bookkeeping for one run, turned into a [`RunOutcome`] at the end.
struct RunState {
    run_id: crate::model::RunId,
    run_counter: u64,
    phase: RunPhase,
    started: Instant,
    diagnostics: Diagnostics,
    command: Option<String>,
    artifact_queries: BTreeMap<String, ArtifactQuery>,
    known_hosts: Option<Vec<String>>,
    run_directory: Option<PathBuf>,
}

impl RunState {
    fn new(spec: &RunSpec) -> Self {
        Self {
            run_id: spec.id,
            run_counter: spec.run_counter,
            phase: RunPhase::Idle,
            started: Instant::now(),
            diagnostics: Diagnostics::new(),
            command: None,
            artifact_queries: spec.artifact_queries.clone(),
            known_hosts: None,
            run_directory: None,
        }
    }

    fn enter(&mut self, phase: RunPhase) {
        self.phase = phase;
        info!(run_id = %self.run_id, run_counter = self.run_counter, phase = %phase, "run phase");
    }

    /// The outcome reports the last working phase, not `Terminal`.
    fn finish(mut self, status: RunStatus) -> RunOutcome {
        let phase = self.phase;
        self.enter(RunPhase::Terminal);
        let duration_ms = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            run_id = %self.run_id,
            run_counter = self.run_counter,
            status = ?status,
            errors = self.diagnostics.errors.len(),
            warnings = self.diagnostics.warnings.len(),
            duration_ms,
            "run finished"
        );
        RunOutcome {
            run_id: self.run_id,
            run_counter: self.run_counter,
            status,
            phase,
            diagnostics: self.diagnostics,
            command: self.command,
            artifact_queries: self.artifact_queries,
            known_hosts: self.known_hosts,
            run_directory: self.run_directory,
            duration_ms,
        }
    }
}
