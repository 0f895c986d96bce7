//! navrun CLI: drive ansible-navigator runs from a run spec file.
//!
//! Human-readable progress and diagnostics go to stderr; `--json` output and
//! query results go to stdout.

// CLI-specific lint allowances (CLI binary, not library)
#![allow(missing_docs)]
#![allow(clippy::print_stdout)] // CLI must print to stdout
#![allow(clippy::print_stderr)] // CLI must print to stderr
#![allow(clippy::exit)] // CLI uses exit codes
#![allow(clippy::fn_params_excessive_bools)] // CLI flags are naturally bools

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use miette::{IntoDiagnostic, Result};
use navrun::runner::error::{Diagnostics, RunError};
use navrun::runner::validate_spec;
use navrun::spec::{load_config_file, load_run_spec_file};
use navrun::{Orchestrator, OrchestratorConfig, RunOutcome, RunSpec};
use std::io;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod progress;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "NAVRUN_LOG";

/// Color output mode
#[derive(Copy, Clone, Debug, Default, ValueEnum)]
enum ColorMode {
    /// Auto-detect based on terminal and `NO_COLOR` env
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

#[derive(Debug, Parser)]
#[command(
    name = "navrun",
    version,
    about = "Run ansible-navigator playbooks from a run spec"
)]
struct Cli {
    /// Control color output
    #[arg(long, value_enum, default_value = "auto", global = true)]
    color: ColorMode,

    #[arg(
        long,
        short = 'v',
        global = true,
        help = "Log debug events to stderr (overridden by NAVRUN_LOG)"
    )]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Validate, stage and execute one run
    Run {
        #[arg(long, help = "Run spec file (YAML or JSON)")]
        spec: PathBuf,
        #[arg(long, help = "Orchestrator config file (YAML or JSON)")]
        config: Option<PathBuf>,
        #[arg(long, help = "Keep the run directory after the run")]
        persist: bool,
        #[arg(long)]
        json: bool,
    },
    /// Check that the host can run a spec, without staging anything
    Preflight {
        #[arg(long, help = "Run spec file (YAML or JSON)")]
        spec: PathBuf,
        #[arg(long, help = "Orchestrator config file (YAML or JSON)")]
        config: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Check a run spec's keys, known hosts, filters and names
    Validate {
        #[arg(long, help = "Run spec file (YAML or JSON)")]
        spec: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completions for bash, zsh, or fish
    Completions {
        #[arg(value_enum, help = "Shell to generate completions for")]
        shell: Shell,
    },
}

/// Configure color output based on CLI flag and environment.
///
/// Returns whether colors are in use.
fn configure_colors(mode: ColorMode) -> bool {
    let use_color = match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => {
            if std::env::var("NO_COLOR").is_ok() {
                false
            } else {
                supports_color::on(supports_color::Stream::Stderr).is_some()
            }
        }
    };

    miette::set_hook(Box::new(move |_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .color(use_color)
                .unicode(use_color)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set
    use_color
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let color = configure_colors(cli.color);
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Run {
            spec,
            config,
            persist,
            json,
        } => cmd_run(&spec, config.as_deref(), persist, json, color),
        Commands::Preflight { spec, config, json } => cmd_preflight(&spec, config.as_deref(), json),
        Commands::Validate { spec, json } => cmd_validate(&spec, json),
        Commands::Completions { shell } => cmd_completions(shell),
    }
}

// =============================================================================
// Command Handlers
// =============================================================================

/// Handle the run command.
fn cmd_run(
    spec_path: &Path,
    config_path: Option<&Path>,
    persist: bool,
    json: bool,
    color: bool,
) -> Result<()> {
    let (spec, mut config) = match load_inputs(spec_path, config_path) {
        Ok(inputs) => inputs,
        Err(err) => return emit_error(json, &err),
    };
    if persist {
        config.persist_run_directory = true;
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    ctrlc::set_handler(move || on_interrupt.cancel()).into_diagnostic()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .into_diagnostic()?;
    let spinner = (!json).then(|| progress::RunSpinner::start(&spec, color));
    let outcome = runtime.block_on(Orchestrator::new(config).run(spec, cancel));
    if let Some(spinner) = spinner {
        spinner.finish(&outcome);
    }
    emit_outcome(json, &outcome)
}

/// Handle the preflight command.
fn cmd_preflight(spec_path: &Path, config_path: Option<&Path>, json: bool) -> Result<()> {
    let (spec, config) = match load_inputs(spec_path, config_path) {
        Ok(inputs) => inputs,
        Err(err) => return emit_error(json, &err),
    };
    let (report, diagnostics) = Orchestrator::new(config).preflight(&spec);
    if json {
        let payload = serde_json::json!({"report": report, "diagnostics": diagnostics});
        println!("{payload}");
    } else {
        if let Some(navigator) = &report.navigator {
            eprintln!("navigator: {}", navigator.display());
        }
        if let Some(engine) = report.container_engine {
            eprintln!("container engine: {engine}");
        }
        print_diagnostics(&diagnostics);
        if !diagnostics.has_errors() {
            eprintln!("preflight passed");
        }
    }
    exit_for(&diagnostics)
}

/// Handle the validate command.
fn cmd_validate(spec_path: &Path, json: bool) -> Result<()> {
    let spec = match load_run_spec_file(spec_path) {
        Ok(spec) => spec,
        Err(err) => return emit_error(json, &err),
    };
    let diagnostics = validate_spec(&spec);
    if json {
        let payload = serde_json::to_string(&diagnostics).into_diagnostic()?;
        println!("{payload}");
    } else {
        print_diagnostics(&diagnostics);
        if !diagnostics.has_errors() {
            eprintln!("spec is valid");
        }
    }
    exit_for(&diagnostics)
}

/// Handle the completions command.
#[allow(clippy::unnecessary_wraps)] // Consistent with other command handlers
fn cmd_completions(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
    Ok(())
}

fn load_inputs(
    spec_path: &Path,
    config_path: Option<&Path>,
) -> Result<(RunSpec, OrchestratorConfig), RunError> {
    let spec = load_run_spec_file(spec_path)?;
    debug!(path = %spec_path.display(), run_id = %spec.id, "loaded run spec");
    let config = match config_path {
        Some(path) => load_config_file(path)?,
        None => OrchestratorConfig::default(),
    };
    Ok((spec, config))
}

fn emit_outcome(json: bool, outcome: &RunOutcome) -> Result<()> {
    if json {
        let payload = serde_json::to_string(outcome).into_diagnostic()?;
        println!("{payload}");
    } else {
        print_diagnostics(&outcome.diagnostics);
        for (name, query) in &outcome.artifact_queries {
            for result in &query.results {
                println!("{name}: {result}");
            }
        }
        if let Some(hosts) = &outcome.known_hosts {
            eprintln!("known hosts: {} entries", hosts.len());
        }
        if let Some(dir) = outcome.run_directory.as_ref().filter(|dir| dir.exists()) {
            eprintln!("run directory kept at: {}", dir.display());
        }
    }
    exit_for(&outcome.diagnostics)
}

fn emit_error(json: bool, err: &RunError) -> Result<()> {
    if json {
        let payload = serde_json::to_string(&err.to_error_info()).into_diagnostic()?;
        println!("{payload}");
    } else {
        eprintln!("error: {err}");
    }
    std::process::exit(err.class().exit_code());
}

fn print_diagnostics(diagnostics: &Diagnostics) {
    for err in &diagnostics.errors {
        eprintln!("error[{}]: {}", err.code, err.message);
    }
    for warning in &diagnostics.warnings {
        eprintln!("warning[{}]: {}", warning.code, warning.message);
    }
}

/// Exit with the code of the first error's class, if there is one.
#[allow(clippy::unnecessary_wraps)]
fn exit_for(diagnostics: &Diagnostics) -> Result<()> {
    match diagnostics.errors.first() {
        Some(first) => std::process::exit(first.class.exit_code()),
        None => Ok(()),
    }
}
