//! navrun: runs `ansible-navigator` on behalf of infrastructure tooling.
//!
//! A [`RunSpec`] describes one playbook run. The [`Orchestrator`] validates
//! it, checks the host, stages a private run directory with the playbook,
//! inventories and secrets, writes the navigator settings, executes the
//! navigator under a deadline and extracts results from the playbook
//! artifact with jq filters.

#![forbid(unsafe_code)]
// Library documentation is in progress. Public API types have docs;
// internal types will be documented in future releases.
#![allow(missing_docs)]

pub mod artifact;
pub mod command;
pub mod exec;
pub mod model;
pub mod preflight;
pub mod query;
pub mod rundir;
pub mod runner;
pub mod secrets;
pub mod settings;
pub mod spec;

pub use crate::model::*;
pub use crate::runner::Orchestrator;

pub mod run {
    use super::runner::Orchestrator;
    use super::{OrchestratorConfig, RunOutcome, RunSpec};
    use tokio_util::sync::CancellationToken;

    /// Run `spec` with default configuration and no external cancellation.
    pub async fn run(spec: RunSpec) -> RunOutcome {
        Orchestrator::default()
            .run(spec, CancellationToken::new())
            .await
    }

    pub async fn run_with_config(
        spec: RunSpec,
        config: OrchestratorConfig,
        cancel: CancellationToken,
    ) -> RunOutcome {
        Orchestrator::new(config).run(spec, cancel).await
    }
}
