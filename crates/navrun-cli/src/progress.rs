//! Run progress on stderr using indicatif.

use indicatif::{ProgressBar, ProgressStyle};
use navrun::{RunOutcome, RunSpec, RunStatus};
use std::io::Write;
use std::time::Duration;

/// Spinner shown while a run is in flight.
pub struct RunSpinner {
    bar: ProgressBar,
    color: bool,
}

impl RunSpinner {
    pub fn start(spec: &RunSpec, color: bool) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(format!(
            "{} run {} (attempt {})",
            spec.operation, spec.id, spec.run_counter
        ));
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar, color }
    }

    pub fn finish(self, outcome: &RunOutcome) {
        self.bar.finish_and_clear();
        let (label, ansi) = match outcome.status {
            RunStatus::Succeeded => ("succeeded", "32"),
            RunStatus::Failed => ("failed", "31"),
            RunStatus::TimedOut => ("timed out", "33"),
            RunStatus::Rejected => ("rejected", "31"),
        };
        let status = if self.color {
            format!("\x1b[{ansi}m{label}\x1b[0m")
        } else {
            label.to_string()
        };
        // stderr keeps stdout free for results
        let _ = writeln!(
            std::io::stderr(),
            "run {status} in phase {}: {}ms total",
            outcome.phase,
            outcome.duration_ms
        );
    }
}
