//! Terminal progress for engine passes

use crate::ui;
use colored::Colorize;
use declarative::{EngineEvents, PlannedStep, ResourceChange, StepOutcome};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner that follows the steps of a pass
///
/// Hidden when output is not a terminal or `quiet` is set.
pub struct StepProgress {
    bar: ProgressBar,
    quiet: bool,
}

impl StepProgress {
    pub fn new(quiet: bool) -> Self {
        let bar = if quiet || !console::Term::stdout().is_term() {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::with_template("{spinner:.green} [{pos}/{len}] {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        };
        Self { bar, quiet }
    }

    /// Remove the spinner
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl EngineEvents for StepProgress {
    fn on_plan(&mut self, steps: &[PlannedStep]) {
        self.bar.set_length(steps.len() as u64);
        self.bar.set_position(0);
    }

    fn on_step_start(&mut self, step: &PlannedStep) {
        self.bar
            .set_message(format!("{} {}", step.op, ui::truncate_path(step.name(), 40)));
    }

    fn on_step_complete(&mut self, change: &ResourceChange) {
        self.bar.inc(1);
        if self.quiet || !change.op.is_change() {
            return;
        }
        let line = match &change.outcome {
            StepOutcome::Succeeded => format!(
                "  {} {} {}",
                ui::op_symbol(change.op),
                change.name(),
                change.resource_type.dimmed()
            ),
            StepOutcome::Failed { error } => {
                format!("  {} {} {}", "✗".red(), change.name(), error.red())
            }
        };
        self.bar.suspend(|| println!("{line}"));
    }

    fn on_diagnostic(&mut self, _urn: Option<&str>, message: &str) {
        if !self.quiet {
            self.bar.suspend(|| ui::warn(message));
        }
    }
}
