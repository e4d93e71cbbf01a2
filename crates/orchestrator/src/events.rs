//! Per-operation logging of engine events

use crate::result::Operation;
use declarative::{DiffSummary, EngineEvents, PlannedStep, ResourceChange, StepOutcome};

/// Engine event sink that logs every step tagged with its stack
pub struct OperationLog {
    prefix: String,
    completed: usize,
    failed: usize,
}

impl OperationLog {
    pub fn new(stack: &str, operation: Operation) -> Self {
        Self {
            prefix: format!("[{stack} {operation}]"),
            completed: 0,
            failed: 0,
        }
    }

    /// Steps finished so far, failed ones included
    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn failed(&self) -> usize {
        self.failed
    }
}

impl EngineEvents for OperationLog {
    fn on_plan(&mut self, steps: &[PlannedStep]) {
        let summary = DiffSummary::from_steps(steps);
        log::info!(
            "{} plan: {} to create, {} to update, {} to replace, {} to delete, {} unchanged",
            self.prefix,
            summary.additions,
            summary.updates,
            summary.replacements,
            summary.removals,
            summary.unchanged
        );
    }

    fn on_step_start(&mut self, step: &PlannedStep) {
        log::debug!("{} {} {} ({})", self.prefix, step.op, step.name(), step.resource_type);
    }

    fn on_step_complete(&mut self, change: &ResourceChange) {
        self.completed += 1;
        match &change.outcome {
            StepOutcome::Succeeded if change.op.is_change() => {
                log::info!("{} {} {}: done", self.prefix, change.op, change.name());
            }
            StepOutcome::Succeeded => {
                log::debug!("{} {} unchanged", self.prefix, change.name());
            }
            StepOutcome::Failed { error } => {
                self.failed += 1;
                log::error!("{} {} {} failed: {error}", self.prefix, change.op, change.name());
            }
        }
    }

    fn on_diagnostic(&mut self, urn: Option<&str>, message: &str) {
        match urn {
            Some(urn) => log::warn!("{} {}: {message}", self.prefix, declarative::urn_name(urn)),
            None => log::warn!("{} {message}", self.prefix),
        }
    }
}
