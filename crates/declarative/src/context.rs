//! Event callbacks for engine passes
//!
//! These traits allow the engine to report progress without depending on
//! a specific logger or terminal UI.

use crate::diff::PlannedStep;
use crate::types::ResourceChange;

/// Receives progress of a preview, update or destroy pass
pub trait EngineEvents: Send {
    /// Called once with the steps the pass intends to run
    fn on_plan(&mut self, steps: &[PlannedStep]);

    /// Called before a step touches a provider
    fn on_step_start(&mut self, step: &PlannedStep);

    /// Called when a step completes, successfully or not
    fn on_step_complete(&mut self, change: &ResourceChange);

    /// Free-form diagnostic, optionally tied to a resource
    fn on_diagnostic(&mut self, urn: Option<&str>, message: &str);
}

/// No-op event sink
pub struct NoEvents;

impl EngineEvents for NoEvents {
    fn on_plan(&mut self, _steps: &[PlannedStep]) {}
    fn on_step_start(&mut self, _step: &PlannedStep) {}
    fn on_step_complete(&mut self, _change: &ResourceChange) {}
    fn on_diagnostic(&mut self, _urn: Option<&str>, _message: &str) {}
}

/// Fan events out to two sinks
pub struct Tee<'a, A: EngineEvents + ?Sized, B: EngineEvents + ?Sized> {
    pub first: &'a mut A,
    pub second: &'a mut B,
}

impl<A: EngineEvents + ?Sized, B: EngineEvents + ?Sized> EngineEvents for Tee<'_, A, B> {
    fn on_plan(&mut self, steps: &[PlannedStep]) {
        self.first.on_plan(steps);
        self.second.on_plan(steps);
    }

    fn on_step_start(&mut self, step: &PlannedStep) {
        self.first.on_step_start(step);
        self.second.on_step_start(step);
    }

    fn on_step_complete(&mut self, change: &ResourceChange) {
        self.first.on_step_complete(change);
        self.second.on_step_complete(change);
    }

    fn on_diagnostic(&mut self, urn: Option<&str>, message: &str) {
        self.first.on_diagnostic(urn, message);
        self.second.on_diagnostic(urn, message);
    }
}
