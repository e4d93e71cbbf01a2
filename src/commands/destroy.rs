use crate::progress::StepProgress;
use crate::ui;
use crate::Context;
use anyhow::{Context as _, Result};
use orchestrator::Operation;

pub fn run(ctx: &Context, name: &str, yes: bool) -> Result<()> {
    let orch = ctx.orchestrator();
    let interactive = !ctx.json && console::Term::stdout().is_term();

    if !yes && interactive {
        // a malformed name is reported by the orchestrator
        let stack = orch.stack_name(name).unwrap_or_else(|_| name.to_string());
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(format!("Destroy every resource of {stack}?"))
            .default(false)
            .interact()
            .context("Failed to read confirmation")?;
        if !confirmed {
            ui::warn("Destroy cancelled");
            return Ok(());
        }
    }

    let mut progress = StepProgress::new(ctx.quiet || ctx.json);
    let result = orch.execute_with(name, Operation::Destroy, None, &mut progress);
    progress.finish();

    super::report(ctx, &result)
}
