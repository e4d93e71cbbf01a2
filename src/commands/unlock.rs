use crate::ui;
use crate::Context;
use anyhow::Result;

pub fn run(ctx: &Context, name: &str) -> Result<()> {
    let orch = ctx.orchestrator();
    let stack = orch.stack_name(name)?;

    let Some(workspace) = orch.workspace()? else {
        ui::info(&format!("{stack} is not locked"));
        return Ok(());
    };
    match workspace.break_lock(&stack)? {
        Some(holder) => ui::success(&format!("Removed lease on {stack} held by {}", holder.describe())),
        None => ui::info(&format!("{stack} is not locked")),
    }
    Ok(())
}
