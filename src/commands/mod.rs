pub mod destroy;
pub mod handle;
pub mod plugins;
pub mod site;
pub mod stacks;
pub mod unlock;

use crate::Context;
use crate::ui;
use anyhow::Result;
use orchestrator::{LifecycleResult, Response, Status};

/// Print a result the way the user asked for it
///
/// A failed result becomes an error, so the process exits non-zero.
pub(crate) fn report(ctx: &Context, result: &LifecycleResult) -> Result<()> {
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&Response::from(result))?);
    } else if !ctx.quiet || !result.is_success() {
        print_human(result);
    }

    if result.is_success() {
        Ok(())
    } else {
        let kind = result
            .error_kind
            .map_or_else(|| "error".to_string(), |kind| kind.to_string());
        let hint = if result.is_retryable() {
            " (retry once the other operation finishes)"
        } else {
            ""
        };
        anyhow::bail!("{kind} error{hint}")
    }
}

fn print_human(result: &LifecycleResult) {
    if result.status == Status::Previewed {
        ui::header(&format!("Preview of {}", result.stack));
        for step in &result.planned {
            let keys = if step.changed_keys.is_empty() {
                String::new()
            } else {
                format!(" [{}]", step.changed_keys.join(", "))
            };
            println!(
                "  {} {} {}{keys}",
                ui::op_symbol(step.op),
                step.name(),
                step.resource_type
            );
        }
        println!();
    }

    match result.status {
        Status::Failed => ui::error(&result.message),
        Status::Previewed => ui::info(&result.message),
        Status::Created | Status::Destroyed => ui::success(&result.message),
    }

    if let Some(advice) = &result.advice {
        ui::dim(advice);
    }
    if result.status == Status::Failed && !result.changes.is_empty() {
        ui::dim(&format!(
            "{} steps completed before the failure; progress is saved",
            result.summary.total_changes()
        ));
    }
    for (key, value) in &result.outputs {
        ui::kv(key, value);
    }
}
