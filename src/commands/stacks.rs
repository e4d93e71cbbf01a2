use crate::ui;
use crate::Context;
use anyhow::Result;
use chrono::Local;
use colored::Colorize;
use orchestrator::WEBSITE_URL;

pub fn run(ctx: &Context) -> Result<()> {
    let orch = ctx.orchestrator();
    let stacks = match orch.workspace()? {
        Some(workspace) => workspace.list_stacks()?,
        None => Vec::new(),
    };

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&stacks)?);
        return Ok(());
    }

    if stacks.is_empty() {
        ui::info(&format!("No stacks in project {}", orch.project()));
        return Ok(());
    }

    ui::header(&format!("Stacks of {}", orch.project()));
    for stack in &stacks {
        let locked = if stack.lock.is_some() {
            format!(" {}", "locked".yellow())
        } else {
            String::new()
        };
        println!(
            "  {} {}{locked}",
            stack.name.bold(),
            format!("({} resources)", stack.resources).dimmed()
        );
        if let Some(url) = stack.outputs.get(WEBSITE_URL) {
            ui::kv("url", url);
        }
        ui::kv(
            "updated",
            &stack
                .updated_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
        );
        if let Some(lock) = &stack.lock {
            ui::kv("lease", &lock.describe());
        }
    }
    Ok(())
}
