use crate::cli::PluginsCommand;
use crate::ui;
use crate::Context;
use anyhow::Result;
use plugins::InstallStatus;

pub fn run(ctx: &Context, cmd: &PluginsCommand) -> Result<()> {
    match cmd {
        PluginsCommand::Install => install(ctx),
        PluginsCommand::List => list(ctx),
    }
}

fn install(ctx: &Context) -> Result<()> {
    for outcome in ctx.orchestrator().install_plugins()? {
        match outcome.status {
            InstallStatus::Installed => ui::success(&format!("Installed {}", outcome.requirement)),
            InstallStatus::AlreadyInstalled => {
                ui::info(&format!("{} already installed", outcome.requirement));
            }
        }
        ui::dim(&outcome.path.display().to_string());
    }
    Ok(())
}

fn list(ctx: &Context) -> Result<()> {
    let dir = ctx.orchestrator().plugin_dir();
    let installed = plugins::installed(&dir)?;

    if ctx.json {
        let manifests: Vec<_> = installed.iter().map(|p| &p.manifest).collect();
        println!("{}", serde_json::to_string_pretty(&manifests)?);
        return Ok(());
    }
    if installed.is_empty() {
        ui::info(&format!("No plugins installed in {}", dir.display()));
        return Ok(());
    }

    ui::header("Installed plugins");
    for plugin in &installed {
        ui::kv(
            &plugin.requirement().to_string(),
            &format!(
                "{} ({})",
                plugin.manifest.source,
                plugin.manifest.installed_at.format("%Y-%m-%d")
            ),
        );
    }
    Ok(())
}
