mod cli;
mod commands;
mod config;
mod paths;
mod progress;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use config::Settings;
use orchestrator::Orchestrator;
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub json: bool,
    pub settings: Settings,
}

impl Context {
    /// Build an orchestrator from the settings; never reused across operations
    pub fn orchestrator(&self) -> Orchestrator {
        Orchestrator::with_builtin_providers(self.settings.orchestrator_config())
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load()?;
    init_logging(&cli, settings.log_level.as_deref());

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        json: cli.json,
        settings,
    };
    log::debug!(
        "project {} on {} (verbosity {})",
        ctx.settings.project,
        ctx.settings.backend_url,
        ctx.verbose
    );

    match cli.command {
        Command::Create(args) => commands::site::create(&ctx, &args),
        Command::Preview(args) => commands::site::preview(&ctx, &args),
        Command::Destroy { name, yes } => commands::destroy::run(&ctx, &name, yes),
        Command::Handle { event } => commands::handle::run(&ctx, event.as_deref()),
        Command::Stacks => commands::stacks::run(&ctx),
        Command::Unlock { name } => commands::unlock::run(&ctx, &name),
        Command::Plugins(cmd) => commands::plugins::run(&ctx, &cmd),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "sitestack", &mut io::stdout());
            Ok(())
        }
    }
}

/// `-q` and `-v` win over `LOG_LEVEL`, which accepts env_logger filters
fn init_logging(cli: &Cli, log_level: Option<&str>) {
    let mut builder = env_logger::Builder::new();
    builder.format_timestamp(None);

    if cli.quiet {
        builder.filter_level(log::LevelFilter::Error);
    } else if cli.verbose > 0 {
        builder.filter_level(match cli.verbose {
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        });
    } else if let Some(filters) = log_level {
        builder.parse_filters(filters);
    } else {
        builder.filter_level(log::LevelFilter::Warn);
    }
    builder.init();
}
