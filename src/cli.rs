use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sitestack")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Create, preview and destroy ephemeral static-site stacks", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print the JSON response instead of human-friendly output
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create or update the stack for a name
    Create(SiteArgs),

    /// Show what `create` would change, without changing anything
    Preview(SiteArgs),

    /// Tear down the stack for a name and remove its record
    Destroy {
        /// Logical name of the stack
        name: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Serve one JSON request ({"name", "operation", "index_content"})
    Handle {
        /// File holding the request (defaults to stdin)
        #[arg(short, long)]
        event: Option<PathBuf>,
    },

    /// List stacks of the project
    Stacks,

    /// Remove a stale lease left by an interrupted operation
    Unlock {
        /// Logical name of the stack
        name: String,
    },

    /// Manage provider plugins
    #[command(subcommand)]
    Plugins(PluginsCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct SiteArgs {
    /// Logical name of the stack
    pub name: String,

    /// Index page content
    #[arg(short, long, conflicts_with = "file", required_unless_present = "file")]
    pub content: Option<String>,

    /// Read the index page from a file
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Object key of the index page
    #[arg(long, default_value = "index.html")]
    pub index_document: String,

    /// Content type of the index page
    #[arg(long, default_value = "text/html; charset=utf-8")]
    pub content_type: String,
}

#[derive(Subcommand)]
pub enum PluginsCommand {
    /// Install the plugins the program needs
    Install,

    /// List installed plugins
    List,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_create_requires_content() {
        assert!(Cli::try_parse_from(["sitestack", "create", "alpha"]).is_err());
        assert!(
            Cli::try_parse_from(["sitestack", "create", "alpha", "-c", "x", "-f", "p.html"])
                .is_err()
        );

        let cli = Cli::try_parse_from(["sitestack", "--json", "create", "alpha", "-c", "<p/>"])
            .unwrap();
        assert!(cli.json);
        let Command::Create(args) = cli.command else {
            panic!("expected create");
        };
        assert_eq!(args.content.as_deref(), Some("<p/>"));
        assert_eq!(args.index_document, "index.html");
    }
}
