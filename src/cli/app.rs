//! Main CLI application structure

use anyhow::Result;
use clap::{Parser, Subcommand};

use super::expand::{self, ExpandArgs};
use super::output::{Output, OutputFormat};
use super::site::{self, SiteArgs};
use crate::storage::Config;

#[derive(Parser)]
#[command(name = "docsh")]
#[command(author, version, about = "Shell-command includes for AsciiDoc and a local docs build driver")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the shell includes of a document and print the result
    Expand(ExpandArgs),

    /// Write the local-dev playbook
    Playbook(SiteArgs),

    /// Build the site once with the local-dev playbook
    Build(SiteArgs),

    /// Build the site and rebuild on changes
    Dev(SiteArgs),
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let output = Output::new(cli.format);
    let config = Config::load()?;

    tracing::debug!(?config, "loaded configuration");

    match cli.command {
        Commands::Expand(args) => expand::run(args, &config, &output)?,
        Commands::Playbook(args) => site::playbook(args, &config, &output)?,
        Commands::Build(args) => site::build(args, &config, &output)?,
        Commands::Dev(args) => site::dev(args, &config, &output)?,
    }

    tracing::debug!("command completed successfully");
    Ok(())
}

/// Logs go to stderr; `RUST_LOG` overrides the level chosen by `--verbose`
fn init_logging(verbose: bool) {
    let default = if verbose { "docsh=debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
