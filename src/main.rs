use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sitewright::config::SiteConfig;
use sitewright::{Mode, build};

#[derive(Parser, Debug)]
#[command(name = "sitewright", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Development build
    Build,
    /// Build, then rebuild and reload on change
    Watch,
    /// Serve the existing dist directory
    Serve,
    /// Production build, then serve and watch
    Deploy,
    /// Development build, then serve and watch
    Dev,
    /// Clean, then render templates only
    Test,
    /// Wipe the dist directory
    Clean,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Dev) {
        Command::Build => build::build(SiteConfig::default())?,
        Command::Watch => build::build_and_watch(Mode::Development, false)?,
        Command::Serve => build::serve(),
        Command::Deploy => build::build_and_watch(Mode::Production, true)?,
        Command::Dev => build::build_and_watch(Mode::Development, true)?,
        Command::Test => build::smoke_test()?,
        Command::Clean => build::clean()?,
    }

    Ok(())
}
