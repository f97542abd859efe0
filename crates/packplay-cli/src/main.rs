use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::filter::EnvFilter;

mod commands;
mod config;

#[derive(Parser)]
#[command(
    name = "packplay",
    version,
    about = "Install-test an npm package the way its consumers get it",
    long_about = "Packs a package exactly as it would be published, installs it into a \
                  throwaway project and runs code samples against it.\n\n\
                  Run a suite:     packplay test samples.toml\n\
                  Build the tgz:   packplay pack ./my-package --out dist"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a suite of code samples against a package
    Test(commands::test::TestCommand),

    /// Build the publish-equivalent archive of a package
    Pack(commands::pack::PackCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(default_level.parse()?))
        .with_writer(std::io::stderr)
        .init();

    let config = config::load_config(cli.config.as_deref())?;
    tracing::debug!(?config, "loaded configuration");

    match cli.command {
        Commands::Test(cmd) => cmd.run(&config).await,
        Commands::Pack(cmd) => cmd.run(&config).await,
    }
}
