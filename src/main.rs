//! Perch Admin
//!
//! Command-line entry point: renders listings and forms and runs the save
//! pipeline against a declarative admin configuration.

use clap::Parser;
use perch_cli::Cli;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so rendered pages on stdout stay clean
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!("Running {:?}", cli.command);
    perch_cli::run(cli)
}
