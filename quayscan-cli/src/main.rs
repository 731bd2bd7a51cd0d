//! quayscan -- look up known vulnerabilities of Quay-hosted images
//!
//! Reports go to stdout, logs to stderr. The process exit code follows
//! [`CliError::exit_code`].

mod cli;
mod commands;
mod error;
mod input;
mod logging;
mod output;

use clap::Parser;

use quayscan_core::config::QuayscanConfig;

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        tracing::debug!(error = %err, "command failed");
        eprintln!("error: {err}");
        std::process::exit(err.exit_code());
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    // A broken config file must not prevent `config validate` from reporting it
    let loaded = QuayscanConfig::load_or_default(&cli.config).await;

    let mut general = loaded
        .as_ref()
        .map(|config| config.general.clone())
        .unwrap_or_default();
    if let Some(level) = cli.log_level {
        general.log_level = level;
    }
    logging::init_tracing(&general).map_err(|e| CliError::Config(e.to_string()))?;

    let writer = OutputWriter::new(cli.output);

    match cli.command {
        Commands::Scan(args) => commands::scan::execute(args, loaded?, &writer).await,
        Commands::Config(args) => commands::config::execute(args, &cli.config, &writer).await,
    }
}
