//! CiteRAG CLI
//!
//! Cited answers over your own documents.

use anyhow::Result;
use citerag_core::error::exit_codes;
use citerag_core::{CiteRagError, Config};
use clap::Parser;
use std::path::Path;
use tracing_subscriber::EnvFilter;

mod app;
mod commands;
mod output;

use app::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        let code = e
            .downcast_ref::<CiteRagError>()
            .map(CiteRagError::exit_code)
            .unwrap_or(exit_codes::GENERAL_ERROR);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);

    match cli.command {
        Commands::Serve(args) => commands::serve::run(args, load_config(&config_path)?).await,
        Commands::Ask(args) => commands::ask::run(args, &load_config(&config_path)?, cli.format).await,
        Commands::Ingest(args) => {
            commands::ingest::run(args, &load_config(&config_path)?, cli.format).await
        }
        Commands::Documents => {
            commands::documents::run(&load_config(&config_path)?, cli.format).await
        }
        Commands::Config(args) => commands::config::run(args, &config_path, cli.format),
    }
}

fn load_config(path: &Path) -> Result<Config> {
    Ok(Config::load_from(path)?)
}

/// Logs go to stderr; `RUST_LOG` overrides the defaults
fn init_tracing(cli: &Cli) {
    let base = if matches!(cli.command, Commands::Serve(_)) {
        "info"
    } else {
        "warn"
    };
    let default = if cli.verbose {
        format!(
            "{},citerag_core=debug,citerag_server=debug,citerag=debug",
            base
        )
    } else {
        base.to_string()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
