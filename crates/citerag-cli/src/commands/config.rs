//! Config command

use crate::app::{ConfigArgs, OutputFormat};
use anyhow::Result;
use citerag_core::Config;
use std::path::Path;

const REDACTED: &str = "********";

pub fn run(args: ConfigArgs, path: &Path, format: OutputFormat) -> Result<()> {
    if args.init {
        if path.exists() && !args.force {
            println!("Config already exists at {}", path.display());
            return Ok(());
        }
        let mut defaults = Config::default();
        // Keys come from the environment at load time; never persist them
        defaults.embedding.api_key = None;
        defaults.vector.api_key = None;
        defaults.rerank.api_key = None;
        defaults.generation.api_key = None;
        defaults.save_to(path)?;
        println!("Wrote default config to {}", path.display());
        return Ok(());
    }

    let config = redacted(Config::load_from(path)?);
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
        OutputFormat::Cli => {
            let source = if path.exists() { "" } else { " (not found, showing defaults)" };
            println!("# {}{}", path.display(), source);
            print!("{}", serde_yaml::to_string(&config)?);
        }
    }
    Ok(())
}

fn redacted(mut config: Config) -> Config {
    for key in [
        &mut config.embedding.api_key,
        &mut config.vector.api_key,
        &mut config.rerank.api_key,
        &mut config.generation.api_key,
    ] {
        if key.is_some() {
            *key = Some(REDACTED.to_string());
        }
    }
    config
}
