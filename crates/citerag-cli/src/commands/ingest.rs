//! Ingest command

use crate::app::{IngestArgs, OutputFormat};
use crate::output::json;
use anyhow::{Context, Result};
use citerag_core::ingest::{IngestRequest, Ingestor};
use citerag_core::Config;

pub async fn run(args: IngestArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let request = match (args.file, args.text) {
        (Some(path), _) => {
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            IngestRequest::file(filename, bytes, None).with_source_name(args.name)
        }
        (None, Some(text)) => IngestRequest::text(text, args.name),
        (None, None) => anyhow::bail!("Provide a file or --text"),
    };

    let ingestor = Ingestor::from_config(config)?;
    let report = ingestor.ingest(request).await?;

    match format {
        OutputFormat::Json => print!("{}", json::format_ingest(&report)),
        OutputFormat::Cli => println!("{} ({})", report.message, report.entry.name),
    }
    Ok(())
}
