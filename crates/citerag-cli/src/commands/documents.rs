//! Documents command

use crate::app::OutputFormat;
use crate::output::format_documents;
use anyhow::Result;
use citerag_core::ingest::{HistoryLog, JsonFileHistory};
use citerag_core::Config;

pub async fn run(config: &Config, format: OutputFormat) -> Result<()> {
    let history = JsonFileHistory::new(config.history_path());
    let entries = history.list().await?;
    print!("{}", format_documents(&entries, format));
    Ok(())
}
