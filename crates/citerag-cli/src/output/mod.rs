//! Output formatters

pub mod json;
pub mod terminal;

use crate::app::OutputFormat;
use citerag_core::ingest::HistoryEntry;

/// Format the ingestion history
pub fn format_documents(entries: &[HistoryEntry], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => json::format_documents(entries),
        OutputFormat::Cli => terminal::format_documents(entries),
    }
}
