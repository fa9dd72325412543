//! JSON output formatter

use citerag_core::ingest::{HistoryEntry, IngestReport};
use citerag_core::query::Citation;

pub fn format_answer(answer: &str, citations: &[Citation]) -> String {
    let output = serde_json::json!({
        "answer": answer,
        "citations": citations,
    });
    serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string()) + "\n"
}

pub fn format_documents(entries: &[HistoryEntry]) -> String {
    serde_json::to_string_pretty(entries).unwrap_or_else(|_| "[]".to_string()) + "\n"
}

pub fn format_ingest(report: &IngestReport) -> String {
    let output = serde_json::json!({
        "success": true,
        "count": report.count,
        "message": report.message,
        "document": report.entry,
    });
    serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string()) + "\n"
}
