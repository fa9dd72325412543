//! Document ingestion
//!
//! Turns raw text or uploaded files into embedded chunks in the vector index
//! and records each successful run in the ingestion history.

mod chunker;
mod history;
mod pipeline;

pub use chunker::{chunk_text, token_estimate, TextChunk};
pub use history::{EntryType, HistoryEntry, HistoryLog, JsonFileHistory};
pub use pipeline::{
    IngestContent, IngestOptions, IngestReport, IngestRequest, Ingestor, DEFAULT_TEXT_SOURCE,
};
