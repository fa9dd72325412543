//! Ingestion: extract → chunk → embed → upsert → record

use super::chunker::chunk_text;
use super::history::{EntryType, HistoryEntry, HistoryLog, JsonFileHistory};
use crate::config::Config;
use crate::error::{CiteRagError, ProviderError, Result};
use crate::llm::{EmbedMode, Embedder, HttpEmbedder};
use crate::vector::{Chunk, ChunkMetadata, HttpVectorIndex, VectorIndex};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;

/// Source name used for pasted text without a name
pub const DEFAULT_TEXT_SOURCE: &str = "Pasted Text";

/// What to ingest
#[derive(Debug, Clone)]
pub enum IngestContent {
    Text(String),
    File {
        filename: String,
        bytes: Vec<u8>,
        content_type: Option<String>,
    },
}

/// One ingestion request
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub content: IngestContent,
    /// Overrides the file name (or the default for pasted text)
    pub source_name: Option<String>,
}

impl IngestRequest {
    pub fn text(text: impl Into<String>, source_name: Option<String>) -> Self {
        Self {
            content: IngestContent::Text(text.into()),
            source_name,
        }
    }

    pub fn file(filename: impl Into<String>, bytes: Vec<u8>, content_type: Option<String>) -> Self {
        Self {
            content: IngestContent::File {
                filename: filename.into(),
                bytes,
                content_type,
            },
            source_name: None,
        }
    }

    pub fn with_source_name(mut self, source_name: Option<String>) -> Self {
        self.source_name = source_name;
        self
    }
}

/// Outcome of a successful ingestion
#[derive(Debug, Clone, PartialEq)]
pub struct IngestReport {
    /// Chunks written to the index
    pub count: usize,
    pub message: String,
    pub entry: HistoryEntry,
}

/// Chunking and batching knobs
#[derive(Debug, Clone, Copy)]
pub struct IngestOptions {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Texts per embedding request
    pub embed_batch: usize,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            chunk_size: 4000,
            chunk_overlap: 400,
            embed_batch: 10,
        }
    }
}

/// Writes documents into the vector index and the history log
pub struct Ingestor {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    history: Arc<dyn HistoryLog>,
    options: IngestOptions,
}

impl Ingestor {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        history: Arc<dyn HistoryLog>,
        options: IngestOptions,
    ) -> Self {
        Self {
            embedder,
            index,
            history,
            options,
        }
    }

    /// Build an ingestor backed by the HTTP gateways and the on-disk history
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            Arc::new(HttpEmbedder::from_config(&config.embedding)?),
            Arc::new(HttpVectorIndex::from_config(&config.vector)?),
            Arc::new(JsonFileHistory::new(config.history_path())),
            IngestOptions {
                chunk_size: config.ingest.chunk_size,
                chunk_overlap: config.ingest.chunk_overlap,
                embed_batch: config.embedding.batch_size,
            },
        ))
    }

    pub fn history(&self) -> &Arc<dyn HistoryLog> {
        &self.history
    }

    pub async fn ingest(&self, request: IngestRequest) -> Result<IngestReport> {
        let start = Instant::now();
        let (source, entry_type, text) = extract(request)?;

        if text.trim().is_empty() {
            return Err(CiteRagError::Validation("No text content found".to_string()));
        }

        let windows = chunk_text(&text, self.options.chunk_size, self.options.chunk_overlap);
        tracing::debug!("Split {} into {} chunks", source, windows.len());

        let stamp = Utc::now().timestamp_millis();
        let mut chunks = Vec::with_capacity(windows.len());

        for batch in windows.chunks(self.options.embed_batch.max(1)) {
            let inputs: Vec<String> = batch.iter().map(|w| w.text.replace('\n', " ")).collect();
            let vectors = self.embedder.embed(&inputs, EmbedMode::Document).await?;

            if vectors.len() != batch.len() {
                return Err(ProviderError::malformed(
                    self.embedder.model_name(),
                    format!(
                        "expected {} embeddings, got {}",
                        batch.len(),
                        vectors.len()
                    ),
                )
                .into());
            }

            for (window, vector) in batch.iter().zip(vectors) {
                let position = chunks.len();
                chunks.push(Chunk {
                    id: format!("{}-{}-{}", source, stamp, position),
                    vector,
                    metadata: ChunkMetadata {
                        text: window.text.clone(),
                        source: source.clone(),
                        position,
                        token_estimate: window.token_estimate(),
                    },
                });
            }
        }

        self.index.upsert(&chunks).await?;

        let count = chunks.len();
        let entry = HistoryEntry::new(source.clone(), entry_type, count);
        self.history.append(entry.clone()).await?;

        tracing::info!(
            "Ingested {} ({:?}): {} chunks in {}ms",
            source,
            entry_type,
            count,
            start.elapsed().as_millis()
        );

        Ok(IngestReport {
            count,
            message: format!("Successfully processed {} chunks", count),
            entry,
        })
    }
}

/// Source name, entry type and plain text for the given request
fn extract(request: IngestRequest) -> Result<(String, EntryType, String)> {
    let override_name = request
        .source_name
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    match request.content {
        IngestContent::Text(text) => {
            let source = override_name.unwrap_or_else(|| DEFAULT_TEXT_SOURCE.to_string());
            Ok((source, EntryType::Text, text))
        }
        IngestContent::File {
            filename,
            bytes,
            content_type,
        } => {
            let (entry_type, text) = if is_pdf(&filename, content_type.as_deref(), &bytes) {
                let text = pdf_extract::extract_text_from_mem(&bytes).map_err(|e| {
                    CiteRagError::Pdf(format!("Failed to extract text from {}: {}", filename, e))
                })?;
                (EntryType::Pdf, text)
            } else {
                (EntryType::File, String::from_utf8_lossy(&bytes).into_owned())
            };
            Ok((override_name.unwrap_or(filename), entry_type, text))
        }
    }
}

fn is_pdf(filename: &str, content_type: Option<&str>, bytes: &[u8]) -> bool {
    content_type == Some("application/pdf")
        || filename.to_ascii_lowercase().ends_with(".pdf")
        || bytes.starts_with(b"%PDF-")
}
