//! CiteRAG Core Library
//!
//! Retrieval-augmented question answering with citations.
//!
//! # Features
//! - Query pipeline: embed → vector search → rerank → grounded generation
//! - Citations numbered in reranked order and sent ahead of the answer
//! - Streaming wire format with an incremental client-side decoder
//! - Pluggable gateways (Cohere, Pinecone, OpenAI-compatible chat) behind traits
//! - Document ingestion with sliding-window chunking and PDF extraction

pub mod config;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod protocol;
pub mod query;
pub mod vector;

pub use config::{Config, ConversationMode};
pub use error::{CiteRagError, Error, ProviderError, ProviderErrorKind, Result};
pub use ingest::{
    chunk_text, EntryType, HistoryEntry, HistoryLog, IngestReport, IngestRequest, Ingestor,
    JsonFileHistory,
};
pub use llm::{
    ChatMessage, ChatRole, DeltaStream, EmbedMode, Embedder, Generator, GeneratorCapabilities,
    HttpEmbedder, HttpGenerator, HttpReranker, RerankHit, Reranker,
};
pub use protocol::{encode_header, encode_stream, StreamDecoder, METADATA_SEPARATOR};
pub use query::{
    AnswerBody, Citation, ConversationTurn, Delivery, QueryAnswer, QueryPipeline, TurnRole,
};
pub use vector::{Chunk, ChunkMetadata, HttpVectorIndex, MemoryVectorIndex, SearchMatch, VectorIndex};

/// Default config directory name
pub const CONFIG_DIR_NAME: &str = "citerag";

/// Default data directory name
pub const DATA_DIR_NAME: &str = "citerag";
