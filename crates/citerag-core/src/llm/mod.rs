//! Provider gateways
//!
//! Provides traits and HTTP implementations for:
//! - Embedding generation (document and query modes)
//! - Reranking
//! - Chat completion, blocking or streamed

mod cache;
mod client;
mod http_embedder;
mod http_generator;
mod http_reranker;
mod sse;
mod traits;

pub use cache::{embedding_cache_key, EmbeddingCache};
pub use client::{APIMetrics, ChatMessage, ChatRole, MetricsSnapshot, ProviderClient};
pub use http_embedder::HttpEmbedder;
pub use http_generator::{delta_stream, HttpGenerator};
pub use http_reranker::HttpReranker;
pub use sse::{SseDecoder, DONE_SENTINEL};
pub use traits::*;
