//! Gateway trait definitions

use super::ChatMessage;
use crate::error::{ProviderError, ProviderResult};
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

/// Which side of retrieval a text is embedded for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedMode {
    /// Indexing-time: chunks written to the vector index
    Document,
    /// Query-time: the active question
    Query,
}

/// Embedding generation trait
#[async_trait]
pub trait Embedder: Send + Sync {
    /// One vector per input, in input order
    async fn embed(&self, texts: &[String], mode: EmbedMode) -> ProviderResult<Vec<Vec<f32>>>;

    /// Embedding dimensions, when known up front
    fn dimensions(&self) -> Option<usize>;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// One reranker verdict
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RerankHit {
    /// Position in the `documents` argument of [`Reranker::rerank`]
    pub index: usize,
    pub relevance_score: f64,
}

/// Document reranking trait
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Best-first subset of at most `top_n` documents
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize,
    ) -> ProviderResult<Vec<RerankHit>>;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Incremental answer text, terminated when the stream ends
pub type DeltaStream = BoxStream<'static, Result<String, ProviderError>>;

/// Delivery modes a generator can serve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorCapabilities {
    pub blocking: bool,
    pub streaming: bool,
}

/// Chat completion trait
#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce the full answer in one shot
    async fn generate(&self, messages: &[ChatMessage]) -> ProviderResult<String>;

    /// Produce the answer as a sequence of text deltas
    async fn generate_stream(&self, messages: &[ChatMessage]) -> ProviderResult<DeltaStream>;

    fn capabilities(&self) -> GeneratorCapabilities;

    /// Get model name
    fn model_name(&self) -> &str;
}
