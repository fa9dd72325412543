//! In-process fake gateways with call counters

#![allow(dead_code)]

use async_trait::async_trait;
use citerag_core::config::QueryConfig;
use citerag_core::error::{ProviderError, ProviderResult};
use citerag_core::llm::{
    ChatMessage, DeltaStream, EmbedMode, Embedder, Generator, GeneratorCapabilities, RerankHit,
    Reranker,
};
use citerag_core::query::QueryPipeline;
use citerag_core::vector::{Chunk, ChunkMetadata, SearchMatch, VectorIndex};
use futures::StreamExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn search_match(id: &str, text: &str, source: &str, score: f32) -> SearchMatch {
    SearchMatch {
        id: id.to_string(),
        similarity_score: score,
        metadata: ChunkMetadata {
            text: text.to_string(),
            source: source.to_string(),
            position: 0,
            token_estimate: text.len() / 4,
        },
    }
}

#[derive(Default)]
pub struct FakeEmbedder {
    pub calls: AtomicUsize,
    pub modes: Mutex<Vec<EmbedMode>>,
    pub inputs: Mutex<Vec<Vec<String>>>,
    pub failure: Option<ProviderError>,
    /// Return no vectors at all
    pub empty: bool,
}

impl FakeEmbedder {
    pub fn failing(err: ProviderError) -> Self {
        Self {
            failure: Some(err),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, texts: &[String], mode: EmbedMode) -> ProviderResult<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.modes.lock().unwrap().push(mode);
        self.inputs.lock().unwrap().push(texts.to_vec());
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        if self.empty {
            return Ok(Vec::new());
        }
        Ok(texts
            .iter()
            .map(|t| vec![t.len() as f32, 1.0, 0.5])
            .collect())
    }

    fn dimensions(&self) -> Option<usize> {
        Some(3)
    }

    fn model_name(&self) -> &str {
        "fake-embed"
    }
}

#[derive(Default)]
pub struct FakeIndex {
    pub matches: Vec<SearchMatch>,
    pub search_calls: AtomicUsize,
    pub top_ks: Mutex<Vec<usize>>,
    pub upserted: Mutex<Vec<Chunk>>,
    pub failure: Option<ProviderError>,
}

impl FakeIndex {
    pub fn with_matches(matches: Vec<SearchMatch>) -> Self {
        Self {
            matches,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorIndex for FakeIndex {
    async fn search(&self, _vector: &[f32], top_k: usize) -> ProviderResult<Vec<SearchMatch>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.top_ks.lock().unwrap().push(top_k);
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        Ok(self.matches.iter().take(top_k).cloned().collect())
    }

    async fn upsert(&self, chunks: &[Chunk]) -> ProviderResult<usize> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        self.upserted.lock().unwrap().extend_from_slice(chunks);
        Ok(chunks.len())
    }

    fn name(&self) -> &str {
        "fake-index"
    }
}

/// Returns `hits` verbatim, or every document in input order when unset
#[derive(Default)]
pub struct FakeReranker {
    pub hits: Option<Vec<RerankHit>>,
    pub calls: AtomicUsize,
    pub documents: Mutex<Vec<Vec<String>>>,
    pub failure: Option<ProviderError>,
}

impl FakeReranker {
    pub fn returning(hits: Vec<(usize, f64)>) -> Self {
        Self {
            hits: Some(
                hits.into_iter()
                    .map(|(index, relevance_score)| RerankHit {
                        index,
                        relevance_score,
                    })
                    .collect(),
            ),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Reranker for FakeReranker {
    async fn rerank(
        &self,
        _query: &str,
        documents: &[String],
        top_n: usize,
    ) -> ProviderResult<Vec<RerankHit>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.documents.lock().unwrap().push(documents.to_vec());
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        Ok(match &self.hits {
            Some(hits) => hits.clone(),
            None => (0..documents.len().min(top_n))
                .map(|index| RerankHit {
                    index,
                    relevance_score: 1.0 - index as f64 * 0.1,
                })
                .collect(),
        })
    }

    fn model_name(&self) -> &str {
        "fake-rerank"
    }
}

pub struct FakeGenerator {
    pub deltas: Vec<String>,
    pub capabilities: GeneratorCapabilities,
    pub blocking_calls: AtomicUsize,
    pub stream_calls: AtomicUsize,
    pub messages: Mutex<Vec<Vec<ChatMessage>>>,
    pub failure: Option<ProviderError>,
    /// Emit this many deltas, then fail
    pub fail_after: Option<usize>,
}

impl Default for FakeGenerator {
    fn default() -> Self {
        Self {
            deltas: vec!["Hel".to_string(), "lo".to_string()],
            capabilities: GeneratorCapabilities {
                blocking: true,
                streaming: true,
            },
            blocking_calls: AtomicUsize::new(0),
            stream_calls: AtomicUsize::new(0),
            messages: Mutex::new(Vec::new()),
            failure: None,
            fail_after: None,
        }
    }
}

impl FakeGenerator {
    pub fn with_deltas(deltas: &[&str]) -> Self {
        Self {
            deltas: deltas.iter().map(|d| d.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.blocking_calls.load(Ordering::SeqCst) + self.stream_calls.load(Ordering::SeqCst)
    }

    pub fn last_messages(&self) -> Vec<ChatMessage> {
        self.messages.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl Generator for FakeGenerator {
    async fn generate(&self, messages: &[ChatMessage]) -> ProviderResult<String> {
        self.blocking_calls.fetch_add(1, Ordering::SeqCst);
        self.messages.lock().unwrap().push(messages.to_vec());
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        Ok(self.deltas.concat())
    }

    async fn generate_stream(&self, messages: &[ChatMessage]) -> ProviderResult<DeltaStream> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        self.messages.lock().unwrap().push(messages.to_vec());
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }

        let mut items: Vec<Result<String, ProviderError>> =
            self.deltas.iter().cloned().map(Ok).collect();
        if let Some(n) = self.fail_after {
            items.truncate(n);
            items.push(Err(ProviderError::timeout("fake-generate", "stream stalled")));
        }
        Ok(futures::stream::iter(items).boxed())
    }

    fn capabilities(&self) -> GeneratorCapabilities {
        self.capabilities
    }

    fn model_name(&self) -> &str {
        "fake-generate"
    }
}

/// The four fakes wired into one pipeline
pub struct Harness {
    pub embedder: Arc<FakeEmbedder>,
    pub index: Arc<FakeIndex>,
    pub reranker: Arc<FakeReranker>,
    pub generator: Arc<FakeGenerator>,
}

impl Harness {
    pub fn new(index: FakeIndex, reranker: FakeReranker, generator: FakeGenerator) -> Self {
        Self {
            embedder: Arc::new(FakeEmbedder::default()),
            index: Arc::new(index),
            reranker: Arc::new(reranker),
            generator: Arc::new(generator),
        }
    }

    pub fn pipeline(&self) -> QueryPipeline {
        self.pipeline_with(QueryConfig::default())
    }

    pub fn pipeline_with(&self, options: QueryConfig) -> QueryPipeline {
        QueryPipeline::new(
            self.embedder.clone(),
            self.index.clone(),
            self.reranker.clone(),
            self.generator.clone(),
            options,
        )
    }
}
