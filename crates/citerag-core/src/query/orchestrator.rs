//! Query orchestration: embed → search → rerank → generate

use super::prompt::{build_messages, NO_INFORMATION_ANSWER};
use super::{
    AnswerBody, Citation, ConversationTurn, Delivery, QueryAnswer, RerankedChunk, TurnRole,
};
use crate::config::{Config, QueryConfig};
use crate::error::{CiteRagError, ProviderError, Result};
use crate::llm::{
    ChatMessage, EmbedMode, Embedder, Generator, HttpEmbedder, HttpGenerator, HttpReranker,
    Reranker,
};
use crate::vector::{HttpVectorIndex, SearchMatch, VectorIndex};
use futures::{StreamExt, TryStreamExt};
use std::sync::Arc;
use std::time::Instant;

/// Passages that survived retrieval for one question
#[derive(Debug, Clone, Default)]
pub struct Retrieval {
    /// Search matches with citable text handed to the reranker
    pub candidates: usize,
    /// Reranker output mapped back onto the original matches, best first
    pub chunks: Vec<RerankedChunk>,
}

/// Stateless composition of the four gateways
///
/// Every call to [`QueryPipeline::answer_query`] is independent; the pipeline
/// holds only shared, read-only handles to its gateways.
#[derive(Clone)]
pub struct QueryPipeline {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    reranker: Arc<dyn Reranker>,
    generator: Arc<dyn Generator>,
    options: QueryConfig,
}

impl QueryPipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        reranker: Arc<dyn Reranker>,
        generator: Arc<dyn Generator>,
        options: QueryConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            reranker,
            generator,
            options,
        }
    }

    /// Build a pipeline backed by the HTTP gateways described in `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            Arc::new(HttpEmbedder::from_config(&config.embedding)?),
            Arc::new(HttpVectorIndex::from_config(&config.vector)?),
            Arc::new(HttpReranker::from_config(&config.rerank)?),
            Arc::new(HttpGenerator::from_config(&config.generation)?),
            config.query.clone(),
        ))
    }

    pub fn options(&self) -> &QueryConfig {
        &self.options
    }

    /// Whether the generator can produce incremental deltas
    pub fn supports_streaming(&self) -> bool {
        self.generator.capabilities().streaming
    }

    /// Answer the last turn of `turns`, grounded in retrieved passages
    pub async fn answer_query(
        &self,
        turns: &[ConversationTurn],
        delivery: Delivery,
    ) -> Result<QueryAnswer> {
        let question = active_question(turns)?;
        let start = Instant::now();

        let retrieval = self.retrieve(question).await?;
        if retrieval.candidates == 0 {
            tracing::info!("No citable matches for query, skipping rerank and generation");
            let body = match delivery {
                Delivery::Blocking => AnswerBody::Text(NO_INFORMATION_ANSWER.to_string()),
                Delivery::Streaming => AnswerBody::Stream(
                    futures::stream::once(async {
                        Ok::<_, ProviderError>(NO_INFORMATION_ANSWER.to_string())
                    })
                    .boxed(),
                ),
            };
            return Ok(QueryAnswer {
                citations: Vec::new(),
                body,
            });
        }

        let citations = citations_from(&retrieval.chunks);
        let messages = build_messages(turns, &citations, self.options.conversation_mode);
        let body = self.generate(&messages, delivery).await?;

        tracing::info!(
            "Query answered: {} candidates, {} citations, {:?} delivery, retrieval+setup {}ms",
            retrieval.candidates,
            citations.len(),
            delivery,
            start.elapsed().as_millis()
        );

        Ok(QueryAnswer { citations, body })
    }

    /// Embed, search and rerank; no generation
    pub async fn retrieve(&self, question: &str) -> Result<Retrieval> {
        let vector = self.embed_question(question).await?;

        let matches = self
            .index
            .search(&vector, self.options.search_top_k)
            .await
            .map_err(CiteRagError::Search)?;
        let total = matches.len();

        let valid: Vec<SearchMatch> = matches.into_iter().filter(|m| m.has_text()).collect();
        tracing::debug!(
            "Vector search returned {} matches, {} with text",
            total,
            valid.len()
        );
        if valid.is_empty() {
            return Ok(Retrieval::default());
        }

        let documents: Vec<String> = valid.iter().map(|m| m.metadata.text.clone()).collect();
        let hits = self
            .reranker
            .rerank(question, &documents, self.options.rerank_top_n)
            .await
            .map_err(CiteRagError::Rerank)?;

        let mut chunks = Vec::with_capacity(hits.len().min(self.options.rerank_top_n));
        for hit in hits.into_iter().take(self.options.rerank_top_n) {
            let search_match = valid.get(hit.index).ok_or_else(|| {
                CiteRagError::Rerank(ProviderError::malformed(
                    self.reranker.model_name(),
                    format!(
                        "rerank index {} out of range for {} documents",
                        hit.index,
                        valid.len()
                    ),
                ))
            })?;
            chunks.push(RerankedChunk {
                search_match: search_match.clone(),
                relevance_score: hit.relevance_score,
                rank: chunks.len() + 1,
            });
        }

        Ok(Retrieval {
            candidates: valid.len(),
            chunks,
        })
    }

    async fn embed_question(&self, question: &str) -> Result<Vec<f32>> {
        let vectors = self
            .embedder
            .embed(&[question.to_string()], EmbedMode::Query)
            .await
            .map_err(CiteRagError::Embedding)?;

        vectors
            .into_iter()
            .next()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                CiteRagError::Embedding(ProviderError::malformed(
                    self.embedder.model_name(),
                    "No embedding returned for query",
                ))
            })
    }

    async fn generate(&self, messages: &[ChatMessage], delivery: Delivery) -> Result<AnswerBody> {
        let caps = self.generator.capabilities();

        match delivery {
            Delivery::Streaming if caps.streaming => {
                let stream = self
                    .generator
                    .generate_stream(messages)
                    .await
                    .map_err(CiteRagError::Generation)?;
                Ok(AnswerBody::Stream(stream))
            }
            Delivery::Streaming => {
                let text = self
                    .generator
                    .generate(messages)
                    .await
                    .map_err(CiteRagError::Generation)?;
                Ok(AnswerBody::Stream(
                    futures::stream::once(async move { Ok::<_, ProviderError>(text) }).boxed(),
                ))
            }
            Delivery::Blocking if caps.blocking => {
                let text = self
                    .generator
                    .generate(messages)
                    .await
                    .map_err(CiteRagError::Generation)?;
                Ok(AnswerBody::Text(text))
            }
            Delivery::Blocking => {
                // Stream-only provider: nothing has reached the caller yet, so drain it here.
                let stream = self
                    .generator
                    .generate_stream(messages)
                    .await
                    .map_err(CiteRagError::Generation)?;
                let deltas: Vec<String> = stream
                    .try_collect()
                    .await
                    .map_err(CiteRagError::Generation)?;
                Ok(AnswerBody::Text(deltas.concat()))
            }
        }
    }
}

/// The question to answer: the content of the final turn
pub fn active_question(turns: &[ConversationTurn]) -> Result<&str> {
    let last = turns
        .last()
        .ok_or_else(|| CiteRagError::Validation("No messages provided".to_string()))?;

    if last.role != TurnRole::User {
        return Err(CiteRagError::Validation(
            "The last message must come from the user".to_string(),
        ));
    }
    if last.content.trim().is_empty() {
        return Err(CiteRagError::Validation("The question is empty".to_string()));
    }

    Ok(&last.content)
}

/// Number citations 1..N in reranked order
pub fn citations_from(chunks: &[RerankedChunk]) -> Vec<Citation> {
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| Citation {
            id: i + 1,
            text: chunk.search_match.metadata.text.clone(),
            source: chunk.search_match.metadata.source.clone(),
            score: chunk.relevance_score,
        })
        .collect()
}
