//! HTTP-based embedder using a Cohere-compatible `/v1/embed` endpoint

use super::cache::{embedding_cache_key, EmbeddingCache};
use super::{EmbedMode, Embedder, ProviderClient};
use crate::config::EmbeddingServiceConfig;
use crate::error::{ProviderError, ProviderResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Embedder that uses an external HTTP service
pub struct HttpEmbedder {
    client: ProviderClient,
    model: String,
    dimensions: Option<usize>,
    cache: EmbeddingCache,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    texts: &'a [String],
    model: &'a str,
    input_type: &'static str,
    embedding_types: [&'static str; 1],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: EmbeddingsPayload,
}

/// Cohere answers either a bare list or `{"float": [...]}` depending on `embedding_types`
#[derive(Deserialize)]
#[serde(untagged)]
enum EmbeddingsPayload {
    Plain(Vec<Vec<f32>>),
    Typed { float: Vec<Vec<f32>> },
}

impl EmbeddingsPayload {
    fn into_vectors(self) -> Vec<Vec<f32>> {
        match self {
            Self::Plain(v) => v,
            Self::Typed { float } => float,
        }
    }
}

fn input_type(mode: EmbedMode) -> &'static str {
    match mode {
        EmbedMode::Document => "search_document",
        EmbedMode::Query => "search_query",
    }
}

impl HttpEmbedder {
    /// Create from configuration
    pub fn from_config(config: &EmbeddingServiceConfig) -> ProviderResult<Self> {
        let client = ProviderClient::new(
            "embedding",
            config.url.clone(),
            config.api_key.clone(),
            Duration::from_secs(config.timeout_secs),
        )?;
        Ok(Self {
            client,
            model: config.model.clone(),
            dimensions: config.dimensions,
            cache: EmbeddingCache::new(),
        })
    }

    /// Access the underlying client for metrics
    pub fn client(&self) -> &ProviderClient {
        &self.client
    }

    async fn fetch(&self, texts: &[String], mode: EmbedMode) -> ProviderResult<Vec<Vec<f32>>> {
        let request = EmbedRequest {
            texts,
            model: &self.model,
            input_type: input_type(mode),
            embedding_types: ["float"],
        };
        let response: EmbedResponse = self.client.post_json("/v1/embed", &request).await?;
        let vectors = response.embeddings.into_vectors();

        if vectors.len() != texts.len() {
            return Err(ProviderError::malformed(
                self.client.name(),
                format!(
                    "expected {} embeddings, provider returned {}",
                    texts.len(),
                    vectors.len()
                ),
            ));
        }
        if let Some(expected) = self.dimensions {
            if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
                return Err(ProviderError::malformed(
                    self.client.name(),
                    format!(
                        "embedding has {} dimensions, configured for {}",
                        bad.len(),
                        expected
                    ),
                ));
            }
        }

        Ok(vectors)
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, texts: &[String], mode: EmbedMode) -> ProviderResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        // Only single query vectors are cached; document batches are written once.
        if mode == EmbedMode::Query && texts.len() == 1 {
            let key = embedding_cache_key(&self.model, &texts[0]);
            if let Some(vector) = self.cache.get(&key) {
                tracing::debug!("Cache hit for query embedding");
                return Ok(vec![vector]);
            }
            let vectors = self.fetch(texts, mode).await?;
            self.cache.set(key, vectors[0].clone());
            return Ok(vectors);
        }

        self.fetch(texts, mode).await
    }

    fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_accepts_both_shapes() {
        let plain: EmbedResponse = serde_json::from_str(r#"{"embeddings": [[0.5, 0.25]]}"#).unwrap();
        assert_eq!(plain.embeddings.into_vectors(), vec![vec![0.5, 0.25]]);

        let typed: EmbedResponse =
            serde_json::from_str(r#"{"embeddings": {"float": [[1.0], [2.0]]}}"#).unwrap();
        assert_eq!(typed.embeddings.into_vectors(), vec![vec![1.0], vec![2.0]]);
    }

    #[test]
    fn test_input_type_per_mode() {
        assert_eq!(input_type(EmbedMode::Document), "search_document");
        assert_eq!(input_type(EmbedMode::Query), "search_query");
    }
}
