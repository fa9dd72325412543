//! Pinecone-compatible vector index over HTTP

use super::{Chunk, ChunkMetadata, SearchMatch, VectorIndex};
use crate::config::VectorServiceConfig;
use crate::error::ProviderResult;
use crate::llm::ProviderClient;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Vector index reached through `/query` and `/vectors/upsert`
pub struct HttpVectorIndex {
    client: ProviderClient,
    namespace: String,
    upsert_batch: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
    namespace: &'a str,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<ChunkMetadata>,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<UpsertVector<'a>>,
    namespace: &'a str,
}

#[derive(Serialize)]
struct UpsertVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: &'a ChunkMetadata,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: Option<usize>,
}

impl HttpVectorIndex {
    /// Create from configuration
    pub fn from_config(config: &VectorServiceConfig) -> ProviderResult<Self> {
        let client = ProviderClient::new(
            "vector",
            config.url.clone(),
            None,
            Duration::from_secs(config.timeout_secs),
        )?;
        Ok(Self {
            client: client.with_header("Api-Key", config.api_key.clone()),
            namespace: config.index_name.clone(),
            upsert_batch: config.upsert_batch.max(1),
        })
    }

    pub fn client(&self) -> &ProviderClient {
        &self.client
    }
}

#[async_trait]
impl VectorIndex for HttpVectorIndex {
    async fn search(&self, vector: &[f32], top_k: usize) -> ProviderResult<Vec<SearchMatch>> {
        let request = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
            include_values: false,
            namespace: &self.namespace,
        };
        let response: QueryResponse = self.client.post_json("/query", &request).await?;

        let mut matches: Vec<SearchMatch> = response
            .matches
            .into_iter()
            .map(|m| SearchMatch {
                id: m.id,
                similarity_score: m.score,
                metadata: m.metadata.unwrap_or_default(),
            })
            .collect();
        matches.sort_by(|a, b| {
            b.similarity_score
                .partial_cmp(&a.similarity_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(top_k);

        Ok(matches)
    }

    async fn upsert(&self, chunks: &[Chunk]) -> ProviderResult<usize> {
        let mut written = 0;
        for batch in chunks.chunks(self.upsert_batch) {
            let request = UpsertRequest {
                vectors: batch
                    .iter()
                    .map(|c| UpsertVector {
                        id: &c.id,
                        values: &c.vector,
                        metadata: &c.metadata,
                    })
                    .collect(),
                namespace: &self.namespace,
            };
            let response: UpsertResponse =
                self.client.post_json("/vectors/upsert", &request).await?;
            written += response.upserted_count.unwrap_or(batch.len());
        }
        tracing::debug!("Upserted {} vectors into {}", written, self.namespace);
        Ok(written)
    }

    fn name(&self) -> &str {
        &self.namespace
    }
}
