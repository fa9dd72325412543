//! HTTP-based reranker using a Cohere-compatible `/v1/rerank` endpoint

use super::{ProviderClient, RerankHit, Reranker};
use crate::config::RerankServiceConfig;
use crate::error::{ProviderError, ProviderResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reranker using an external HTTP service
pub struct HttpReranker {
    client: ProviderClient,
    model: String,
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: &'a [String],
    top_n: usize,
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankResultItem>,
}

#[derive(Deserialize)]
struct RerankResultItem {
    index: usize,
    relevance_score: f64,
}

impl HttpReranker {
    /// Create from configuration
    pub fn from_config(config: &RerankServiceConfig) -> ProviderResult<Self> {
        let client = ProviderClient::new(
            "rerank",
            config.url.clone(),
            config.api_key.clone(),
            Duration::from_secs(config.timeout_secs),
        )?;
        Ok(Self {
            client,
            model: config.model.clone(),
        })
    }

    pub fn client(&self) -> &ProviderClient {
        &self.client
    }
}

#[async_trait]
impl Reranker for HttpReranker {
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize,
    ) -> ProviderResult<Vec<RerankHit>> {
        // If no documents, return empty
        if documents.is_empty() || top_n == 0 {
            return Ok(vec![]);
        }

        let request = RerankRequest {
            model: &self.model,
            query,
            documents,
            top_n: top_n.min(documents.len()),
        };
        let response: RerankResponse = self.client.post_json("/v1/rerank", &request).await?;

        parse_rerank_results(self.client.name(), response.results, documents.len())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn parse_rerank_results(
    provider: &str,
    results: Vec<RerankResultItem>,
    document_count: usize,
) -> ProviderResult<Vec<RerankHit>> {
    results
        .into_iter()
        .map(|item| {
            if item.index >= document_count {
                return Err(ProviderError::malformed(
                    provider,
                    format!(
                        "rerank index {} out of range for {} documents",
                        item.index, document_count
                    ),
                ));
            }
            Ok(RerankHit {
                index: item.index,
                relevance_score: item.relevance_score,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorKind;

    #[test]
    fn test_parse_keeps_provider_order() {
        let response: RerankResponse = serde_json::from_str(
            r#"{"id": "x", "results": [
                {"index": 2, "relevance_score": 0.9},
                {"index": 0, "relevance_score": 0.7}
            ]}"#,
        )
        .unwrap();

        let hits = parse_rerank_results("rerank", response.results, 3).unwrap();
        assert_eq!(
            hits,
            vec![
                RerankHit { index: 2, relevance_score: 0.9 },
                RerankHit { index: 0, relevance_score: 0.7 },
            ]
        );
    }

    #[test]
    fn test_parse_rejects_out_of_range_index() {
        let results = vec![RerankResultItem {
            index: 5,
            relevance_score: 0.5,
        }];
        let err = parse_rerank_results("rerank", results, 2).unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Malformed);
    }
}
