//! In-process vector index with brute-force cosine similarity

use super::{cosine_similarity, Chunk, SearchMatch, VectorIndex};
use crate::error::{ProviderError, ProviderResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// Vector index held in memory; upserts replace chunks with the same id
#[derive(Default)]
pub struct MemoryVectorIndex {
    chunks: RwLock<HashMap<String, Chunk>>,
}

impl MemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index pre-populated with chunks
    pub fn with_chunks(chunks: impl IntoIterator<Item = Chunk>) -> Self {
        let map = chunks.into_iter().map(|c| (c.id.clone(), c)).collect();
        Self {
            chunks: RwLock::new(map),
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> ProviderError {
    ProviderError::new(
        "memory",
        crate::error::ProviderErrorKind::Transport,
        "index lock poisoned",
    )
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    async fn search(&self, vector: &[f32], top_k: usize) -> ProviderResult<Vec<SearchMatch>> {
        let chunks = self.chunks.read().map_err(|_| poisoned())?;

        let mut matches: Vec<SearchMatch> = chunks
            .values()
            .map(|chunk| SearchMatch {
                id: chunk.id.clone(),
                similarity_score: cosine_similarity(vector, &chunk.vector),
                metadata: chunk.metadata.clone(),
            })
            .collect();

        // Sort by similarity (descending), id as a stable tie-break
        matches.sort_by(|a, b| {
            b.similarity_score
                .partial_cmp(&a.similarity_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        matches.truncate(top_k);

        Ok(matches)
    }

    async fn upsert(&self, chunks: &[Chunk]) -> ProviderResult<usize> {
        let mut stored = self.chunks.write().map_err(|_| poisoned())?;
        for chunk in chunks {
            stored.insert(chunk.id.clone(), chunk.clone());
        }
        Ok(chunks.len())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
