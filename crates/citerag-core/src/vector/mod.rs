//! Vector index gateway
//!
//! The index owns stored chunks; queries only read them back as
//! [`SearchMatch`]es ordered best-similarity-first.

mod http_index;
mod memory;

pub use http_index::HttpVectorIndex;
pub use memory::MemoryVectorIndex;

use crate::error::ProviderResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Metadata stored next to every vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    /// Chunk text; may come back empty from a foreign index
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub source: String,
    /// Ordinal of the chunk within its ingest
    #[serde(default, deserialize_with = "lenient_count")]
    pub position: usize,
    #[serde(default, deserialize_with = "lenient_count")]
    pub token_estimate: usize,
}

/// Metadata stores may hand integers back as floats (`3.0`); round those
/// and treat anything negative or non-numeric as zero
fn lenient_count<'de, D>(deserializer: D) -> std::result::Result<usize, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let rounded = |f: f64| {
        if f.is_finite() && f > 0.0 {
            f.round() as usize
        } else {
            0
        }
    };
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => match n.as_u64() {
            Some(v) => v as usize,
            None => n.as_f64().map_or(0, rounded),
        },
        serde_json::Value::String(s) => s.trim().parse::<f64>().map_or(0, rounded),
        _ => 0,
    })
}

/// One slice of a source document with its embedding
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// `<source>-<unix millis>-<position>`
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// A stored chunk returned by similarity search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchMatch {
    pub id: String,
    pub similarity_score: f32,
    pub metadata: ChunkMetadata,
}

impl SearchMatch {
    /// Whether the match carries text that can be cited
    pub fn has_text(&self) -> bool {
        !self.metadata.text.trim().is_empty()
    }
}

/// Vector store trait
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Top `top_k` nearest chunks, best first, metadata included
    async fn search(&self, vector: &[f32], top_k: usize) -> ProviderResult<Vec<SearchMatch>>;

    /// Store chunks, returning how many were written
    async fn upsert(&self, chunks: &[Chunk]) -> ProviderResult<usize>;

    fn name(&self) -> &str;
}

/// Cosine similarity between two vectors (0.0 for mismatched or zero vectors)
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
