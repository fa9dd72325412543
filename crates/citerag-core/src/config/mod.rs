//! Configuration management
//!
//! Everything provider-specific (API keys, index host, model names, embedding
//! dimension) lives here and is handed to gateway constructors at startup.
//! Environment variables are only consulted while building defaults.

use crate::error::{CiteRagError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Embedding provider
    #[serde(default)]
    pub embedding: EmbeddingServiceConfig,

    /// Vector index provider
    #[serde(default)]
    pub vector: VectorServiceConfig,

    /// Reranking provider
    #[serde(default)]
    pub rerank: RerankServiceConfig,

    /// Chat completion provider
    #[serde(default)]
    pub generation: GenerationServiceConfig,

    /// Query pipeline tuning
    #[serde(default)]
    pub query: QueryConfig,

    /// Document ingestion tuning
    #[serde(default)]
    pub ingest: IngestConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Ingestion history file (defaults to the data directory)
    #[serde(default)]
    pub history_path: Option<PathBuf>,
}

/// Embedding service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingServiceConfig {
    /// Base URL (Cohere-compatible `/v1/embed`)
    #[serde(default = "default_embedding_url")]
    pub url: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_cohere_key", skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Expected vector length; responses with another length are rejected
    #[serde(default = "default_embedding_dimensions")]
    pub dimensions: Option<usize>,

    /// Texts per request during ingestion
    #[serde(default = "default_embed_batch")]
    pub batch_size: usize,

    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingServiceConfig {
    fn default() -> Self {
        Self {
            url: default_embedding_url(),
            model: default_embedding_model(),
            api_key: default_cohere_key(),
            dimensions: default_embedding_dimensions(),
            batch_size: default_embed_batch(),
            timeout_secs: default_provider_timeout(),
        }
    }
}

/// Vector index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorServiceConfig {
    /// Index host URL (Pinecone-compatible `/query` and `/vectors/upsert`)
    #[serde(default = "default_vector_url")]
    pub url: String,

    /// Index name, used as the namespace on every call
    #[serde(default = "default_index_name")]
    pub index_name: String,

    #[serde(default = "default_pinecone_key", skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Vectors per upsert request
    #[serde(default = "default_upsert_batch")]
    pub upsert_batch: usize,

    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

impl Default for VectorServiceConfig {
    fn default() -> Self {
        Self {
            url: default_vector_url(),
            index_name: default_index_name(),
            api_key: default_pinecone_key(),
            upsert_batch: default_upsert_batch(),
            timeout_secs: default_provider_timeout(),
        }
    }
}

/// Reranking service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankServiceConfig {
    /// Base URL (Cohere-compatible `/v1/rerank`)
    #[serde(default = "default_rerank_url")]
    pub url: String,

    #[serde(default = "default_rerank_model")]
    pub model: String,

    #[serde(default = "default_cohere_key", skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

impl Default for RerankServiceConfig {
    fn default() -> Self {
        Self {
            url: default_rerank_url(),
            model: default_rerank_model(),
            api_key: default_cohere_key(),
            timeout_secs: default_provider_timeout(),
        }
    }
}

/// Chat completion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationServiceConfig {
    /// Base URL (OpenAI-compatible `/v1/chat/completions`)
    #[serde(default = "default_generation_url")]
    pub url: String,

    #[serde(default = "default_generation_model")]
    pub model: String,

    #[serde(default = "default_groq_key", skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Whether the provider supports token streaming
    #[serde(default = "default_true")]
    pub streaming: bool,

    /// Deadline for a blocking completion, or for the first streamed byte
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,

    /// Maximum silence between two streamed chunks
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl Default for GenerationServiceConfig {
    fn default() -> Self {
        Self {
            url: default_generation_url(),
            model: default_generation_model(),
            api_key: default_groq_key(),
            temperature: default_temperature(),
            streaming: true,
            timeout_secs: default_generation_timeout(),
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

/// How much of the conversation reaches the language model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConversationMode {
    /// Only the active question is sent
    Stateless,
    /// The full caller-supplied history is sent
    #[default]
    MultiTurn,
}

/// Query pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Candidates fetched from the vector index
    #[serde(default = "default_search_top_k")]
    pub search_top_k: usize,

    /// Passages kept after reranking (the citation count)
    #[serde(default = "default_rerank_top_n")]
    pub rerank_top_n: usize,

    #[serde(default)]
    pub conversation_mode: ConversationMode,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            search_top_k: default_search_top_k(),
            rerank_top_n: default_rerank_top_n(),
            conversation_mode: ConversationMode::default(),
        }
    }
}

/// Ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Chunk size in bytes
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in bytes
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Largest accepted upload in bytes
    #[serde(default = "default_max_upload")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_bytes: default_max_upload(),
        }
    }
}

fn default_embedding_url() -> String {
    std::env::var("CITERAG_EMBEDDING_URL").unwrap_or_else(|_| "https://api.cohere.com".to_string())
}

fn default_embedding_model() -> String {
    std::env::var("CITERAG_EMBEDDING_MODEL").unwrap_or_else(|_| "embed-english-v3.0".to_string())
}

fn default_embedding_dimensions() -> Option<usize> {
    Some(
        std::env::var("CITERAG_EMBEDDING_DIMS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1024),
    )
}

fn default_cohere_key() -> Option<String> {
    std::env::var("COHERE_API_KEY").ok()
}

fn default_pinecone_key() -> Option<String> {
    std::env::var("PINECONE_API_KEY").ok()
}

fn default_groq_key() -> Option<String> {
    std::env::var("GROQ_API_KEY").ok()
}

fn default_vector_url() -> String {
    std::env::var("CITERAG_VECTOR_URL").unwrap_or_else(|_| "http://localhost:5080".to_string())
}

fn default_index_name() -> String {
    std::env::var("PINECONE_INDEX").unwrap_or_else(|_| "mini-rag-index".to_string())
}

fn default_rerank_url() -> String {
    std::env::var("CITERAG_RERANK_URL").unwrap_or_else(|_| "https://api.cohere.com".to_string())
}

fn default_rerank_model() -> String {
    "rerank-english-v3.0".to_string()
}

fn default_generation_url() -> String {
    std::env::var("CITERAG_GENERATION_URL")
        .unwrap_or_else(|_| "https://api.groq.com/openai".to_string())
}

fn default_generation_model() -> String {
    std::env::var("CITERAG_GENERATION_MODEL")
        .unwrap_or_else(|_| "llama-3.3-70b-versatile".to_string())
}

fn default_temperature() -> f32 {
    0.1
}

fn default_true() -> bool {
    true
}

fn default_embed_batch() -> usize {
    10
}

fn default_upsert_batch() -> usize {
    50
}

fn default_provider_timeout() -> u64 {
    60
}

fn default_generation_timeout() -> u64 {
    120
}

fn default_idle_timeout() -> u64 {
    30
}

fn default_search_top_k() -> usize {
    15
}

fn default_rerank_top_n() -> usize {
    5
}

fn default_chunk_size() -> usize {
    4000
}

fn default_chunk_overlap() -> usize {
    400
}

fn default_bind() -> String {
    std::env::var("CITERAG_BIND").unwrap_or_else(|_| {
        let port = std::env::var("PORT").unwrap_or_else(|_| "3001".to_string());
        format!("127.0.0.1:{}", port)
    })
}

fn default_max_upload() -> usize {
    25 * 1024 * 1024
}

impl Config {
    /// Load config from default path
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load config from an explicit path; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_yaml::from_str(&content)?
        } else {
            Config::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Save config to the given path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CONFIG_DIR_NAME)
            .join("config.yml")
    }

    /// Resolved location of the ingestion history file
    pub fn history_path(&self) -> PathBuf {
        self.history_path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(crate::DATA_DIR_NAME)
                .join("history.json")
        })
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.query.rerank_top_n == 0 {
            return Err(CiteRagError::Config(
                "query.rerank_top_n must be at least 1".to_string(),
            ));
        }
        if self.query.search_top_k < self.query.rerank_top_n {
            return Err(CiteRagError::Config(format!(
                "query.search_top_k ({}) must not be smaller than query.rerank_top_n ({})",
                self.query.search_top_k, self.query.rerank_top_n
            )));
        }
        if self.ingest.chunk_size == 0 || self.ingest.chunk_overlap >= self.ingest.chunk_size {
            return Err(CiteRagError::Config(format!(
                "ingest.chunk_overlap ({}) must be smaller than ingest.chunk_size ({})",
                self.ingest.chunk_overlap, self.ingest.chunk_size
            )));
        }
        if self.embedding.batch_size == 0 || self.vector.upsert_batch == 0 {
            return Err(CiteRagError::Config(
                "batch sizes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert_eq!(config.query.search_top_k, 15);
        assert_eq!(config.query.rerank_top_n, 5);
        assert_eq!(config.ingest.chunk_size, 4000);
        assert_eq!(config.ingest.chunk_overlap, 400);
        assert_eq!(config.query.conversation_mode, ConversationMode::MultiTurn);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = r#"
query:
  rerank_top_n: 3
  conversation_mode: stateless
generation:
  model: test-model
  streaming: false
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.query.rerank_top_n, 3);
        assert_eq!(config.query.search_top_k, 15);
        assert_eq!(config.query.conversation_mode, ConversationMode::Stateless);
        assert_eq!(config.generation.model, "test-model");
        assert!(!config.generation.streaming);
        assert_eq!(config.ingest.chunk_size, 4000);
    }

    #[test]
    fn test_validate_rejects_bad_widths() {
        let mut config = Config::default();
        config.query.search_top_k = 2;
        assert!(matches!(config.validate(), Err(CiteRagError::Config(_))));

        let mut config = Config::default();
        config.ingest.chunk_overlap = config.ingest.chunk_size;
        assert!(matches!(config.validate(), Err(CiteRagError::Config(_))));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.yml");

        let mut config = Config::default();
        config.vector.index_name = "docs".to_string();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.vector.index_name, "docs");
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let loaded = Config::load_from(&dir.path().join("absent.yml")).unwrap();
        assert_eq!(loaded.query.search_top_k, 15);
    }
}
