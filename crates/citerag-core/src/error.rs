//! Error types for citerag

use std::fmt;
use thiserror::Error;

/// Result type alias using CiteRagError
pub type Result<T> = std::result::Result<T, CiteRagError>;

/// Error type alias for convenience
pub type Error = CiteRagError;

/// Result type returned by every provider gateway
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Exit codes for CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const INVALID_INPUT: i32 = 3;
    pub const PROVIDER_ERROR: i32 = 4;
}

/// What went wrong while talking to an external provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Connection refused, reset, DNS failure
    Transport,
    /// The per-call deadline elapsed
    Timeout,
    /// HTTP 401/403
    Auth,
    /// Any other non-success HTTP status
    Status(u16),
    /// Response body did not match the expected contract
    Malformed,
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport => write!(f, "transport"),
            Self::Timeout => write!(f, "timeout"),
            Self::Auth => write!(f, "auth"),
            Self::Status(code) => write!(f, "HTTP {}", code),
            Self::Malformed => write!(f, "malformed response"),
        }
    }
}

/// Failure reported by one of the embedding, vector, rerank or generation gateways
#[derive(Debug, Clone, Error)]
#[error("{provider} {kind}: {message}")]
pub struct ProviderError {
    pub provider: String,
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(
        provider: impl Into<String>,
        kind: ProviderErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorKind::Timeout, message)
    }

    pub fn malformed(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorKind::Malformed, message)
    }

    /// Classify a reqwest failure
    pub fn from_reqwest(provider: impl Into<String>, err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            ProviderErrorKind::Timeout
        } else if err.is_decode() || err.is_body() {
            ProviderErrorKind::Malformed
        } else if let Some(status) = err.status() {
            status_kind(status.as_u16())
        } else {
            ProviderErrorKind::Transport
        };
        Self::new(provider, kind, err.to_string())
    }
}

/// Map an HTTP status code onto an error kind
pub fn status_kind(code: u16) -> ProviderErrorKind {
    match code {
        401 | 403 => ProviderErrorKind::Auth,
        code => ProviderErrorKind::Status(code),
    }
}

/// Main error type for citerag
#[derive(Debug, Error)]
pub enum CiteRagError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Embedding failed: {0}")]
    Embedding(ProviderError),

    #[error("Vector search failed: {0}")]
    Search(ProviderError),

    #[error("Rerank failed: {0}")]
    Rerank(ProviderError),

    #[error("Generation failed: {0}")]
    Generation(ProviderError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Stream protocol error: {0}")]
    Protocol(String),

    #[error("PDF extraction error: {0}")]
    Pdf(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl CiteRagError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) | Self::Config(_) => exit_codes::INVALID_INPUT,
            Self::Embedding(_)
            | Self::Search(_)
            | Self::Rerank(_)
            | Self::Generation(_)
            | Self::Provider(_) => exit_codes::PROVIDER_ERROR,
            _ => exit_codes::GENERAL_ERROR,
        }
    }

    /// True when the caller sent something unusable; no provider was contacted
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// The underlying provider failure, if this error came from a gateway
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            Self::Embedding(e)
            | Self::Search(e)
            | Self::Rerank(e)
            | Self::Generation(e)
            | Self::Provider(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_kind_maps_auth() {
        assert_eq!(status_kind(401), ProviderErrorKind::Auth);
        assert_eq!(status_kind(403), ProviderErrorKind::Auth);
        assert_eq!(status_kind(503), ProviderErrorKind::Status(503));
    }

    #[test]
    fn test_exit_codes() {
        let err = CiteRagError::Validation("empty".into());
        assert_eq!(err.exit_code(), exit_codes::INVALID_INPUT);
        assert!(err.is_client_error());

        let err = CiteRagError::Rerank(ProviderError::timeout("cohere-rerank", "30s"));
        assert_eq!(err.exit_code(), exit_codes::PROVIDER_ERROR);
        assert!(!err.is_client_error());
        assert_eq!(
            err.provider_error().map(|e| e.kind),
            Some(ProviderErrorKind::Timeout)
        );
    }

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError::new("pinecone", ProviderErrorKind::Status(500), "boom");
        assert_eq!(err.to_string(), "pinecone HTTP 500: boom");
    }
}
