//! Error types for the embeddings system.

use thiserror::Error;

/// Result type alias for embedding operations.
pub type Result<T> = std::result::Result<T, EmbeddingError>;

/// Errors that can occur in the embeddings system.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// Provider not configured.
    #[error("embedding provider not configured")]
    ProviderNotConfigured,

    /// API request failed.
    #[error("API request failed: {0}")]
    ApiRequest(String),

    /// Rate limit exceeded.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Provider quota exhausted.
    #[error("provider quota exhausted")]
    QuotaExhausted,

    /// The provider rejected the request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Provider returned a shape the caller cannot safely map.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Dimension mismatch.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl EmbeddingError {
    /// Whether the failure is transient and worth retrying with backoff.
    ///
    /// Only rate-limit and quota exhaustion qualify; everything else is
    /// terminal for the request that caused it.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::QuotaExhausted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(EmbeddingError::RateLimited { retry_after_secs: 1 }.is_transient());
        assert!(EmbeddingError::QuotaExhausted.is_transient());
        assert!(!EmbeddingError::InvalidRequest("bad input".to_string()).is_transient());
        assert!(
            !EmbeddingError::MalformedResponse("2 vectors for 3 texts".to_string()).is_transient()
        );
        assert!(
            !EmbeddingError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
            .is_transient()
        );
    }
}
