//! Error types for the engine.

use thiserror::Error;

use crate::documents::DocumentError;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur in the engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Document not present in the document store.
    #[error("document not found: {0}")]
    NotFound(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Document store error.
    #[error("document store error: {0}")]
    Documents(#[from] DocumentError),

    /// Embedding error.
    #[error("embedding error: {0}")]
    Embedding(#[from] notemesh_embeddings::EmbeddingError),

    /// Index store error.
    #[error("index error: {0}")]
    Index(#[from] notemesh_index::IndexError),

    /// A scheduled embedding task ended in failure.
    #[error("embedding task failed: {0}")]
    TaskFailed(notemesh_scheduler::JobError),
}
