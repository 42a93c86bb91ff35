//! Error types for the index store.

use thiserror::Error;

/// Result type alias for index operations.
pub type Result<T> = std::result::Result<T, IndexError>;

/// Errors that can occur in the index store.
#[derive(Error, Debug)]
pub enum IndexError {
    /// The persistence collaborator failed. The in-memory index remains
    /// usable for the current session.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
