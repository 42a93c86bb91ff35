//! The document store boundary.
//!
//! The engine never owns documents; it consumes a narrow interface over
//! whatever store the host provides, plus explicit change notifications
//! decoupled from any specific host event system.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Metadata the document store exposes for each document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMeta {
    /// Stable, path-like document id.
    pub id: String,

    /// Modification timestamp in epoch milliseconds.
    pub modified_at: i64,
}

impl DocumentMeta {
    /// Create document metadata.
    pub fn new(id: impl Into<String>, modified_at: i64) -> Self {
        Self {
            id: id.into(),
            modified_at,
        }
    }
}

/// Errors reported by a document store.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The id no longer resolves to a document.
    #[error("document not found: {0}")]
    NotFound(String),

    /// Any other store failure.
    #[error("document store error: {0}")]
    Store(String),
}

/// Interface over the host's document collection.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// List every document with its current modification timestamp.
    async fn list_documents(&self) -> std::result::Result<Vec<DocumentMeta>, DocumentError>;

    /// Read a document's content.
    async fn read_content(&self, id: &str) -> std::result::Result<String, DocumentError>;

    /// Write content back to a document.
    async fn write_content(&self, id: &str, text: &str)
    -> std::result::Result<(), DocumentError>;
}

/// A change notification from the document store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentEvent {
    /// What changed.
    pub kind: DocumentEventKind,

    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
}

impl DocumentEvent {
    /// Create a new event stamped with the current time.
    pub fn new(kind: DocumentEventKind) -> Self {
        Self {
            kind,
            timestamp: Utc::now(),
        }
    }
}

/// Kind of document change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DocumentEventKind {
    /// A document was opened in the editor.
    Opened { id: String },

    /// A document's content changed.
    Modified { meta: DocumentMeta },

    /// A document moved to a new id. Content is unchanged.
    Renamed { old_id: String, new_id: String },

    /// A document was deleted.
    Deleted { id: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_event_kind_serialization() {
        let kind = DocumentEventKind::Renamed {
            old_id: "a.md".to_string(),
            new_id: "b.md".to_string(),
        };

        let json = serde_json::to_value(&kind).unwrap();
        assert_eq!(json["type"], "renamed");
        assert_eq!(json["old_id"], "a.md");

        let parsed: DocumentEventKind = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, kind);
    }

    #[test]
    fn test_event_carries_timestamp() {
        let event = DocumentEvent::new(DocumentEventKind::Deleted {
            id: "a.md".to_string(),
        });
        assert!(event.timestamp <= Utc::now());
    }
}
