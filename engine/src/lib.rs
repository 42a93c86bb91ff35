//! # Engine
//!
//! This crate ties the notemesh pieces into the related-notes engine:
//!
//! - **IndexBuilder**: diffs the document collection against the index
//!   and schedules embedding work for stale or missing documents
//! - **SimilarityRanker**: exact top-k cosine ranking over the index
//! - **NoteEngine**: the command surface the host UI drives
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         NoteEngine                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  DocumentStore ──► IndexBuilder ──► Scheduler ──► EmbeddingClient│
//! │                         │                              │        │
//! │                         ▼                              ▼        │
//! │                     IndexStore ◄────────────── embed batches    │
//! │                         │                                       │
//! │                         ▼                                       │
//! │                  SimilarityRanker ──► related notes             │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod builder;
pub mod config;
pub mod documents;
pub mod engine;
pub mod error;
pub mod ranker;

pub use builder::IndexBuilder;
pub use config::EngineConfig;
pub use documents::{DocumentError, DocumentEvent, DocumentEventKind, DocumentMeta, DocumentStore};
pub use engine::{EngineStats, NoteEngine, NoteEngineBuilder};
pub use error::{EngineError, Result};
pub use ranker::{RelatedNote, SimilarityRanker};

// Re-export from dependencies for convenience
pub use notemesh_embeddings::{EmbeddingClient, OpenAiEmbeddingClient};
pub use notemesh_index::{BlobStore, FileBlobStore, IndexEntry, IndexStore, MemoryBlobStore};
pub use notemesh_scheduler::{Scheduler, SchedulerConfig};
