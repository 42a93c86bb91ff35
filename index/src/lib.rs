//! # Index
//!
//! This crate owns the persisted mapping from document id to index entry
//! (staleness marker plus embedding vector).
//!
//! ## Features
//!
//! - **IndexStore**: in-memory map with get/put/rename/remove and
//!   snapshot iteration, safe to save while a query is scanning
//! - **Whole-snapshot persistence**: every save writes the complete
//!   mapping inside the host settings blob, so a crash loses at most the
//!   in-flight batch
//! - **BlobStore**: the narrow persistence collaborator, with file-backed
//!   and in-memory implementations

pub mod error;
pub mod persist;
pub mod store;

pub use error::{IndexError, Result};
pub use persist::{BlobStore, FileBlobStore, MemoryBlobStore, SettingsBlob};
pub use store::{IndexEntry, IndexStore};
