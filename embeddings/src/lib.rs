//! # Embeddings
//!
//! This crate provides the embedding capability boundary for the notemesh
//! index, plus the vector math used to compare embeddings.
//!
//! ## Features
//!
//! - **EmbeddingClient**: narrow capability interface for turning a batch
//!   of texts into dense vectors
//! - **OpenAI client**: HTTP-backed implementation with explicit
//!   transient-failure classification (rate limit, quota)
//! - **Similarity**: cosine similarity and top-k ranking helpers

pub mod error;
pub mod provider;
pub mod similarity;

pub use error::{EmbeddingError, Result};
pub use provider::{EmbeddingClient, OpenAiEmbeddingClient};
pub use similarity::{cosine_similarity, top_k};

/// A dense vector embedding.
pub type Embedding = Vec<f32>;
