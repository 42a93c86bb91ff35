//! Similarity ranking over the index.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use notemesh_embeddings::{Embedding, similarity};
use notemesh_index::IndexStore;

use crate::error::Result;

/// A ranked related document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedNote {
    /// Document id.
    pub id: String,

    /// Cosine similarity to the query document.
    pub score: f32,
}

/// Exact top-k ranking by linear scan.
///
/// O(N·d) per query; fine at the thousands-of-documents scale this engine
/// targets, and exact by construction.
pub struct SimilarityRanker {
    store: Arc<IndexStore>,
}

impl SimilarityRanker {
    /// Create a ranker over the given store.
    pub fn new(store: Arc<IndexStore>) -> Self {
        Self { store }
    }

    /// Return the `top_k` documents most similar to `id`, best first.
    ///
    /// Returns an empty list when `id` is not indexed; callers are
    /// expected to have indexed the document first. Ties keep the scan
    /// order of the index snapshot.
    pub async fn related(&self, id: &str, top_k: usize) -> Result<Vec<RelatedNote>> {
        let Some(target) = self.store.get(id).await else {
            debug!("related query for unindexed document {id}");
            return Ok(Vec::new());
        };

        let candidates: Vec<(String, Embedding)> = self
            .store
            .all_entries()
            .await
            .into_iter()
            .filter(|(other, _)| other != id)
            .map(|(other, entry)| (other, entry.embedding))
            .collect();

        let ranked = similarity::top_k(&target.embedding, &candidates, top_k)?;

        Ok(ranked
            .into_iter()
            .map(|(id, score)| RelatedNote { id, score })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notemesh_index::{IndexEntry, MemoryBlobStore};
    use pretty_assertions::assert_eq;

    async fn store_with(entries: &[(&str, Vec<f32>)]) -> Arc<IndexStore> {
        let store = Arc::new(IndexStore::new(Arc::new(MemoryBlobStore::new())));
        for (id, embedding) in entries {
            store.put(*id, IndexEntry::new(0, embedding.clone())).await;
        }
        store
    }

    #[tokio::test]
    async fn test_related_excludes_self_and_sorts() {
        let store = store_with(&[
            ("a.md", vec![1.0, 0.0]),
            ("b.md", vec![0.9, 0.1]),
            ("c.md", vec![0.0, 1.0]),
        ])
        .await;

        let ranker = SimilarityRanker::new(store);
        let related = ranker.related("a.md", 5).await.unwrap();

        assert_eq!(related.len(), 2);
        assert_eq!(related[0].id, "b.md");
        assert_eq!(related[1].id, "c.md");
        assert!(related[0].score > related[1].score);
    }

    #[tokio::test]
    async fn test_related_truncates_to_top_k() {
        let store = store_with(&[
            ("a.md", vec![1.0, 0.0]),
            ("b.md", vec![0.9, 0.1]),
            ("c.md", vec![0.5, 0.5]),
            ("d.md", vec![0.0, 1.0]),
        ])
        .await;

        let ranker = SimilarityRanker::new(store);
        let related = ranker.related("a.md", 2).await.unwrap();

        assert_eq!(related.len(), 2);
        assert_eq!(related[0].id, "b.md");
    }

    #[tokio::test]
    async fn test_related_unindexed_is_empty() {
        let store = store_with(&[("a.md", vec![1.0, 0.0])]).await;

        let ranker = SimilarityRanker::new(store);
        let related = ranker.related("missing.md", 5).await.unwrap();
        assert!(related.is_empty());
    }
}
