//! The in-memory index and its snapshot persistence.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::Result;
use crate::persist::{BlobStore, SettingsBlob};

/// An entry in the embedding index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Modification timestamp (epoch milliseconds) of the document version
    /// the embedding was computed from. Diverging from the document's
    /// current timestamp marks the entry stale.
    pub staleness_marker: i64,

    /// The embedding vector.
    pub embedding: Vec<f32>,
}

impl IndexEntry {
    /// Create a new index entry.
    pub fn new(staleness_marker: i64, embedding: Vec<f32>) -> Self {
        Self {
            staleness_marker,
            embedding,
        }
    }

    /// Check whether this entry is stale for a document last modified at
    /// the given timestamp.
    pub fn is_stale_against(&self, modified_at: i64) -> bool {
        self.staleness_marker != modified_at
    }
}

/// The persisted mapping from document id to index entry.
///
/// All mutation goes through `&self` methods behind an internal lock, so
/// the store can be shared between the index builder, the scheduler's
/// embed tasks, and ranking queries. `save` snapshots the mapping before
/// handing it to the persistence collaborator, so it is safe to call
/// while a query is scanning.
pub struct IndexStore {
    entries: RwLock<HashMap<String, IndexEntry>>,

    /// Host settings loaded alongside the index; written back verbatim on
    /// every save.
    settings: RwLock<serde_json::Value>,

    blob_store: Arc<dyn BlobStore>,
}

impl IndexStore {
    /// Create an empty store backed by the given persistence collaborator.
    pub fn new(blob_store: Arc<dyn BlobStore>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            settings: RwLock::new(serde_json::Value::Null),
            blob_store,
        }
    }

    /// Replace the in-memory state with the persisted blob, if any.
    pub async fn load(&self) -> Result<()> {
        let Some(blob) = self.blob_store.load().await? else {
            debug!("no persisted blob, starting with an empty index");
            return Ok(());
        };

        let count = blob.index.len();
        *self.entries.write().await = blob.index;
        *self.settings.write().await = blob.settings;
        info!("loaded {count} index entries");
        Ok(())
    }

    /// Persist a snapshot of the complete mapping.
    pub async fn save(&self) -> Result<()> {
        let blob = SettingsBlob {
            settings: self.settings.read().await.clone(),
            index: self.entries.read().await.clone(),
        };
        self.blob_store.save(&blob).await
    }

    /// Get the entry for a document id.
    pub async fn get(&self, id: &str) -> Option<IndexEntry> {
        self.entries.read().await.get(id).cloned()
    }

    /// Insert or overwrite the entry for a document id.
    pub async fn put(&self, id: impl Into<String>, entry: IndexEntry) {
        let id = id.into();
        debug!("indexed {id}");
        self.entries.write().await.insert(id, entry);
    }

    /// Move an entry from one id to another, atomically.
    ///
    /// Returns `false` (and logs) when the old id has no entry; the index
    /// content is unchanged in that case.
    pub async fn rename(&self, old_id: &str, new_id: &str) -> bool {
        let mut entries = self.entries.write().await;
        match entries.remove(old_id) {
            Some(entry) => {
                entries.insert(new_id.to_string(), entry);
                debug!("renamed index entry {old_id} -> {new_id}");
                true
            }
            None => {
                debug!("rename of unindexed document {old_id} -> {new_id}, nothing to move");
                false
            }
        }
    }

    /// Remove the entry for a document id.
    pub async fn remove(&self, id: &str) -> Option<IndexEntry> {
        self.entries.write().await.remove(id)
    }

    /// Get a snapshot of all entries.
    pub async fn all_entries(&self) -> Vec<(String, IndexEntry)> {
        self.entries
            .read()
            .await
            .iter()
            .map(|(id, entry)| (id.clone(), entry.clone()))
            .collect()
    }

    /// Get the number of entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Check if the index is empty.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drop all entries.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
        info!("cleared embedding index");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::{FileBlobStore, MemoryBlobStore};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn memory_store() -> IndexStore {
        IndexStore::new(Arc::new(MemoryBlobStore::new()))
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let store = memory_store();
        store
            .put("notes/cats.md", IndexEntry::new(1000, vec![1.0, 0.0]))
            .await;

        let entry = store.get("notes/cats.md").await.unwrap();
        assert_eq!(entry.staleness_marker, 1000);
        assert!(store.get("notes/dogs.md").await.is_none());
    }

    #[tokio::test]
    async fn test_staleness_detection() {
        let entry = IndexEntry::new(1000, vec![1.0]);
        assert!(!entry.is_stale_against(1000));
        assert!(entry.is_stale_against(2000));
    }

    #[tokio::test]
    async fn test_rename_moves_entry() {
        let store = memory_store();
        store.put("old.md", IndexEntry::new(5, vec![0.5])).await;

        assert!(store.rename("old.md", "new.md").await);
        assert!(store.get("old.md").await.is_none());
        assert_eq!(store.get("new.md").await.unwrap().staleness_marker, 5);
    }

    #[tokio::test]
    async fn test_rename_missing_is_noop() {
        let store = memory_store();
        store.put("other.md", IndexEntry::new(5, vec![0.5])).await;

        assert!(!store.rename("absent.md", "new.md").await);
        assert_eq!(store.len().await, 1);
        assert!(store.get("new.md").await.is_none());
    }

    #[tokio::test]
    async fn test_remove() {
        let store = memory_store();
        store.put("a.md", IndexEntry::new(1, vec![1.0])).await;

        assert!(store.remove("a.md").await.is_some());
        assert!(store.remove("a.md").await.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");

        {
            let store = IndexStore::new(Arc::new(FileBlobStore::new(&path)));
            store.put("a.md", IndexEntry::new(1, vec![1.0, 2.0])).await;
            store.put("b.md", IndexEntry::new(2, vec![3.0, 4.0])).await;
            store.save().await.unwrap();
        }

        let store = IndexStore::new(Arc::new(FileBlobStore::new(&path)));
        store.load().await.unwrap();

        assert_eq!(store.len().await, 2);
        assert_eq!(store.get("a.md").await.unwrap().embedding, vec![1.0, 2.0]);
    }

    #[tokio::test]
    async fn test_save_preserves_loaded_settings() {
        let blob_store = Arc::new(MemoryBlobStore::new());
        blob_store
            .save(&SettingsBlob {
                settings: serde_json::json!({ "apiKey": "sk-test" }),
                index: HashMap::new(),
            })
            .await
            .unwrap();

        let store = IndexStore::new(blob_store.clone());
        store.load().await.unwrap();
        store.put("a.md", IndexEntry::new(1, vec![1.0])).await;
        store.save().await.unwrap();

        let blob = blob_store.load().await.unwrap().unwrap();
        assert_eq!(blob.settings["apiKey"], "sk-test");
        assert_eq!(blob.index.len(), 1);
    }

    #[tokio::test]
    async fn test_all_entries_is_a_snapshot() {
        let store = memory_store();
        store.put("a.md", IndexEntry::new(1, vec![1.0])).await;

        let snapshot = store.all_entries().await;
        store.remove("a.md").await;

        assert_eq!(snapshot.len(), 1);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_clear() {
        let store = memory_store();
        store.put("a.md", IndexEntry::new(1, vec![1.0])).await;
        store.put("b.md", IndexEntry::new(2, vec![2.0])).await;

        store.clear().await;
        assert!(store.is_empty().await);
    }
}
