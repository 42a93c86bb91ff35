//! Whole-snapshot persistence for the index.
//!
//! The index travels inside the host's single settings blob, under a
//! reserved key. Saves always write the complete blob; there is no
//! partial-update path, so a torn write can only ever produce a stale
//! whole snapshot, never a half-entry.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{IndexError, Result};
use crate::store::IndexEntry;

/// The host settings blob, with the index under its reserved key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsBlob {
    /// Host settings, opaque to the index and preserved verbatim.
    #[serde(default)]
    pub settings: serde_json::Value,

    /// The persisted embedding index.
    #[serde(default, rename = "embeddingIndex")]
    pub index: HashMap<String, IndexEntry>,
}

/// Persistence collaborator for the settings blob.
///
/// Whole-object, overwrite-on-write; there is no partial-update API.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Load the blob, or `None` if nothing has been persisted yet.
    async fn load(&self) -> Result<Option<SettingsBlob>>;

    /// Persist the complete blob.
    async fn save(&self, blob: &SettingsBlob) -> Result<()>;
}

/// File-backed blob store writing a single JSON document.
pub struct FileBlobStore {
    path: PathBuf,
}

impl FileBlobStore {
    /// Create a blob store at the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create a blob store at the default data location
    /// (`<data dir>/notemesh/settings.json`).
    pub fn default_location() -> Result<Self> {
        let base = dirs::data_dir()
            .ok_or_else(|| IndexError::Unavailable("no data directory".to_string()))?;
        Ok(Self::new(base.join("notemesh/settings.json")))
    }

    /// Get the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl BlobStore for FileBlobStore {
    async fn load(&self) -> Result<Option<SettingsBlob>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)
            .await
            .map_err(|e| IndexError::Unavailable(format!("{}: {e}", self.path.display())))?;

        let blob: SettingsBlob = serde_json::from_str(&content)?;
        info!(
            "loaded settings blob with {} index entries",
            blob.index.len()
        );
        Ok(Some(blob))
    }

    async fn save(&self, blob: &SettingsBlob) -> Result<()> {
        let content = serde_json::to_string(blob)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| IndexError::Unavailable(format!("{}: {e}", parent.display())))?;
        }

        // Write atomically using a temp file.
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, &content)
            .await
            .map_err(|e| IndexError::Unavailable(format!("{}: {e}", temp_path.display())))?;

        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| IndexError::Unavailable(format!("{}: {e}", self.path.display())))?;

        debug!("saved settings blob with {} index entries", blob.index.len());
        Ok(())
    }
}

/// In-memory blob store for hosts without file persistence, and for tests.
#[derive(Default)]
pub struct MemoryBlobStore {
    blob: Mutex<Option<SettingsBlob>>,
}

impl MemoryBlobStore {
    /// Create an empty in-memory blob store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn load(&self) -> Result<Option<SettingsBlob>> {
        Ok(self.blob.lock().await.clone())
    }

    async fn save(&self, blob: &SettingsBlob) -> Result<()> {
        *self.blob.lock().await = Some(blob.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_store_missing_file_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileBlobStore::new(temp_dir.path().join("settings.json"));

        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileBlobStore::new(temp_dir.path().join("settings.json"));

        let mut blob = SettingsBlob::default();
        blob.index.insert(
            "notes/cats.md".to_string(),
            IndexEntry::new(1000, vec![1.0, 0.0]),
        );
        store.save(&blob).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.index.len(), 1);
        assert_eq!(
            loaded.index.get("notes/cats.md").unwrap().staleness_marker,
            1000
        );
    }

    #[tokio::test]
    async fn test_file_store_preserves_settings() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileBlobStore::new(temp_dir.path().join("settings.json"));

        let blob = SettingsBlob {
            settings: serde_json::json!({ "apiKey": "sk-test", "topK": 7 }),
            index: HashMap::new(),
        };
        store.save(&blob).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.settings["apiKey"], "sk-test");
        assert_eq!(loaded.settings["topK"], 7);
    }

    #[tokio::test]
    async fn test_index_under_reserved_key() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        let store = FileBlobStore::new(&path);

        let mut blob = SettingsBlob::default();
        blob.index
            .insert("a.md".to_string(), IndexEntry::new(1, vec![0.5]));
        store.save(&blob).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(raw.get("embeddingIndex").is_some());
        assert_eq!(raw["embeddingIndex"]["a.md"]["staleness_marker"], 1);
    }

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryBlobStore::new();
        assert!(store.load().await.unwrap().is_none());

        let mut blob = SettingsBlob::default();
        blob.index
            .insert("a.md".to_string(), IndexEntry::new(42, vec![1.0]));
        store.save(&blob).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.index.get("a.md").unwrap().staleness_marker, 42);
    }
}
