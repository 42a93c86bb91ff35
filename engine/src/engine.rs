//! The engine facade and its command surface.

use std::sync::Arc;

use tracing::{debug, info, warn};

use notemesh_embeddings::EmbeddingClient;
use notemesh_index::{BlobStore, IndexStore, MemoryBlobStore};
use notemesh_scheduler::{Scheduler, SchedulerStats};

use crate::builder::IndexBuilder;
use crate::config::EngineConfig;
use crate::documents::{DocumentEvent, DocumentEventKind, DocumentStore};
use crate::error::{EngineError, Result};
use crate::ranker::{RelatedNote, SimilarityRanker};

/// The related-notes engine.
///
/// Owns the index store, the scheduler, the builder, and the ranker, and
/// exposes the commands the host UI drives: rebuild the index, show
/// related notes, reindex one document. Change notifications from the
/// document store feed `handle_event`.
pub struct NoteEngine {
    config: EngineConfig,
    store: Arc<IndexStore>,
    scheduler: Scheduler,
    builder: IndexBuilder,
    ranker: SimilarityRanker,
    documents: Arc<dyn DocumentStore>,
}

impl NoteEngine {
    /// Create a new engine builder.
    pub fn builder() -> NoteEngineBuilder {
        NoteEngineBuilder::new()
    }

    /// Initialize the engine with the given collaborators.
    ///
    /// Loads the persisted index; a load failure is logged and the engine
    /// starts with an empty in-memory index for the session.
    pub async fn new(
        config: EngineConfig,
        documents: Arc<dyn DocumentStore>,
        client: Arc<dyn EmbeddingClient>,
        blob_store: Arc<dyn BlobStore>,
    ) -> Self {
        let store = Arc::new(IndexStore::new(blob_store));
        if let Err(err) = store.load().await {
            warn!("failed to load persisted index, starting empty: {err}");
        }

        let scheduler = Scheduler::new(config.scheduler.clone());
        let builder = IndexBuilder::new(
            store.clone(),
            documents.clone(),
            client,
            scheduler.clone(),
            config.batch_size,
        );
        let ranker = SimilarityRanker::new(store.clone());

        info!("note engine initialized with {} entries", store.len().await);

        Self {
            config,
            store,
            scheduler,
            builder,
            ranker,
            documents,
        }
    }

    /// Rebuild the index from scratch: drop every entry, re-embed the
    /// whole collection, wait until the queue drains.
    ///
    /// Returns the number of batch tasks that ran. Per-document failures
    /// are logged by the scheduler and do not abort the rebuild.
    pub async fn rebuild_index(&self) -> Result<usize> {
        info!("rebuilding embedding index");
        self.store.clear().await;
        if let Err(err) = self.store.save().await {
            warn!("index save failed after clear: {err}");
        }

        let scheduled = self.builder.reconcile().await?;
        self.scheduler.on_idle().await;
        Ok(scheduled)
    }

    /// Get the documents most related to `id`, best first.
    ///
    /// Warm path: the target itself is embedded synchronously if stale;
    /// the rest of the corpus backfills in the background so a cold start
    /// does not block the interactive query.
    pub async fn related_notes(&self, id: &str) -> Result<Vec<RelatedNote>> {
        let meta = self
            .builder
            .find_document(id)
            .await?
            .ok_or_else(|| EngineError::NotFound(id.to_string()))?;

        self.builder.ensure_indexed(&meta).await?;
        self.spawn_backfill();

        self.ranker.related(id, self.config.top_k).await
    }

    /// Re-embed one document now, regardless of staleness.
    pub async fn reindex_document(&self, id: &str) -> Result<()> {
        let meta = self
            .builder
            .find_document(id)
            .await?
            .ok_or_else(|| EngineError::NotFound(id.to_string()))?;

        self.builder.reindex_now(&meta).await
    }

    /// Append the current related-notes ranking to the document itself.
    pub async fn write_related_notes(&self, id: &str) -> Result<()> {
        let related = self.related_notes(id).await?;
        if related.is_empty() {
            debug!("no related notes to write for {id}");
            return Ok(());
        }

        let mut section = String::from("\n\n## Related notes\n");
        for note in &related {
            section.push_str(&format!("- [[{}]] ({:.2})\n", note.id, note.score));
        }

        let content = self.documents.read_content(id).await?;
        self.documents
            .write_content(id, &format!("{content}{section}"))
            .await?;
        Ok(())
    }

    /// Process a change notification from the document store.
    pub async fn handle_event(&self, event: DocumentEvent) -> Result<()> {
        match event.kind {
            DocumentEventKind::Opened { id } => {
                if let Some(meta) = self.builder.find_document(&id).await? {
                    self.builder.ensure_indexed(&meta).await?;
                } else {
                    debug!("open event for unknown document {id}");
                }
            }
            DocumentEventKind::Modified { meta } => {
                self.builder.ensure_indexed(&meta).await?;
            }
            DocumentEventKind::Renamed { old_id, new_id } => {
                self.builder.document_renamed(&old_id, &new_id).await?;
            }
            DocumentEventKind::Deleted { id } => {
                self.builder.document_removed(&id).await?;
            }
        }
        Ok(())
    }

    /// Wait until all scheduled embedding work has reached a terminal
    /// state, failures included.
    pub async fn on_idle(&self) {
        self.scheduler.on_idle().await;
    }

    /// Get engine statistics.
    pub async fn stats(&self) -> EngineStats {
        EngineStats {
            indexed_documents: self.store.len().await,
            scheduler: self.scheduler.stats(),
        }
    }

    /// Schedule a background reconcile of the whole collection.
    fn spawn_backfill(&self) {
        let builder = self.builder.clone();
        tokio::spawn(async move {
            if let Err(err) = builder.reconcile().await {
                warn!("background reconcile failed: {err}");
            }
        });
    }
}

/// Builder for the note engine.
pub struct NoteEngineBuilder {
    config: EngineConfig,
    documents: Option<Arc<dyn DocumentStore>>,
    client: Option<Arc<dyn EmbeddingClient>>,
    blob_store: Option<Arc<dyn BlobStore>>,
}

impl NoteEngineBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            documents: None,
            client: None,
            blob_store: None,
        }
    }

    /// Set the engine configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the document store.
    pub fn with_documents(mut self, documents: Arc<dyn DocumentStore>) -> Self {
        self.documents = Some(documents);
        self
    }

    /// Set the embedding client.
    pub fn with_client(mut self, client: Arc<dyn EmbeddingClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the persistence collaborator.
    pub fn with_blob_store(mut self, blob_store: Arc<dyn BlobStore>) -> Self {
        self.blob_store = Some(blob_store);
        self
    }

    /// Build the engine. A document store and embedding client are
    /// required; persistence defaults to in-memory.
    pub async fn build(self) -> Result<NoteEngine> {
        let documents = self
            .documents
            .ok_or_else(|| EngineError::Config("document store not configured".to_string()))?;
        let client = self
            .client
            .ok_or_else(|| EngineError::Config("embedding client not configured".to_string()))?;
        let blob_store = self
            .blob_store
            .unwrap_or_else(|| Arc::new(MemoryBlobStore::new()));

        Ok(NoteEngine::new(self.config, documents, client, blob_store).await)
    }
}

impl Default for NoteEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about the engine.
#[derive(Debug, Clone)]
pub struct EngineStats {
    /// Number of documents with an index entry.
    pub indexed_documents: usize,

    /// Scheduler counters.
    pub scheduler: SchedulerStats,
}
