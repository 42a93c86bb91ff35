//! Incremental index building.
//!
//! The builder diffs the document collection against the index by
//! staleness marker and schedules embedding work through the rate-limited
//! scheduler. Failures stay contained to their batch; a failed batch
//! leaves its documents stale for the next reconcile.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use notemesh_embeddings::EmbeddingClient;
use notemesh_index::{IndexEntry, IndexStore};
use notemesh_scheduler::{Job, JobError, Scheduler, TaskHandle, TaskOutcome};

use crate::documents::{DocumentError, DocumentMeta, DocumentStore};
use crate::error::{EngineError, Result};

/// Builds and maintains the embedding index incrementally.
#[derive(Clone)]
pub struct IndexBuilder {
    store: Arc<IndexStore>,
    documents: Arc<dyn DocumentStore>,
    client: Arc<dyn EmbeddingClient>,
    scheduler: Scheduler,
    batch_size: usize,
}

impl IndexBuilder {
    /// Create a builder over the given collaborators.
    pub fn new(
        store: Arc<IndexStore>,
        documents: Arc<dyn DocumentStore>,
        client: Arc<dyn EmbeddingClient>,
        scheduler: Scheduler,
        batch_size: usize,
    ) -> Self {
        Self {
            store,
            documents,
            client,
            scheduler,
            batch_size: batch_size.max(1),
        }
    }

    /// Diff the collection against the index and schedule one embed task
    /// per batch of stale or missing documents.
    ///
    /// Returns the number of tasks scheduled; a second call with no
    /// document changes in between schedules zero.
    pub async fn reconcile(&self) -> Result<usize> {
        let documents = self.documents.list_documents().await?;

        let mut stale = Vec::new();
        for meta in documents {
            let fresh = match self.store.get(&meta.id).await {
                Some(entry) => !entry.is_stale_against(meta.modified_at),
                None => false,
            };
            if !fresh {
                stale.push(meta);
            }
        }

        if stale.is_empty() {
            debug!("index is up to date, nothing to schedule");
            return Ok(0);
        }

        let mut scheduled = 0;
        for chunk in stale.chunks(self.batch_size) {
            self.spawn_batch(chunk.to_vec());
            scheduled += 1;
        }

        info!(
            "scheduled {scheduled} embedding batches for {} stale documents",
            stale.len()
        );
        Ok(scheduled)
    }

    /// Single-document fast path used after an edit or open.
    ///
    /// Embeds just this document if it is stale, awaiting the result so
    /// the caller sees an indexed document; the rest of the corpus is not
    /// touched here and backfills through `reconcile`.
    pub async fn ensure_indexed(&self, meta: &DocumentMeta) -> Result<()> {
        let stale = match self.store.get(&meta.id).await {
            Some(entry) => entry.is_stale_against(meta.modified_at),
            None => true,
        };
        if !stale {
            return Ok(());
        }

        self.await_batch(vec![meta.clone()]).await
    }

    /// Re-embed a document now, regardless of staleness.
    pub async fn reindex_now(&self, meta: &DocumentMeta) -> Result<()> {
        self.await_batch(vec![meta.clone()]).await
    }

    /// Handle a rename notification.
    ///
    /// The entry moves synchronously; content is unchanged so no embedding
    /// call is needed. When the old id was never indexed (or its embed is
    /// still in flight), the content still lacks an entry, so the new id
    /// is scheduled instead.
    pub async fn document_renamed(&self, old_id: &str, new_id: &str) -> Result<()> {
        let moved = self.store.rename(old_id, new_id).await;
        self.persist("rename").await;

        if !moved {
            if let Some(meta) = self.find_document(new_id).await? {
                debug!("scheduling embed for renamed but unindexed document {new_id}");
                self.spawn_batch(vec![meta]);
            }
        }

        Ok(())
    }

    /// Handle a delete notification.
    pub async fn document_removed(&self, id: &str) -> Result<()> {
        self.store.remove(id).await;
        self.persist("delete").await;
        Ok(())
    }

    /// Look a document up by id in the store's listing.
    pub async fn find_document(&self, id: &str) -> Result<Option<DocumentMeta>> {
        let documents = self.documents.list_documents().await?;
        Ok(documents.into_iter().find(|meta| meta.id == id))
    }

    /// Enqueue one embed-batch task.
    fn spawn_batch(&self, batch: Vec<DocumentMeta>) -> TaskHandle {
        let job = EmbedBatchJob {
            batch,
            store: self.store.clone(),
            documents: self.documents.clone(),
            client: self.client.clone(),
        };
        self.scheduler.enqueue(Arc::new(job))
    }

    /// Enqueue one batch and wait for its terminal outcome.
    async fn await_batch(&self, batch: Vec<DocumentMeta>) -> Result<()> {
        match self.spawn_batch(batch).outcome().await {
            TaskOutcome::Succeeded => Ok(()),
            TaskOutcome::Failed(err) => Err(EngineError::TaskFailed(err)),
        }
    }

    /// Persist the index after a synchronous mutation. Persistence failure
    /// keeps the in-memory index usable, so it is logged, not returned.
    async fn persist(&self, operation: &str) {
        if let Err(err) = self.store.save().await {
            warn!("index save failed after {operation}: {err}");
        }
    }
}

/// One scheduled embedding call covering a batch of documents.
struct EmbedBatchJob {
    batch: Vec<DocumentMeta>,
    store: Arc<IndexStore>,
    documents: Arc<dyn DocumentStore>,
    client: Arc<dyn EmbeddingClient>,
}

#[async_trait]
impl Job for EmbedBatchJob {
    fn label(&self) -> String {
        match self.batch.as_slice() {
            [single] => format!("embed {}", single.id),
            batch => format!("embed batch of {}", batch.len()),
        }
    }

    async fn run(&self) -> std::result::Result<(), JobError> {
        // Contents are read at run time; anything renamed or deleted since
        // enqueue simply drops out of the batch.
        let mut members = Vec::with_capacity(self.batch.len());
        let mut texts = Vec::with_capacity(self.batch.len());
        for meta in &self.batch {
            match self.documents.read_content(&meta.id).await {
                Ok(text) => {
                    members.push(meta.clone());
                    texts.push(text);
                }
                Err(DocumentError::NotFound(_)) => {
                    debug!("document {} vanished before embedding, skipping", meta.id);
                }
                Err(err) => return Err(JobError::Fatal(err.to_string())),
            }
        }

        if texts.is_empty() {
            return Ok(());
        }

        let vectors = self.client.embed(&texts).await.map_err(|err| {
            if err.is_transient() {
                JobError::Transient(err.to_string())
            } else {
                JobError::Fatal(err.to_string())
            }
        })?;

        // A count mismatch means positional assignment would be a guess;
        // fail the whole batch and leave every entry untouched.
        if vectors.len() != texts.len() {
            return Err(JobError::Fatal(format!(
                "malformed response: expected {} vectors, got {}",
                texts.len(),
                vectors.len()
            )));
        }

        for (meta, embedding) in members.iter().zip(vectors) {
            self.store
                .put(meta.id.clone(), IndexEntry::new(meta.modified_at, embedding))
                .await;
        }

        if let Err(err) = self.store.save().await {
            warn!("index save failed after batch: {err}; entries kept in memory");
        }

        Ok(())
    }
}
