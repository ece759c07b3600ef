use crate::port::SearchIndexPort;
use archive_models::Id;
use std::sync::Arc;

/// Mirrors the original's `search_sync_service`: best-effort, non-blocking
/// enqueue points called from the ingest pipeline and the review queue.
/// Unlike the original's Celery `.delay()` calls, there is no broker here —
/// `enqueue_*` just spawns the sync as a detached task, logging failures
/// instead of propagating them, which preserves the same "never blocks the
/// caller, never fails the caller" contract.
pub struct SearchSync {
    index: Arc<dyn SearchIndexPort>,
}

const BATCH_CHUNK_SIZE: usize = 500;

impl SearchSync {
    pub fn new(index: Arc<dyn SearchIndexPort>) -> Self {
        Self { index }
    }

    pub fn enqueue_sync(&self, documents: Vec<crate::document::SearchDocument>) {
        let index = Arc::clone(&self.index);
        tokio::spawn(async move {
            if let Err(err) = index.upsert_many(&documents).await {
                tracing::warn!(error = %err, "search index sync failed");
            }
        });
    }

    pub fn enqueue_sync_many(&self, documents: Vec<crate::document::SearchDocument>) {
        for chunk in documents.chunks(BATCH_CHUNK_SIZE).map(<[_]>::to_vec) {
            self.enqueue_sync(chunk);
        }
    }

    pub fn enqueue_delete(&self, id: Id) {
        let index = Arc::clone(&self.index);
        tokio::spawn(async move {
            if let Err(err) = index.delete_one(id).await {
                tracing::warn!(error = %err, document_id = %id, "search index delete failed");
            }
        });
    }

    /// Synchronous variant used by the backfill engine and rebuild command,
    /// which need to know completion counts rather than fire-and-forget.
    pub async fn sync_batch(&self, documents: &[crate::document::SearchDocument]) -> Result<usize, crate::error::SearchSyncError> {
        self.index.upsert_many(documents).await
    }
}
