use crate::document::{SearchDocument, SearchQuery, SearchResult};
use crate::error::SearchSyncError;
use archive_models::Id;
use async_trait::async_trait;

/// SearchIndexPort is the seam between the Catalog and whichever engine
/// actually answers full-text queries — the DB's own tsvector column, or an
/// external Meilisearch-shaped service. Both sides of the seam speak the
/// same typed [`SearchDocument`] projection, so swapping backends never
/// touches the Catalog.
#[async_trait]
pub trait SearchIndexPort: Send + Sync {
    async fn ensure_index(&self) -> Result<(), SearchSyncError>;

    async fn upsert_many(&self, documents: &[SearchDocument]) -> Result<usize, SearchSyncError>;

    async fn delete_one(&self, id: Id) -> Result<(), SearchSyncError>;

    async fn search(&self, query: &SearchQuery) -> Result<SearchResult, SearchSyncError>;
}
