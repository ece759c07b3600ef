use crate::document::{SearchDocument, SearchFilter, SearchQuery, SearchResult};
use crate::error::SearchSyncError;
use crate::port::SearchIndexPort;
use archive_models::Id;
use async_trait::async_trait;
use sqlx::PgPool;

/// DbFallbackIndex answers search with the Catalog's own `tsvector` column
/// rather than a separate service — the degraded-but-always-available mode
/// the original fell back to whenever `search_backend != "meili"`.
pub struct DbFallbackIndex {
    db: PgPool,
}

impl DbFallbackIndex {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SearchIndexPort for DbFallbackIndex {
    /// No index to provision — the GIN index on `search_vector` is created
    /// by the schema migration, not at runtime.
    async fn ensure_index(&self) -> Result<(), SearchSyncError> {
        Ok(())
    }

    /// Recomputes `search_vector` for the given documents from their
    /// current title/description/summary/caption/tag text. The db fallback
    /// reads straight from the source tables, so only the ids matter here.
    async fn upsert_many(&self, documents: &[SearchDocument]) -> Result<usize, SearchSyncError> {
        let ids: Vec<Id> = documents.iter().map(|d| d.id).collect();
        reindex_ids(&self.db, &ids).await
    }

    async fn delete_one(&self, _id: Id) -> Result<(), SearchSyncError> {
        // The search_vector column is dropped along with the document row
        // itself via the documents-table cascade; nothing extra to clean up.
        Ok(())
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchResult, SearchSyncError> {
        let SearchFilter {
            category_id,
            tag_slug,
            event_date_from,
            event_date_to,
            review_status,
        } = &query.filter;

        let order_column = query.sort_by.as_str();
        let order_dir = query.sort_order.as_str();

        // Every filter param is always bound, guarded by an `$n IS NULL OR`
        // clause, so the placeholder list never changes shape — simpler
        // to reason about than building the SQL string per active filter.
        let sql = format!(
            r#"
            SELECT d.id, COUNT(*) OVER() AS total
            FROM documents d
            WHERE d.search_vector @@ plainto_tsquery('simple', $1)
              AND ($4::uuid IS NULL OR d.category_id = $4)
              AND ($5::text IS NULL OR EXISTS (
                    SELECT 1 FROM document_tags dt JOIN tags t ON t.id = dt.tag_id
                    WHERE dt.document_id = d.id AND t.slug = $5))
              AND ($6::date IS NULL OR d.event_date >= $6)
              AND ($7::date IS NULL OR d.event_date <= $7)
              AND ($8::review_status IS NULL OR d.review_status = $8)
            ORDER BY d.{order_column} {order_dir} NULLS LAST
            OFFSET $2 LIMIT $3
            "#
        );

        let rows: Vec<(Id, i64)> = sqlx::query_as(&sql)
            .bind(&query.text)
            .bind(query.offset() as i64)
            .bind(query.size.max(1) as i64)
            .bind(category_id.map(|id| id.as_uuid()))
            .bind(tag_slug.as_deref())
            .bind(*event_date_from)
            .bind(*event_date_to)
            .bind(*review_status)
            .fetch_all(&self.db)
            .await?;

        let total = rows.first().map(|(_, total)| *total as u64).unwrap_or(0);
        let ids = rows.into_iter().map(|(id, _)| id).collect();
        Ok(SearchResult { ids, total })
    }
}

/// Recomputes and writes `search_vector` for a batch of document ids.
/// Exposed separately from the [`SearchIndexPort`] trait because the db
/// fallback works from ids already in the Catalog rather than a
/// denormalized payload an external service would need shipped to it.
pub async fn reindex_ids(db: &PgPool, ids: &[Id]) -> Result<usize, SearchSyncError> {
    if ids.is_empty() {
        return Ok(0);
    }
    let result = sqlx::query(
        r#"
        UPDATE documents d
        SET search_vector = to_tsvector(
            'simple',
            coalesce(d.title, '') || ' ' ||
            coalesce(d.description, '') || ' ' ||
            coalesce(d.summary, '') || ' ' ||
            coalesce(d.caption_raw, '') || ' ' ||
            coalesce((SELECT string_agg(t.name, ' ') FROM document_tags dt
                      JOIN tags t ON t.id = dt.tag_id WHERE dt.document_id = d.id), '')
        )
        WHERE d.id = ANY($1)
        "#,
    )
    .bind(ids)
    .execute(db)
    .await?;
    Ok(result.rows_affected() as usize)
}
