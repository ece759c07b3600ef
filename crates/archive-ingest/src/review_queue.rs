use archive_models::{Document, Id, ReviewStatus};
use archive_search::{SearchDocument, SearchSync};
use archive_sql::documents::ListFilter;
use sqlx::PgPool;

#[derive(Debug, thiserror::Error)]
pub enum ReviewQueueError {
    #[error(transparent)]
    Db(#[from] sqlx::Error),
    #[error("document {0} is not in NEEDS_REVIEW")]
    NotInReview(Id),
}

pub async fn list_needs_review(db: &PgPool, after_id: Option<Id>, page_size: i64) -> Result<Vec<Document>, sqlx::Error> {
    let filter = ListFilter {
        category_id: None,
        event_date_from: None,
        event_date_to: None,
        needs_review_only: true,
    };
    archive_sql::documents::list_page(db, &filter, after_id, page_size).await
}

/// Clears a document's review flag without re-running the rule engine —
/// an operator decision overrides whatever the classifier produced, per
/// spec §4.9. Bumps the version with `change_reason = "review_resolved"`
/// and writes an audit entry naming the operator.
pub async fn resolve(db: &PgPool, search: &SearchSync, document_id: Id, operator_id: &str) -> Result<Document, ReviewQueueError> {
    let document = archive_sql::documents::fetch_one(db, document_id).await?;
    if document.review_status != ReviewStatus::NeedsReview {
        return Err(ReviewQueueError::NotInReview(document_id));
    }

    let tags = archive_sql::documents::fetch_tags(db, document_id).await?;
    let tag_ids = tag_ids_for_names(db, &tags).await?;

    let before = serde_json::json!({"review_status": document.review_status, "review_reasons": document.review_reasons.0});

    let updated = archive_sql::documents::apply_reclassification(
        db,
        document_id,
        &document.title,
        &document.description,
        &document.summary,
        document.category_id,
        document.event_date,
        &tag_ids,
        Vec::new(),
        "review_resolved",
    )
    .await?;

    archive_sql::audit_log::record(
        db,
        Some(operator_id),
        "review_resolved",
        "document",
        document_id,
        Some(before),
        Some(serde_json::json!({"review_status": updated.review_status})),
    )
    .await?;

    enqueue_resync(search, db, &updated).await?;
    Ok(updated)
}

/// Reassigns a document's category by operator decision, independent of
/// the rule engine. Leaves `review_reasons`/`review_status` untouched —
/// an operator fixing a miscategorization doesn't imply the document is
/// newly resolved or newly flagged.
pub async fn reassign_category(
    db: &PgPool,
    search: &SearchSync,
    document_id: Id,
    category_id: Id,
    operator_id: &str,
) -> Result<Document, sqlx::Error> {
    let document = archive_sql::documents::fetch_one(db, document_id).await?;
    let tags = archive_sql::documents::fetch_tags(db, document_id).await?;
    let tag_ids = tag_ids_for_names(db, &tags).await?;

    let before = serde_json::json!({"category_id": document.category_id});

    let updated = archive_sql::documents::apply_reclassification(
        db,
        document_id,
        &document.title,
        &document.description,
        &document.summary,
        Some(category_id),
        document.event_date,
        &tag_ids,
        document.review_reasons.0.clone(),
        "review_reassign_category",
    )
    .await?;

    archive_sql::audit_log::record(
        db,
        Some(operator_id),
        "review_reassign_category",
        "document",
        document_id,
        Some(before),
        Some(serde_json::json!({"category_id": updated.category_id})),
    )
    .await?;

    enqueue_resync(search, db, &updated).await?;
    Ok(updated)
}

async fn tag_ids_for_names(db: &PgPool, names: &[String]) -> Result<Vec<Id>, sqlx::Error> {
    let tags = archive_sql::tags::find_or_create_many(db, names).await?;
    Ok(tags.into_iter().map(|t| t.id).collect())
}

async fn enqueue_resync(search: &SearchSync, db: &PgPool, document: &Document) -> Result<(), sqlx::Error> {
    let tag_names = archive_sql::documents::fetch_tags(db, document.id).await?;
    let tags = archive_sql::tags::find_or_create_many(db, &tag_names).await?;
    let category = match document.category_id {
        Some(id) => Some(archive_sql::categories::fetch_one(db, id).await?.name),
        None => None,
    };

    search.enqueue_sync(vec![SearchDocument {
        id: document.id,
        title: document.title.clone(),
        description: document.description.clone(),
        summary: document.summary.clone(),
        caption_raw: document.caption_raw.clone(),
        source: document.source.clone(),
        source_ref: document.source_ref.clone(),
        category_id: document.category_id,
        category,
        event_date: document.event_date,
        ingested_at: document.ingested_at,
        review_status: document.review_status,
        tags: tags.iter().map(|t| t.name.clone()).collect(),
        tag_slugs: tags.iter().map(|t| t.slug.clone()).collect(),
        is_uncategorized: document.category_id.is_none(),
    }]);

    Ok(())
}
