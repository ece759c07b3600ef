use archive_models::{Document, DocumentFile, DocumentTag, DocumentVersion, Id, ReviewReason, ReviewStatus};
use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, Transaction};

/// Everything needed to materialize a Document and its first version from a
/// completed ingest pipeline (spec §4.5 `create_document_from_pipeline`).
pub struct NewDocument<'a> {
    pub source: &'a str,
    pub source_ref: Option<&'a str>,
    pub title: &'a str,
    pub description: &'a str,
    pub caption_raw: &'a str,
    pub summary: &'a str,
    pub category_id: Option<Id>,
    pub event_date: Option<NaiveDate>,
    pub review_reasons: Vec<ReviewReason>,
    pub primary_file_id: Id,
    pub tag_ids: Vec<Id>,
}

pub async fn create_document_from_pipeline(
    db: &PgPool,
    input: NewDocument<'_>,
) -> Result<Document, sqlx::Error> {
    let mut tx = db.begin().await?;
    let document_id = Id::generate();
    let review_status = ReviewStatus::derive(&input.review_reasons, ReviewStatus::None);

    let document: Document = sqlx::query_as(
        r#"
        INSERT INTO documents (
            id, source, source_ref, title, description, caption_raw, summary,
            category_id, event_date, ingested_at, review_status, review_reasons,
            current_version_no
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW(), $10, $11, 1)
        RETURNING *
        "#,
    )
    .bind(document_id)
    .bind(input.source)
    .bind(input.source_ref)
    .bind(input.title)
    .bind(input.description)
    .bind(input.caption_raw)
    .bind(input.summary)
    .bind(input.category_id)
    .bind(input.event_date)
    .bind(review_status)
    .bind(sqlx::types::Json(input.review_reasons.clone()))
    .fetch_one(&mut *tx)
    .await?;

    insert_version(
        &mut tx,
        document_id,
        1,
        input.title,
        input.description,
        input.summary,
        input.category_id,
        input.event_date,
        &input.tag_ids,
        "ingest_create",
    )
    .await?;

    sqlx::query("INSERT INTO document_files (document_id, file_id, is_primary) VALUES ($1, $2, true)")
        .bind(document_id)
        .bind(input.primary_file_id)
        .execute(&mut *tx)
        .await?;

    for tag_id in &input.tag_ids {
        sqlx::query("INSERT INTO document_tags (document_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(document_id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(document)
}

#[allow(clippy::too_many_arguments)]
async fn insert_version(
    tx: &mut Transaction<'_, Postgres>,
    document_id: Id,
    version_no: i32,
    title: &str,
    description: &str,
    summary: &str,
    category_id: Option<Id>,
    event_date: Option<NaiveDate>,
    tag_ids: &[Id],
    change_reason: &str,
) -> Result<DocumentVersion, sqlx::Error> {
    let tag_names: Vec<String> = sqlx::query_scalar("SELECT name FROM tags WHERE id = ANY($1)")
        .bind(tag_ids)
        .fetch_all(&mut **tx)
        .await?;

    sqlx::query_as(
        r#"
        INSERT INTO document_versions (
            document_id, version_no, title, description, summary,
            category_id, event_date, tags_snapshot, change_reason, changed_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW())
        RETURNING *
        "#,
    )
    .bind(document_id)
    .bind(version_no)
    .bind(title)
    .bind(description)
    .bind(summary)
    .bind(category_id)
    .bind(event_date)
    .bind(sqlx::types::Json(tag_names))
    .bind(change_reason)
    .fetch_one(&mut **tx)
    .await
}

pub async fn fetch_one(db: &PgPool, id: Id) -> Result<Document, sqlx::Error> {
    sqlx::query_as("SELECT * FROM documents WHERE id = $1")
        .bind(id)
        .fetch_one(db)
        .await
}

pub async fn fetch_by_source_ref(
    db: &PgPool,
    source: &str,
    source_ref: &str,
) -> Result<Option<Document>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM documents WHERE source = $1 AND source_ref = $2")
        .bind(source)
        .bind(source_ref)
        .fetch_optional(db)
        .await
}

/// Lists documents for the catalog/backfill engine, oldest-ingested first,
/// optionally scoped to a category, date range, or needs-review-only.
pub struct ListFilter {
    pub category_id: Option<Id>,
    pub event_date_from: Option<NaiveDate>,
    pub event_date_to: Option<NaiveDate>,
    pub needs_review_only: bool,
}

pub async fn list_page(
    db: &PgPool,
    filter: &ListFilter,
    after_id: Option<Id>,
    page_size: i64,
) -> Result<Vec<Document>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT * FROM documents
        WHERE ($1::uuid IS NULL OR category_id = $1)
          AND ($2::date IS NULL OR event_date >= $2)
          AND ($3::date IS NULL OR event_date <= $3)
          AND (NOT $4 OR review_status = 'NEEDS_REVIEW')
          AND ($5::uuid IS NULL OR id > $5)
        ORDER BY id ASC
        LIMIT $6
        "#,
    )
    .bind(filter.category_id)
    .bind(filter.event_date_from)
    .bind(filter.event_date_to)
    .bind(filter.needs_review_only)
    .bind(after_id)
    .bind(page_size)
    .fetch_all(db)
    .await
}

/// Applies a backfill's recomputed classification, bumping the version and
/// replacing tag links, per spec §4.8. Only called when the caller has
/// already determined the output actually changed.
#[allow(clippy::too_many_arguments)]
pub async fn apply_reclassification(
    db: &PgPool,
    document_id: Id,
    title: &str,
    description: &str,
    summary: &str,
    category_id: Option<Id>,
    event_date: Option<NaiveDate>,
    tag_ids: &[Id],
    review_reasons: Vec<ReviewReason>,
    change_reason: &str,
) -> Result<Document, sqlx::Error> {
    let mut tx = db.begin().await?;

    let prior_status: ReviewStatus = sqlx::query_scalar("SELECT review_status FROM documents WHERE id = $1")
        .bind(document_id)
        .fetch_one(&mut *tx)
        .await?;
    let review_status = ReviewStatus::derive(&review_reasons, prior_status);

    let document: Document = sqlx::query_as(
        r#"
        UPDATE documents
        SET title = $2, description = $3, summary = $4, category_id = $5,
            event_date = $6, review_status = $7, review_reasons = $8,
            current_version_no = current_version_no + 1
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(document_id)
    .bind(title)
    .bind(description)
    .bind(summary)
    .bind(category_id)
    .bind(event_date)
    .bind(review_status)
    .bind(sqlx::types::Json(review_reasons))
    .fetch_one(&mut *tx)
    .await?;

    insert_version(
        &mut tx,
        document_id,
        document.current_version_no,
        title,
        description,
        summary,
        category_id,
        event_date,
        tag_ids,
        change_reason,
    )
    .await?;

    sqlx::query("DELETE FROM document_tags WHERE document_id = $1")
        .bind(document_id)
        .execute(&mut *tx)
        .await?;
    for tag_id in tag_ids {
        sqlx::query("INSERT INTO document_tags (document_id, tag_id) VALUES ($1, $2)")
            .bind(document_id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(document)
}

pub async fn delete_document(db: &PgPool, document_id: Id) -> Result<(), sqlx::Error> {
    let mut tx = db.begin().await?;
    sqlx::query("UPDATE ingest_jobs SET document_id = NULL WHERE document_id = $1")
        .bind(document_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM document_versions WHERE document_id = $1")
        .bind(document_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM document_tags WHERE document_id = $1")
        .bind(document_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM document_files WHERE document_id = $1")
        .bind(document_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM documents WHERE id = $1")
        .bind(document_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

pub async fn fetch_tags(db: &PgPool, document_id: Id) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT t.name FROM tags t
        JOIN document_tags dt ON dt.tag_id = t.id
        WHERE dt.document_id = $1
        ORDER BY t.name
        "#,
    )
    .bind(document_id)
    .fetch_all(db)
    .await
}

pub async fn fetch_files(db: &PgPool, document_id: Id) -> Result<Vec<DocumentFile>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM document_files WHERE document_id = $1")
        .bind(document_id)
        .fetch_all(db)
        .await
}

pub async fn fetch_document_tag_links(db: &PgPool, document_id: Id) -> Result<Vec<DocumentTag>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM document_tags WHERE document_id = $1")
        .bind(document_id)
        .fetch_all(db)
        .await
}
