use archive_models::{File, Id, StorageBackend};
use sqlx::PgPool;

/// Inserts a File row, or returns the existing one if its checksum is
/// already present (spec §3: checksum is unique; `put_bytes` may have
/// already written the bytes for a prior caller before this insert races
/// it). Returns `(file, linked_count)` so callers can derive
/// `DUPLICATE_SUSPECT` from how many documents already reference it.
pub async fn insert_or_fetch(
    db: &PgPool,
    checksum_sha256: &str,
    storage_backend: StorageBackend,
    bucket: Option<&str>,
    storage_key: &str,
    original_filename: &str,
    mime_type: Option<&str>,
    size_bytes: i64,
    extension: Option<&str>,
    metadata: serde_json::Value,
    source: &str,
    source_ref: Option<&str>,
) -> Result<(File, i64), sqlx::Error> {
    let inserted: Option<File> = sqlx::query_as(
        r#"
        INSERT INTO files (
            id, checksum_sha256, storage_backend, bucket, storage_key,
            original_filename, mime_type, size_bytes, extension, metadata,
            source, source_ref, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, NOW())
        ON CONFLICT (checksum_sha256) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(Id::generate())
    .bind(checksum_sha256)
    .bind(storage_backend)
    .bind(bucket)
    .bind(storage_key)
    .bind(original_filename)
    .bind(mime_type)
    .bind(size_bytes)
    .bind(extension)
    .bind(metadata)
    .bind(source)
    .bind(source_ref)
    .fetch_optional(db)
    .await?;

    let file = match inserted {
        Some(file) => file,
        None => fetch_by_checksum(db, checksum_sha256)
            .await?
            .expect("ON CONFLICT implies a row already exists for this checksum"),
    };

    let linked_count = count_document_links(db, file.id).await?;
    Ok((file, linked_count))
}

pub async fn fetch_by_checksum(db: &PgPool, checksum_sha256: &str) -> Result<Option<File>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM files WHERE checksum_sha256 = $1")
        .bind(checksum_sha256)
        .fetch_optional(db)
        .await
}

pub async fn fetch_one(db: &PgPool, id: Id) -> Result<File, sqlx::Error> {
    sqlx::query_as("SELECT * FROM files WHERE id = $1")
        .bind(id)
        .fetch_one(db)
        .await
}

async fn count_document_links(db: &PgPool, file_id: Id) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM document_files WHERE file_id = $1")
        .bind(file_id)
        .fetch_one(db)
        .await?;
    Ok(count)
}

/// Deletes a File row if no DocumentFile still references it. Returns
/// whether it was deleted, so the caller knows whether to also delete the
/// backing blob (spec §3: orphan sweep).
pub async fn delete_if_orphaned(db: &PgPool, file_id: Id) -> Result<bool, sqlx::Error> {
    let linked = count_document_links(db, file_id).await?;
    if linked > 0 {
        return Ok(false);
    }
    let result = sqlx::query("DELETE FROM files WHERE id = $1")
        .bind(file_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}
