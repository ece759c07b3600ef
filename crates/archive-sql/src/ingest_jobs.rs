use archive_models::{Id, IngestErrorCode, IngestJob, IngestState};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

pub struct NewIngestJob<'a> {
    pub source: &'a str,
    pub source_ref: Option<&'a str>,
    pub file_path_temp: Option<&'a str>,
    pub caption: Option<&'a str>,
    pub payload: serde_json::Value,
    pub max_attempts: i32,
}

/// Inserts a new job in RECEIVED state. The `(source, source_ref)` partial
/// unique index (chat-bot source only) serializes duplicate uploads at
/// enqueue time; callers should treat a unique violation as "already
/// queued" and look the existing job up with
/// [`crate::documents::fetch_by_source_ref`]-style semantics via
/// [`fetch_by_source_ref`].
pub async fn insert(db: &PgPool, input: NewIngestJob<'_>) -> Result<IngestJob, sqlx::Error> {
    sqlx::query_as(
        r#"
        INSERT INTO ingest_jobs (
            id, source, source_ref, state, file_path_temp, caption, payload,
            document_id, attempt_count, max_attempts, retry_after,
            last_error_code, last_error_message, received_at, started_at, finished_at
        )
        VALUES ($1, $2, $3, 'RECEIVED', $4, $5, $6, NULL, 0, $7, NULL, NULL, NULL, NOW(), NULL, NULL)
        RETURNING *
        "#,
    )
    .bind(Id::generate())
    .bind(input.source)
    .bind(input.source_ref)
    .bind(input.file_path_temp)
    .bind(input.caption)
    .bind(input.payload)
    .bind(input.max_attempts)
    .fetch_one(db)
    .await
}

pub async fn fetch_one(db: &PgPool, id: Id) -> Result<IngestJob, sqlx::Error> {
    sqlx::query_as("SELECT * FROM ingest_jobs WHERE id = $1")
        .bind(id)
        .fetch_one(db)
        .await
}

pub async fn fetch_by_source_ref(
    db: &PgPool,
    source: &str,
    source_ref: &str,
) -> Result<Option<IngestJob>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM ingest_jobs WHERE source = $1 AND source_ref = $2")
        .bind(source)
        .bind(source_ref)
        .fetch_optional(db)
        .await
}

/// Claims a bounded batch of jobs ready for processing: non-terminal state,
/// `retry_after` either unset or in the past. `FOR UPDATE SKIP LOCKED` lets
/// multiple worker processes poll the same table without contending on
/// each other's rows.
pub async fn claim_ready_batch(db: &PgPool, limit: i64) -> Result<Vec<IngestJob>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT * FROM ingest_jobs
        WHERE state NOT IN ('PUBLISHED', 'NEEDS_REVIEW', 'FAILED')
          AND (retry_after IS NULL OR retry_after <= NOW())
        ORDER BY received_at ASC
        LIMIT $1
        FOR UPDATE SKIP LOCKED
        "#,
    )
    .bind(limit)
    .fetch_all(db)
    .await
}

pub async fn mark_started(db: &PgPool, id: Id) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE ingest_jobs SET started_at = COALESCE(started_at, NOW()) WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

/// Transitions a job to `to_state`, optionally attaching the document it
/// produced. Each transition is its own committed transaction per spec §5.
pub async fn transition(
    db: &PgPool,
    id: Id,
    to_state: IngestState,
    document_id: Option<Id>,
) -> Result<IngestJob, sqlx::Error> {
    let finished = to_state.is_terminal();
    sqlx::query_as(
        r#"
        UPDATE ingest_jobs
        SET state = $2,
            document_id = COALESCE($3, document_id),
            finished_at = CASE WHEN $4 THEN NOW() ELSE finished_at END
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(to_state)
    .bind(document_id)
    .bind(finished)
    .fetch_one(db)
    .await
}

/// Records a failed attempt: increments `attempt_count`, stores the error,
/// and either schedules a retry or dead-letters the job into FAILED when
/// attempts are exhausted. Backoff is computed by the caller
/// ([`archive_ingest`'s retry module) and passed in as `retry_after`; the
/// caller also decides `error_code` (the underlying stage error while
/// retrying, `DLQ_MAX_ATTEMPTS` once dead-lettered). On retry the job goes
/// back to RECEIVED with `started_at`/`finished_at` cleared so the next
/// poll picks it up as a fresh attempt, matching the original's
/// `_schedule_retry`.
pub async fn record_failure(
    db: &PgPool,
    id: Id,
    error_code: IngestErrorCode,
    error_message: &str,
    retry_after: Option<DateTime<Utc>>,
) -> Result<IngestJob, sqlx::Error> {
    let dead_letter = retry_after.is_none();
    sqlx::query_as(
        r#"
        UPDATE ingest_jobs
        SET attempt_count = attempt_count + 1,
            last_error_code = $2,
            last_error_message = $3,
            retry_after = $4,
            state = CASE WHEN $5 THEN 'FAILED' ELSE 'RECEIVED' END,
            started_at = CASE WHEN $5 THEN started_at ELSE NULL END,
            finished_at = CASE WHEN $5 THEN NOW() ELSE NULL END
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(error_code)
    .bind(error_message)
    .bind(retry_after)
    .bind(dead_letter)
    .fetch_one(db)
    .await
}
