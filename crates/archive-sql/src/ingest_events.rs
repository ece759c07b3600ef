use archive_models::{Id, IngestEvent, IngestState};
use sqlx::PgPool;

/// Records one state transition, per spec §5: "each transition is
/// committed in its own transaction, with an IngestEvent row" — call this
/// in the same transaction as the job update it documents.
pub async fn insert(
    db: &PgPool,
    job_id: Id,
    from_state: Option<IngestState>,
    to_state: IngestState,
    event_type: &str,
    event_message: Option<&str>,
    event_payload: serde_json::Value,
) -> Result<IngestEvent, sqlx::Error> {
    sqlx::query_as(
        r#"
        INSERT INTO ingest_events (
            id, job_id, from_state, to_state, event_type, event_message,
            event_payload, occurred_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
        RETURNING *
        "#,
    )
    .bind(Id::generate())
    .bind(job_id)
    .bind(from_state)
    .bind(to_state)
    .bind(event_type)
    .bind(event_message)
    .bind(event_payload)
    .fetch_one(db)
    .await
}

pub async fn fetch_for_job(db: &PgPool, job_id: Id) -> Result<Vec<IngestEvent>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM ingest_events WHERE job_id = $1 ORDER BY occurred_at ASC")
        .bind(job_id)
        .fetch_all(db)
        .await
}
