use archive_models::{AuditLog, Id};
use sqlx::PgPool;

pub async fn record(
    db: &PgPool,
    actor: Option<&str>,
    action: &str,
    target_type: &str,
    target_id: Id,
    before_json: Option<serde_json::Value>,
    after_json: Option<serde_json::Value>,
) -> Result<AuditLog, sqlx::Error> {
    sqlx::query_as(
        r#"
        INSERT INTO audit_log (id, actor, action, target_type, target_id, before_json, after_json, occurred_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
        RETURNING *
        "#,
    )
    .bind(Id::generate())
    .bind(actor)
    .bind(action)
    .bind(target_type)
    .bind(target_id)
    .bind(before_json)
    .bind(after_json)
    .fetch_one(db)
    .await
}
