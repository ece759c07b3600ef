use archive_models::{Id, RuleVersion};
use sqlx::PgPool;

/// Fetches the single active ruleset version for a ruleset, or `None` if
/// none has been published yet (the rule engine then runs with an empty
/// ruleset, which resolves to the default category for everything).
pub async fn fetch_active(db: &PgPool, ruleset_id: Id) -> Result<Option<RuleVersion>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM rule_versions WHERE ruleset_id = $1 AND is_active")
        .bind(ruleset_id)
        .fetch_optional(db)
        .await
}

pub async fn fetch_by_version(db: &PgPool, ruleset_id: Id, version_no: i32) -> Result<RuleVersion, sqlx::Error> {
    sqlx::query_as("SELECT * FROM rule_versions WHERE ruleset_id = $1 AND version_no = $2")
        .bind(ruleset_id)
        .bind(version_no)
        .fetch_one(db)
        .await
}

/// Publishes a new dense, monotone version for a ruleset and deactivates
/// the prior active version in the same transaction.
pub async fn publish(
    db: &PgPool,
    ruleset_id: Id,
    rules: serde_json::Value,
    checksum_sha256: &str,
) -> Result<RuleVersion, sqlx::Error> {
    let mut tx = db.begin().await?;

    let next_version: i32 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(version_no), 0) + 1 FROM rule_versions WHERE ruleset_id = $1",
    )
    .bind(ruleset_id)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE rule_versions SET is_active = false WHERE ruleset_id = $1")
        .bind(ruleset_id)
        .execute(&mut *tx)
        .await?;

    let version = sqlx::query_as(
        r#"
        INSERT INTO rule_versions (ruleset_id, version_no, rules, checksum_sha256, published_at, is_active)
        VALUES ($1, $2, $3, $4, NOW(), true)
        RETURNING *
        "#,
    )
    .bind(ruleset_id)
    .bind(next_version)
    .bind(rules)
    .bind(checksum_sha256)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(version)
}
