use archive_models::{slugify, Id, Tag};
use sqlx::PgPool;

/// Finds or creates a Tag by its slug, same race-recovery policy as
/// [`crate::categories::find_or_create`].
pub async fn find_or_create(db: &PgPool, name: &str) -> Result<Tag, sqlx::Error> {
    let slug = slugify(name);

    if let Some(existing) = fetch_by_slug(db, &slug).await? {
        return Ok(existing);
    }

    let inserted: Result<Tag, sqlx::Error> =
        sqlx::query_as("INSERT INTO tags (id, name, slug) VALUES ($1, $2, $3) RETURNING *")
            .bind(Id::generate())
            .bind(name)
            .bind(&slug)
            .fetch_one(db)
            .await;

    match inserted {
        Ok(tag) => Ok(tag),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            fetch_by_slug(db, &slug).await?.ok_or(sqlx::Error::RowNotFound)
        }
        Err(other) => Err(other),
    }
}

pub async fn find_or_create_many(db: &PgPool, names: &[String]) -> Result<Vec<Tag>, sqlx::Error> {
    let mut tags = Vec::with_capacity(names.len());
    for name in names {
        tags.push(find_or_create(db, name).await?);
    }
    Ok(tags)
}

pub async fn fetch_by_slug(db: &PgPool, slug: &str) -> Result<Option<Tag>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM tags WHERE slug = $1")
        .bind(slug)
        .fetch_optional(db)
        .await
}
