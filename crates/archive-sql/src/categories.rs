use archive_models::{slugify, Category, Id};
use sqlx::PgPool;

/// Finds or creates a Category by its slug. Concurrent writers racing to
/// create the same category recover from the unique-slug violation by
/// re-selecting the row the other writer just inserted (spec §5: "Category
/// and Tag upserts handle the race by catching the integrity violation and
/// re-selecting the existing row").
pub async fn find_or_create(db: &PgPool, name: &str) -> Result<Category, sqlx::Error> {
    let slug = slugify(name);

    if let Some(existing) = fetch_by_slug(db, &slug).await? {
        return Ok(existing);
    }

    let inserted: Result<Category, sqlx::Error> = sqlx::query_as(
        "INSERT INTO categories (id, name, slug) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(Id::generate())
    .bind(name)
    .bind(&slug)
    .fetch_one(db)
    .await;

    match inserted {
        Ok(category) => Ok(category),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => fetch_by_slug(db, &slug)
            .await?
            .ok_or(sqlx::Error::RowNotFound),
        Err(other) => Err(other),
    }
}

pub async fn fetch_by_slug(db: &PgPool, slug: &str) -> Result<Option<Category>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM categories WHERE slug = $1")
        .bind(slug)
        .fetch_optional(db)
        .await
}

pub async fn fetch_one(db: &PgPool, id: Id) -> Result<Category, sqlx::Error> {
    sqlx::query_as("SELECT * FROM categories WHERE id = $1")
        .bind(id)
        .fetch_one(db)
        .await
}

pub async fn list_all(db: &PgPool) -> Result<Vec<Category>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM categories ORDER BY name").fetch_all(db).await
}
