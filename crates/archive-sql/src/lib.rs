pub mod audit_log;
pub mod categories;
pub mod documents;
pub mod files;
pub mod ingest_events;
pub mod ingest_jobs;
pub mod rule_versions;
pub mod tags;

pub use sqlx::PgPool;
