use archive_ingest::PipelineContext;
use sqlx::PgPool;
use std::sync::Arc;

/// Shared application state, handed to every handler via `axum::Extension`
/// (the teacher's `startup::run` wires its `PgPool` the same way).
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub pipeline: Arc<PipelineContext>,
    pub read_only_mode: bool,
}
