use crate::error::AppError;
use crate::state::AppState;
use archive_ingest::process_ingest_job;
use archive_models::Id;
use axum::extract::{Multipart, Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/ingest/:source", post(ingest_one))
        .route("/ingest/:source/batch", post(ingest_batch))
        .route("/ingest/actions/:job_id/:action", post(run_action))
        .with_state(state)
}

async fn health_check() -> &'static str {
    "ok"
}

#[derive(Debug, serde::Serialize)]
struct IngestAccepted {
    job_id: Id,
}

/// Accepts one multipart upload (`file` part plus optional `caption`,
/// `source_ref`, `metadata` JSON fields), enqueues an `ingest_jobs` row in
/// RECEIVED state, and kicks off processing immediately rather than waiting
/// for the next poll tick — the worker's own poll loop is the durability
/// backstop if this process restarts mid-flight.
async fn ingest_one(State(state): State<AppState>, Path(source): Path<String>, multipart: Multipart) -> Result<Json<IngestAccepted>, AppError> {
    let job_id = enqueue_from_multipart(&state, &source, multipart).await?;

    let pipeline = state.pipeline.clone();
    tokio::spawn(async move {
        if let Err(err) = process_ingest_job(&pipeline, job_id).await {
            tracing::error!(?err, %job_id, "ingest job processing crashed before reaching a terminal state");
        }
    });

    Ok(Json(IngestAccepted { job_id }))
}

/// Same as [`ingest_one`] but enqueues every `file` part found in the
/// multipart body without spawning a per-file task — the background worker
/// picks these up on its next poll tick, matching the bulk-upload path's
/// looser latency expectations in the original service.
async fn ingest_batch(State(state): State<AppState>, Path(source): Path<String>, mut multipart: Multipart) -> Result<Json<Vec<IngestAccepted>>, AppError> {
    let mut accepted = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|err| AppError::BadRequest(err.to_string()))? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload.bin").to_owned();
        let bytes = field.bytes().await.map_err(|err| AppError::BadRequest(err.to_string()))?;
        let job_id = enqueue_job(&state, &source, None, None, &filename, &bytes).await?;
        accepted.push(IngestAccepted { job_id });
    }

    Ok(Json(accepted))
}

async fn enqueue_from_multipart(state: &AppState, source: &str, mut multipart: Multipart) -> Result<Id, AppError> {
    let mut file_bytes: Option<bytes::Bytes> = None;
    let mut filename = "upload.bin".to_owned();
    let mut caption: Option<String> = None;
    let mut source_ref: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|err| AppError::BadRequest(err.to_string()))? {
        match field.name().map(str::to_owned) {
            Some(name) if name == "file" => {
                filename = field.file_name().unwrap_or("upload.bin").to_owned();
                file_bytes = Some(field.bytes().await.map_err(|err| AppError::BadRequest(err.to_string()))?);
            }
            Some(name) if name == "caption" => {
                caption = Some(field.text().await.map_err(|err| AppError::BadRequest(err.to_string()))?);
            }
            Some(name) if name == "source_ref" => {
                source_ref = Some(field.text().await.map_err(|err| AppError::BadRequest(err.to_string()))?);
            }
            _ => {}
        }
    }

    let bytes = file_bytes.ok_or_else(|| AppError::BadRequest("multipart body missing a 'file' part".into()))?;
    enqueue_job(state, source, caption, source_ref, &filename, &bytes).await
}

async fn enqueue_job(
    state: &AppState,
    source: &str,
    caption: Option<String>,
    source_ref: Option<String>,
    filename: &str,
    bytes: &[u8],
) -> Result<Id, AppError> {
    let temp_dir = std::env::temp_dir().join("archive-ingest-uploads");
    tokio::fs::create_dir_all(&temp_dir).await.map_err(anyhow::Error::from)?;
    let temp_path = temp_dir.join(format!("{}-{filename}", Id::generate()));
    tokio::fs::write(&temp_path, bytes).await.map_err(anyhow::Error::from)?;
    let temp_path_str = temp_path.to_string_lossy().into_owned();

    let job = archive_sql::ingest_jobs::insert(
        &state.db,
        archive_sql::ingest_jobs::NewIngestJob {
            source,
            source_ref: source_ref.as_deref(),
            file_path_temp: Some(&temp_path_str),
            caption: caption.as_deref(),
            payload: serde_json::json!({"filename": filename}),
            max_attempts: archive_models::IngestJob::DEFAULT_MAX_ATTEMPTS,
        },
    )
    .await?;

    Ok(job.id)
}

#[derive(Debug, serde::Deserialize)]
struct ActionRequest {
    token: String,
}

#[derive(Debug, serde::Serialize)]
struct ActionAccepted {
    job_id: Id,
    action: String,
}

/// Redeems an HMAC action token minted by
/// [`archive_notify::build_result_actions`] and re-runs the job. `retry`
/// leaves the document's prior attempt count and error intact; `reprocess`
/// additionally clears them (see spec §6's two distinct buttons).
async fn run_action(
    State(state): State<AppState>,
    Path((job_id, action)): Path<(Id, String)>,
    Json(body): Json<ActionRequest>,
) -> Result<Json<ActionAccepted>, AppError> {
    state
        .pipeline
        .token_signer
        .verify(&body.token, job_id.as_uuid(), &action, Utc::now())
        .map_err(|err| AppError::BadRequest(err.to_string()))?;

    if action == "reprocess" {
        sqlx::query("UPDATE ingest_jobs SET attempt_count = 0, last_error_code = NULL, last_error_message = NULL, retry_after = NULL WHERE id = $1")
            .bind(job_id)
            .execute(&state.db)
            .await?;
    }

    let pipeline = state.pipeline.clone();
    tokio::spawn(async move {
        if let Err(err) = process_ingest_job(&pipeline, job_id).await {
            tracing::error!(?err, %job_id, "action-triggered ingest re-run crashed");
        }
    });

    Ok(Json(ActionAccepted { job_id, action }))
}
