use crate::error::PipelineError;
use crate::retry;
use archive_content_store::ContentStore;
use archive_models::{Id, IngestErrorCode, IngestJob, IngestStage, IngestState, ReviewReason, StorageBackend};
use archive_notify::{build_result_actions, IngestResultPayload};
use archive_rules::{apply_rules, parse_caption, RuleInput};
use archive_search::{SearchDocument, SearchSync};
use archive_sql::documents::NewDocument;
use sqlx::PgPool;
use std::path::Path;

/// Everything the pipeline needs beyond the Catalog/ContentStore types
/// themselves — the process-wide collaborators named-but-thin per spec §1
/// (Notifier, Search Sync, Action Token signer) plus retry/backoff config.
pub struct PipelineContext {
    pub db: PgPool,
    pub content_store: ContentStore,
    pub storage_backend: StorageBackend,
    pub storage_bucket: Option<String>,
    pub notifier: archive_notify::Notifier,
    pub search: SearchSync,
    pub token_signer: archive_tokens::ActionTokenSigner,
    pub action_base_url: String,
    pub action_ttl_seconds: i64,
    pub dashboard_base_url: String,
    pub retry_base_seconds: i64,
    pub retry_max_seconds: i64,
}

pub struct PipelineOutcome {
    pub ok: bool,
    pub document_id: Option<Id>,
}

/// Runs one ingest attempt for `job_id`: STORED → EXTRACTED → CLASSIFIED →
/// INDEXED → {PUBLISHED | NEEDS_REVIEW}, or FAILED on the first
/// unrecoverable error. Mirrors `process_ingest_job`'s structure: a single
/// outer try that converts every stage failure into a classified
/// [`PipelineError`] and routes it through [`fail_or_retry`].
pub async fn process_ingest_job(ctx: &PipelineContext, job_id: Id) -> Result<PipelineOutcome, sqlx::Error> {
    let job = archive_sql::ingest_jobs::fetch_one(&ctx.db, job_id).await?;
    archive_sql::ingest_jobs::mark_started(&ctx.db, job_id).await?;

    match run_pipeline(ctx, &job).await {
        Ok(document_id) => Ok(PipelineOutcome { ok: true, document_id: Some(document_id) }),
        Err(err) => {
            fail_or_retry(ctx, &job, err).await?;
            Ok(PipelineOutcome { ok: false, document_id: None })
        }
    }
}

async fn run_pipeline(ctx: &PipelineContext, job: &IngestJob) -> Result<Id, PipelineError> {
    // --- STORED ---
    let temp_path = job
        .file_path_temp
        .as_deref()
        .ok_or_else(|| PipelineError::new(IngestErrorCode::StorageTempFileMissing, IngestStage::Stored, "no temp file recorded on job"))?;
    let bytes = tokio::fs::read(temp_path)
        .await
        .map_err(|err| PipelineError::storage(err.kind(), format!("reading temp file: {err}")))?;

    let filename = job
        .payload
        .get("filename")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .unwrap_or_else(|| Path::new(temp_path).file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default());
    let extension = Path::new(&filename).extension().and_then(|e| e.to_str());

    let put = ctx.content_store.put_bytes(&bytes, extension).await?;
    let mime_type = mime_guess::from_path(&filename).first().map(|m| m.to_string());

    let (file, linked_count) = archive_sql::files::insert_or_fetch(
        &ctx.db,
        &put.checksum_sha256,
        ctx.storage_backend,
        ctx.storage_bucket.as_deref(),
        &put.storage_key,
        &filename,
        mime_type.as_deref(),
        put.size_bytes,
        extension,
        serde_json::json!({}),
        &job.source,
        job.source_ref.as_deref(),
    )
    .await?;
    let duplicate_suspect = linked_count > 0;

    archive_sql::ingest_jobs::transition(&ctx.db, job.id, IngestState::Stored, None).await?;
    archive_sql::ingest_events::insert(
        &ctx.db,
        job.id,
        Some(job.state),
        IngestState::Stored,
        "STATE_TRANSITION",
        Some("file stored"),
        serde_json::json!({"checksum_sha256": put.checksum_sha256, "file_id": file.id}),
    )
    .await?;

    // --- EXTRACTED ---
    let parsed = parse_caption(job.caption.as_deref(), &filename);
    archive_sql::ingest_jobs::transition(&ctx.db, job.id, IngestState::Extracted, None).await?;
    archive_sql::ingest_events::insert(
        &ctx.db,
        job.id,
        Some(IngestState::Stored),
        IngestState::Extracted,
        "STATE_TRANSITION",
        Some("caption and metadata extracted"),
        serde_json::json!({"title": parsed.title}),
    )
    .await?;

    // --- CLASSIFIED ---
    let active_ruleset = archive_sql::rule_versions::fetch_active(&ctx.db, default_ruleset_id())
        .await
        .map_err(|err| PipelineError::new(IngestErrorCode::RuleClassifyFail, IngestStage::Classified, err.to_string()))?;
    let rules = active_ruleset.map(|rv| rv.rules).unwrap_or_else(|| serde_json::json!({}));

    let rule_ctx = RuleInput {
        title: parsed.title.clone(),
        description: parsed.description.clone(),
        filename: filename.clone(),
        body_text: String::new(),
        metadata_date_text: None,
        ingested_at: job.received_at,
        caption: parsed.clone(),
    };
    let rule_out = apply_rules(&rule_ctx, &rules);

    let mut review_reasons = rule_out.review_reasons.clone();
    if duplicate_suspect && !review_reasons.contains(&ReviewReason::DuplicateSuspect) {
        review_reasons.push(ReviewReason::DuplicateSuspect);
    }

    let category = archive_sql::categories::find_or_create(&ctx.db, &rule_out.category)
        .await
        .map_err(|err| PipelineError::new(IngestErrorCode::RuleClassifyFail, IngestStage::Classified, err.to_string()))?;
    let tags = archive_sql::tags::find_or_create_many(&ctx.db, &rule_out.tags)
        .await
        .map_err(|err| PipelineError::new(IngestErrorCode::RuleClassifyFail, IngestStage::Classified, err.to_string()))?;

    archive_sql::ingest_jobs::transition(&ctx.db, job.id, IngestState::Classified, None).await?;
    archive_sql::ingest_events::insert(
        &ctx.db,
        job.id,
        Some(IngestState::Extracted),
        IngestState::Classified,
        "STATE_TRANSITION",
        Some("classification completed"),
        serde_json::json!({
            "category": category.name,
            "event_date": rule_out.event_date,
            "tags": rule_out.tags,
            "review_reasons": review_reasons,
        }),
    )
    .await?;

    // --- INDEXED ---
    let document = archive_sql::documents::create_document_from_pipeline(
        &ctx.db,
        NewDocument {
            source: &job.source,
            source_ref: job.source_ref.as_deref(),
            title: &parsed.title,
            description: &parsed.description,
            caption_raw: &parsed.caption_raw,
            summary: String::new().as_str(),
            category_id: Some(category.id),
            event_date: Some(rule_out.event_date),
            review_reasons: review_reasons.clone(),
            primary_file_id: file.id,
            tag_ids: tags.iter().map(|t| t.id).collect(),
        },
    )
    .await
    .map_err(|err| PipelineError::new(IngestErrorCode::DbWriteFail, IngestStage::Indexed, err.to_string()))?;

    archive_sql::ingest_jobs::transition(&ctx.db, job.id, IngestState::Indexed, Some(document.id)).await?;
    archive_sql::ingest_events::insert(
        &ctx.db,
        job.id,
        Some(IngestState::Classified),
        IngestState::Indexed,
        "STATE_TRANSITION",
        Some("document indexed"),
        serde_json::json!({"document_id": document.id}),
    )
    .await?;

    ctx.search.enqueue_sync(vec![SearchDocument {
        id: document.id,
        title: document.title.clone(),
        description: document.description.clone(),
        summary: document.summary.clone(),
        caption_raw: document.caption_raw.clone(),
        source: document.source.clone(),
        source_ref: document.source_ref.clone(),
        category_id: document.category_id,
        category: Some(category.name.clone()),
        event_date: document.event_date,
        ingested_at: document.ingested_at,
        review_status: document.review_status,
        tags: tags.iter().map(|t| t.name.clone()).collect(),
        tag_slugs: tags.iter().map(|t| t.slug.clone()).collect(),
        is_uncategorized: document.category_id.is_none(),
    }]);

    let terminal_state = if review_reasons.is_empty() { IngestState::Published } else { IngestState::NeedsReview };
    archive_sql::ingest_jobs::transition(&ctx.db, job.id, terminal_state, None).await?;
    archive_sql::ingest_events::insert(
        &ctx.db,
        job.id,
        Some(IngestState::Indexed),
        terminal_state,
        "STATE_TRANSITION",
        Some(if terminal_state == IngestState::Published { "document published" } else { "document requires review" }),
        serde_json::json!({"review_reasons": review_reasons}),
    )
    .await?;

    let mut job_for_notify = job.clone();
    job_for_notify.state = terminal_state;
    let result = IngestResultPayload {
        job_id: job.id,
        state: terminal_state,
        success: true,
        document_id: Some(document.id),
        title: Some(document.title.clone()),
        category: Some(category.name.clone()),
        event_date: document.event_date.map(|d| d.to_string()),
        review_needed: !review_reasons.is_empty(),
        error_code: None,
        error_message: None,
        dashboard_url: Some(format!("{}/documents/{}", ctx.dashboard_base_url.trim_end_matches('/'), document.id)),
        actions: build_result_actions(&job_for_notify, None, &ctx.token_signer, &ctx.action_base_url, ctx.action_ttl_seconds, chrono::Utc::now()),
    };
    ctx.notifier
        .notify(&result)
        .await
        .map_err(|err| PipelineError::new(IngestErrorCode::NotifyCallbackFail, IngestStage::Published, err.to_string()))?;

    Ok(document.id)
}

/// Placeholder single-ruleset id until a multi-ruleset admin surface
/// exists — spec §1 scopes ruleset administration out, so every
/// classification run uses the one ruleset the Backfill Engine also
/// targets by default.
pub fn default_ruleset_id() -> Id {
    Id::from_uuid(uuid::Uuid::nil())
}

async fn fail_or_retry(ctx: &PipelineContext, job: &IngestJob, err: PipelineError) -> Result<(), sqlx::Error> {
    tracing::warn!(job_id = %job.id, stage = ?err.stage, code = ?err.code, error = %err.message, "ingest stage failed");

    // `record_failure` increments `attempt_count` itself; reason about the
    // count this failure will leave behind, not the pre-attempt count on
    // the in-memory `job`.
    let attempt_count_after = job.attempt_count + 1;
    let will_retry = retry::should_retry(attempt_count_after, job.max_attempts);
    let retry_after = if will_retry {
        Some(retry::compute_retry_after(attempt_count_after, ctx.retry_base_seconds, ctx.retry_max_seconds, chrono::Utc::now()))
    } else {
        None
    };

    // Once attempts are exhausted the job's own `last_error_code` records
    // that it was dead-lettered, not the stage error that triggered it —
    // the underlying code still lives in the ERROR/DEAD_LETTER event
    // payloads below.
    let stored_error_code = if will_retry { err.code } else { IngestErrorCode::DlqMaxAttempts };

    let updated = archive_sql::ingest_jobs::record_failure(&ctx.db, job.id, stored_error_code, &err.message, retry_after).await?;

    archive_sql::ingest_events::insert(
        &ctx.db,
        job.id,
        Some(job.state),
        updated.state,
        "ERROR",
        Some(&err.message),
        serde_json::json!({"error_code": err.code, "stage": format!("{:?}", err.stage)}),
    )
    .await?;

    if will_retry {
        let delay_seconds = retry::compute_backoff_seconds(attempt_count_after, ctx.retry_base_seconds, ctx.retry_max_seconds);
        archive_sql::ingest_events::insert(
            &ctx.db,
            job.id,
            Some(job.state),
            updated.state,
            "RETRY_SCHEDULED",
            Some("job failed, scheduled retry"),
            serde_json::json!({
                "attempt_count": attempt_count_after,
                "max_attempts": job.max_attempts,
                "delay_seconds": delay_seconds,
                "retry_after": retry_after,
            }),
        )
        .await?;
    } else {
        let dead_letter_payload = serde_json::json!({
            "attempt_count": attempt_count_after,
            "max_attempts": job.max_attempts,
            "reason": err.message.clone(),
            "last_error_code": stored_error_code,
        });

        archive_sql::ingest_events::insert(
            &ctx.db,
            job.id,
            Some(job.state),
            updated.state,
            "DEAD_LETTER",
            Some("max attempts exceeded; moved to dead-letter"),
            dead_letter_payload.clone(),
        )
        .await?;

        archive_sql::audit_log::record(&ctx.db, None, "INGEST_JOB_DEAD_LETTER", "ingest_job", job.id, None, Some(dead_letter_payload)).await?;
    }

    if !will_retry {
        let result = IngestResultPayload {
            job_id: job.id,
            state: IngestState::Failed,
            success: false,
            document_id: None,
            title: None,
            category: None,
            event_date: None,
            review_needed: false,
            error_code: Some(stored_error_code),
            error_message: Some(err.message.clone()),
            dashboard_url: None,
            actions: build_result_actions(&updated, Some(stored_error_code), &ctx.token_signer, &ctx.action_base_url, ctx.action_ttl_seconds, chrono::Utc::now()),
        };
        if let Err(notify_err) = ctx.notifier.notify(&result).await {
            tracing::warn!(job_id = %job.id, error = %notify_err, "failure notification itself failed");
        }
    }

    Ok(())
}
