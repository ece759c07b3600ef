use crate::payload::{ActionKind, ResultAction};
use archive_models::{IngestErrorCode, IngestJob, IngestState};
use archive_tokens::ActionTokenSigner;
use chrono::{DateTime, Utc};

/// The only source whose terminal notifications carry actionable buttons —
/// matches the partial-unique `(source_ref) WHERE source = 'telegram'`
/// constraint on `documents`/`ingest_jobs`.
pub const CHAT_BOT_SOURCE: &str = "telegram";

fn build_action_url(base_url: &str, job_id: uuid::Uuid, action: &str) -> String {
    format!("{}/ingest/actions/{job_id}/{action}", base_url.trim_end_matches('/'))
}

/// Builds the `retry`/`reprocess` buttons (and, for a missing temp file, a
/// `recover_upload` command) offered alongside a terminal FAILED or
/// NEEDS_REVIEW result for a chat-bot-sourced job.
pub fn build_result_actions(
    job: &IngestJob,
    error_code: Option<IngestErrorCode>,
    signer: &ActionTokenSigner,
    base_url: &str,
    ttl_seconds: i64,
    now: DateTime<Utc>,
) -> Vec<ResultAction> {
    if job.source != CHAT_BOT_SOURCE {
        return Vec::new();
    }
    if !matches!(job.state, IngestState::Failed | IngestState::NeedsReview) {
        return Vec::new();
    }

    let job_uuid = job.id.as_uuid();
    let (retry_token, retry_expires_at) = signer.issue(job_uuid, "retry", now, ttl_seconds);
    let (reprocess_token, reprocess_expires_at) = signer.issue(job_uuid, "reprocess", now, ttl_seconds);

    let mut actions = vec![
        ResultAction {
            kind: ActionKind::Button,
            action: "retry".into(),
            label: "Retry".into(),
            method: Some("POST".into()),
            url: Some(build_action_url(base_url, job_uuid, "retry")),
            token: Some(retry_token),
            expires_at: Some(retry_expires_at),
            command: None,
            payload: serde_json::json!({"clear_error": true}),
        },
        ResultAction {
            kind: ActionKind::Button,
            action: "reprocess".into(),
            label: "Reprocess".into(),
            method: Some("POST".into()),
            url: Some(build_action_url(base_url, job_uuid, "reprocess")),
            token: Some(reprocess_token),
            expires_at: Some(reprocess_expires_at),
            command: None,
            payload: serde_json::json!({"reset_attempts": true, "clear_error": true}),
        },
    ];

    if error_code == Some(IngestErrorCode::StorageTempFileMissing) {
        actions.push(ResultAction {
            kind: ActionKind::Command,
            action: "recover_upload".into(),
            label: "Re-upload file".into(),
            method: None,
            url: None,
            token: None,
            expires_at: None,
            command: Some(format!("/recover_upload {}", job.id)),
            payload: serde_json::json!({"reason": IngestErrorCode::StorageTempFileMissing.as_str()}),
        });
    }

    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use archive_models::Id;

    fn sample_job(source: &str, state: IngestState) -> IngestJob {
        IngestJob {
            id: Id::generate(),
            source: source.into(),
            source_ref: None,
            state,
            file_path_temp: None,
            caption: None,
            payload: serde_json::json!({}),
            document_id: None,
            attempt_count: 0,
            max_attempts: 5,
            retry_after: None,
            last_error_code: None,
            last_error_message: None,
            received_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    #[test]
    fn non_chat_bot_source_gets_no_actions() {
        let job = sample_job("upload", IngestState::Failed);
        let signer = ActionTokenSigner::new(b"secret".to_vec());
        let actions = build_result_actions(&job, None, &signer, "https://api.example.com", 86400, Utc::now());
        assert!(actions.is_empty());
    }

    #[test]
    fn non_terminal_state_gets_no_actions() {
        let job = sample_job(CHAT_BOT_SOURCE, IngestState::Classified);
        let signer = ActionTokenSigner::new(b"secret".to_vec());
        let actions = build_result_actions(&job, None, &signer, "https://api.example.com", 86400, Utc::now());
        assert!(actions.is_empty());
    }

    #[test]
    fn failed_chat_bot_job_gets_retry_and_reprocess() {
        let job = sample_job(CHAT_BOT_SOURCE, IngestState::Failed);
        let signer = ActionTokenSigner::new(b"secret".to_vec());
        let actions = build_result_actions(&job, None, &signer, "https://api.example.com", 86400, Utc::now());
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].action, "retry");
        assert_eq!(actions[1].action, "reprocess");
    }

    #[test]
    fn missing_temp_file_adds_recover_command() {
        let job = sample_job(CHAT_BOT_SOURCE, IngestState::Failed);
        let signer = ActionTokenSigner::new(b"secret".to_vec());
        let actions = build_result_actions(
            &job,
            Some(IngestErrorCode::StorageTempFileMissing),
            &signer,
            "https://api.example.com",
            86400,
            Utc::now(),
        );
        assert_eq!(actions.len(), 3);
        assert_eq!(actions[2].action, "recover_upload");
        assert_eq!(actions[2].kind, ActionKind::Command);
    }
}
