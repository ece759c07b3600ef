use archive_models::{Id, IngestErrorCode, IngestState};
use chrono::{DateTime, Utc};

/// One HMAC-signed action offered back to the producer alongside a
/// terminal FAILED/NEEDS_REVIEW result — a retry/reprocess button, or an
/// out-of-band `recover_upload` command when the temp file is gone.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ResultAction {
    pub kind: ActionKind,
    pub action: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Button,
    Command,
}

/// The JSON body posted back to the producer's callback URL, per spec §6.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct IngestResultPayload {
    pub job_id: Id,
    pub state: IngestState,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_date: Option<String>,
    pub review_needed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<IngestErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dashboard_url: Option<String>,
    #[serde(default)]
    pub actions: Vec<ResultAction>,
}
