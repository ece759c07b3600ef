use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

use crate::error_code::IngestErrorCode;
use crate::id::Id;
use crate::review::{ReviewReason, ReviewStatus};

/// JsonObject is the boundary type for the free-form maps the spec calls
/// out (`metadata`, `payload`). Kept as an explicit alias rather than a
/// wrapper type since every caller already speaks `serde_json`.
pub type JsonObject = serde_json::Map<String, JsonValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, serde::Serialize, serde::Deserialize)]
#[sqlx(type_name = "storage_backend", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Disk,
    ObjectStore,
}

/// File is the content-addressed blob record. `storage_key` and
/// `checksum_sha256` are immutable once written — see
/// [`crate::storage_key`] for the derivation function.
#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize, serde::Deserialize)]
pub struct File {
    pub id: Id,
    pub checksum_sha256: String,
    pub storage_backend: StorageBackend,
    pub bucket: Option<String>,
    pub storage_key: String,
    pub original_filename: String,
    pub mime_type: Option<String>,
    pub size_bytes: i64,
    pub extension: Option<String>,
    pub metadata: JsonValue,
    pub source: String,
    pub source_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Derives the deterministic storage key for a checksum, bucketizing by the
/// first two 2-char prefixes of the hash so no directory holds more than a
/// couple hundred entries per million objects.
pub fn storage_key(checksum_sha256: &str, extension: Option<&str>) -> String {
    let a = &checksum_sha256[0..2];
    let b = &checksum_sha256[2..4];
    match extension {
        Some(ext) if !ext.is_empty() => format!("{a}/{b}/{checksum_sha256}.{ext}"),
        _ => format!("{a}/{b}/{checksum_sha256}"),
    }
}

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize, serde::Deserialize)]
pub struct Category {
    pub id: Id,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize, serde::Deserialize)]
pub struct Tag {
    pub id: Id,
    pub name: String,
    pub slug: String,
}

/// Normalizes a tag/category display name into its idempotency key:
/// lowercase, whitespace collapsed, spaces become hyphens.
pub fn slugify(name: &str) -> String {
    let collapsed: String = name
        .trim()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    collapsed.to_lowercase().replace(' ', "-")
}

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize, serde::Deserialize)]
pub struct Document {
    pub id: Id,
    pub source: String,
    pub source_ref: Option<String>,
    pub title: String,
    pub description: String,
    pub caption_raw: String,
    pub summary: String,
    pub category_id: Option<Id>,
    pub event_date: Option<NaiveDate>,
    pub ingested_at: DateTime<Utc>,
    pub review_status: ReviewStatus,
    pub review_reasons: sqlx::types::Json<Vec<ReviewReason>>,
    pub current_version_no: i32,
}

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize, serde::Deserialize)]
pub struct DocumentVersion {
    pub document_id: Id,
    pub version_no: i32,
    pub title: String,
    pub description: String,
    pub summary: String,
    pub category_id: Option<Id>,
    pub event_date: Option<NaiveDate>,
    pub tags_snapshot: sqlx::types::Json<Vec<String>>,
    pub change_reason: String,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize, serde::Deserialize)]
pub struct DocumentFile {
    pub document_id: Id,
    pub file_id: Id,
    pub is_primary: bool,
}

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize, serde::Deserialize)]
pub struct DocumentTag {
    pub document_id: Id,
    pub tag_id: Id,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, serde::Serialize, serde::Deserialize)]
#[sqlx(type_name = "ingest_state", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IngestState {
    Received,
    Stored,
    Extracted,
    Classified,
    Indexed,
    Published,
    NeedsReview,
    Failed,
}

impl IngestState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            IngestState::Published | IngestState::NeedsReview | IngestState::Failed
        )
    }
}

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize, serde::Deserialize)]
pub struct IngestJob {
    pub id: Id,
    pub source: String,
    pub source_ref: Option<String>,
    pub state: IngestState,
    pub file_path_temp: Option<String>,
    pub caption: Option<String>,
    pub payload: JsonValue,
    pub document_id: Option<Id>,
    pub attempt_count: i32,
    pub max_attempts: i32,
    pub retry_after: Option<DateTime<Utc>>,
    pub last_error_code: Option<IngestErrorCode>,
    pub last_error_message: Option<String>,
    pub received_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl IngestJob {
    pub const DEFAULT_MAX_ATTEMPTS: i32 = 5;
}

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize, serde::Deserialize)]
pub struct IngestEvent {
    pub id: Id,
    pub job_id: Id,
    pub from_state: Option<IngestState>,
    pub to_state: IngestState,
    pub event_type: String,
    pub event_message: Option<String>,
    pub event_payload: JsonValue,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize, serde::Deserialize)]
pub struct RuleVersion {
    pub ruleset_id: Id,
    pub version_no: i32,
    pub rules: JsonValue,
    pub checksum_sha256: String,
    pub published_at: DateTime<Utc>,
    pub is_active: bool,
}

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize, serde::Deserialize)]
pub struct AuditLog {
    pub id: Id,
    pub actor: Option<String>,
    pub action: String,
    pub target_type: String,
    pub target_id: Id,
    pub before_json: Option<JsonValue>,
    pub after_json: Option<JsonValue>,
    pub occurred_at: DateTime<Utc>,
}

/// The inputs a producer uploads with one file, carried from the HTTP
/// boundary through to the ingest pipeline. `metadata` holds
/// source-specific fields (`message_id`, `chat_id`, `sent_at`, ...).
#[derive(Debug, Clone)]
pub struct IngestUpload {
    pub source: String,
    pub source_ref: Option<String>,
    pub caption: Option<String>,
    pub original_filename: String,
    pub metadata: BTreeMap<String, JsonValue>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_key_is_bucketized_by_hash_prefix() {
        let sha = "ab12cd34ef56";
        assert_eq!(storage_key(sha, Some("pdf")), "ab/12/ab12cd34ef56.pdf");
        assert_eq!(storage_key(sha, None), "ab/12/ab12cd34ef56");
    }

    #[test]
    fn slugify_collapses_whitespace_and_lowercases() {
        assert_eq!(slugify("  Weekly   Meeting  "), "weekly-meeting");
        assert_eq!(slugify("회의"), "회의");
    }
}
