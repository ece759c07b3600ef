use std::fmt;

/// Stage names used both for the state machine's `state` column and for
/// classifying exceptions raised mid-pipeline. Mirrors the
/// `RECEIVED..FAILED` state graph; `PUBLISHED` doubles as "the notify step
/// that runs after a terminal state is reached".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStage {
    Stored,
    Extracted,
    Classified,
    Indexed,
    Published,
}

/// IngestErrorCode is the closed taxonomy of codes from which
/// `IngestJob.last_error_code` is drawn. Stored as text so the taxonomy can
/// grow without a migration, decoded back into this enum for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, serde::Serialize, serde::Deserialize)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IngestErrorCode {
    StorageTempFileMissing,
    StorageReadFail,
    StorageWriteFail,
    CaptionParseFail,
    SummaryExtractFail,
    RuleClassifyFail,
    DbWriteFail,
    NotifyCallbackFail,
    DlqMaxAttempts,
    PipelineUnexpected,
}

impl IngestErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestErrorCode::StorageTempFileMissing => "STORAGE_TEMP_FILE_MISSING",
            IngestErrorCode::StorageReadFail => "STORAGE_READ_FAIL",
            IngestErrorCode::StorageWriteFail => "STORAGE_WRITE_FAIL",
            IngestErrorCode::CaptionParseFail => "CAPTION_PARSE_FAIL",
            IngestErrorCode::SummaryExtractFail => "SUMMARY_EXTRACT_FAIL",
            IngestErrorCode::RuleClassifyFail => "RULE_CLASSIFY_FAIL",
            IngestErrorCode::DbWriteFail => "DB_WRITE_FAIL",
            IngestErrorCode::NotifyCallbackFail => "NOTIFY_CALLBACK_FAIL",
            IngestErrorCode::DlqMaxAttempts => "DLQ_MAX_ATTEMPTS",
            IngestErrorCode::PipelineUnexpected => "PIPELINE_UNEXPECTED",
        }
    }

    /// Classifies a stage failure the way `original_source`'s
    /// `classify_exception_for_stage` did: mostly a function of which stage
    /// failed, with the storage stage further split by the kind of I/O
    /// error observed.
    pub fn classify_storage_error(kind: std::io::ErrorKind) -> Self {
        match kind {
            std::io::ErrorKind::NotFound => IngestErrorCode::StorageTempFileMissing,
            std::io::ErrorKind::PermissionDenied => IngestErrorCode::StorageReadFail,
            _ => IngestErrorCode::StorageWriteFail,
        }
    }

    pub fn for_stage(stage: IngestStage) -> Self {
        match stage {
            IngestStage::Stored => IngestErrorCode::StorageWriteFail,
            IngestStage::Extracted => IngestErrorCode::CaptionParseFail,
            IngestStage::Classified => IngestErrorCode::RuleClassifyFail,
            IngestStage::Indexed => IngestErrorCode::DbWriteFail,
            IngestStage::Published => IngestErrorCode::NotifyCallbackFail,
        }
    }
}

impl fmt::Display for IngestErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_mapping_matches_spec_taxonomy() {
        assert_eq!(
            IngestErrorCode::for_stage(IngestStage::Extracted),
            IngestErrorCode::CaptionParseFail
        );
        assert_eq!(
            IngestErrorCode::for_stage(IngestStage::Published),
            IngestErrorCode::NotifyCallbackFail
        );
    }

    #[test]
    fn storage_error_kind_splits_missing_from_denied() {
        assert_eq!(
            IngestErrorCode::classify_storage_error(std::io::ErrorKind::NotFound),
            IngestErrorCode::StorageTempFileMissing
        );
        assert_eq!(
            IngestErrorCode::classify_storage_error(std::io::ErrorKind::PermissionDenied),
            IngestErrorCode::StorageReadFail
        );
        assert_eq!(
            IngestErrorCode::classify_storage_error(std::io::ErrorKind::Other),
            IngestErrorCode::StorageWriteFail
        );
    }
}
