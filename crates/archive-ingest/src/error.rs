use archive_models::{IngestErrorCode, IngestStage};

/// A stage-classified failure raised mid-pipeline — carries exactly the
/// `(code, stage, message)` triple the original's `IngestPipelineError`
/// did, so `_fail_job`'s bookkeeping never has to re-derive a code from a
/// generic error.
#[derive(Debug)]
pub struct PipelineError {
    pub code: IngestErrorCode,
    pub stage: IngestStage,
    pub message: String,
}

impl PipelineError {
    pub fn new(code: IngestErrorCode, stage: IngestStage, message: impl Into<String>) -> Self {
        Self {
            code,
            stage,
            message: message.into(),
        }
    }

    pub fn storage(kind: std::io::ErrorKind, message: impl Into<String>) -> Self {
        Self::new(IngestErrorCode::classify_storage_error(kind), IngestStage::Stored, message)
    }
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.stage, self.message)
    }
}

impl std::error::Error for PipelineError {}

impl From<archive_content_store::ContentStoreError> for PipelineError {
    fn from(err: archive_content_store::ContentStoreError) -> Self {
        let code = match &err {
            archive_content_store::ContentStoreError::NotFound(_) => IngestErrorCode::StorageTempFileMissing,
            _ => IngestErrorCode::StorageWriteFail,
        };
        PipelineError::new(code, IngestStage::Stored, err.to_string())
    }
}

impl From<sqlx::Error> for PipelineError {
    fn from(err: sqlx::Error) -> Self {
        PipelineError::new(IngestErrorCode::DbWriteFail, IngestStage::Indexed, err.to_string())
    }
}
