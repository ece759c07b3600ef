mod entities;
mod error_code;
mod id;
mod review;

pub use entities::{
    slugify, storage_key, AuditLog, Category, Document, DocumentFile, DocumentTag,
    DocumentVersion, File, IngestEvent, IngestJob, IngestState, IngestUpload, JsonObject,
    RuleVersion, StorageBackend, Tag,
};
pub use error_code::{IngestErrorCode, IngestStage};
pub use id::Id;
pub use review::{ReviewReason, ReviewStatus};
