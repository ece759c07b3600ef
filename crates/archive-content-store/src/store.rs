use bytes::Bytes;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use archive_models::storage_key;

use crate::backend::ContentBackend;
use crate::error::ContentStoreError;

/// The outcome of writing bytes to the content store, per spec §4.1:
/// `put_bytes` returns whether this checksum was already present so the
/// caller can derive `DUPLICATE_SUSPECT` review reasons upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutOutcome {
    pub checksum_sha256: String,
    pub storage_key: String,
    pub size_bytes: i64,
    pub already_existed: bool,
}

/// Content-addressed object store: hashes incoming bytes, skips the write
/// if that checksum's object already exists, and otherwise writes it
/// through the configured [`ContentBackend`]. Callers are responsible for
/// the `File` row insert — this type owns only backend bytes, not catalog
/// metadata.
#[derive(Clone)]
pub struct ContentStore {
    backend: Arc<dyn ContentBackend>,
}

impl ContentStore {
    pub fn new(backend: Arc<dyn ContentBackend>) -> Self {
        Self { backend }
    }

    /// Computes `sha256(bytes)`, derives the bucketized storage key, and
    /// writes the object unless one with that checksum is already present.
    pub async fn put_bytes(
        &self,
        bytes: &[u8],
        extension: Option<&str>,
    ) -> Result<PutOutcome, ContentStoreError> {
        let checksum_sha256 = hex::encode(Sha256::digest(bytes));
        let key = storage_key(&checksum_sha256, extension);

        let already_existed = self.backend.exists(&key).await?;
        if !already_existed {
            self.backend.put(&key, Bytes::copy_from_slice(bytes)).await?;
        } else {
            tracing::debug!(checksum = %checksum_sha256, "content store dedup hit");
        }

        Ok(PutOutcome {
            checksum_sha256,
            storage_key: key,
            size_bytes: bytes.len() as i64,
            already_existed,
        })
    }

    pub async fn get_stream(&self, storage_key: &str) -> Result<crate::backend::ByteStream, ContentStoreError> {
        self.backend.get_stream(storage_key).await
    }

    pub async fn exists(&self, storage_key: &str) -> Result<bool, ContentStoreError> {
        self.backend.exists(storage_key).await
    }

    /// Deletes an object. Callers must have already verified no DocumentFile
    /// references it (spec §3: orphan sweep only).
    pub async fn delete(&self, storage_key: &str) -> Result<(), ContentStoreError> {
        self.backend.delete(storage_key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::DiskBackend;

    #[tokio::test]
    async fn put_bytes_is_idempotent_by_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(Arc::new(DiskBackend::new(dir.path())));

        let first = store.put_bytes(b"same content", Some("pdf")).await.unwrap();
        assert!(!first.already_existed);

        let second = store.put_bytes(b"same content", Some("pdf")).await.unwrap();
        assert!(second.already_existed);
        assert_eq!(first.checksum_sha256, second.checksum_sha256);
        assert_eq!(first.storage_key, second.storage_key);
    }

    #[tokio::test]
    async fn different_content_gets_distinct_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(Arc::new(DiskBackend::new(dir.path())));

        let a = store.put_bytes(b"content a", Some("pdf")).await.unwrap();
        let b = store.put_bytes(b"content b", Some("pdf")).await.unwrap();
        assert_ne!(a.checksum_sha256, b.checksum_sha256);
        assert_ne!(a.storage_key, b.storage_key);
    }
}
