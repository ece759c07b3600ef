use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use std::fmt::Debug;

use crate::error::ContentStoreError;

pub type ByteStream = BoxStream<'static, std::io::Result<Bytes>>;

/// Storage-backend-agnostic object put/get/delete, selected at construction
/// time from `ArchiveConfig::storage_backend`. Both implementations must
/// make `put` atomic: readers never observe a partially written object.
#[async_trait]
pub trait ContentBackend: Debug + Send + Sync {
    async fn put(&self, key: &str, data: Bytes) -> Result<(), ContentStoreError>;

    /// Streams the object in chunks of at most 64 KiB.
    async fn get_stream(&self, key: &str) -> Result<ByteStream, ContentStoreError>;

    async fn exists(&self, key: &str) -> Result<bool, ContentStoreError>;

    async fn delete(&self, key: &str) -> Result<(), ContentStoreError>;
}

pub const READ_CHUNK_BYTES: usize = 64 * 1024;
pub const WRITE_CHUNK_BYTES: usize = 1024 * 1024;
