use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

use crate::backend::{ByteStream, ContentBackend, READ_CHUNK_BYTES};
use crate::error::ContentStoreError;

/// Stores objects under a root directory, keyed by the caller's
/// `storage_key` (already bucketized by checksum prefix). Writes land at a
/// `.uploading` temp path first, then are renamed into place, so a reader
/// racing a writer never observes a partial file.
#[derive(Debug, Clone)]
pub struct DiskBackend {
    root: PathBuf,
}

impl DiskBackend {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_owned(),
        }
    }

    fn resolve(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl ContentBackend for DiskBackend {
    async fn put(&self, key: &str, data: Bytes) -> Result<(), ContentStoreError> {
        let dest = self.resolve(key);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = dest.with_extension(format!(
            "{}.uploading",
            dest.extension().and_then(|e| e.to_str()).unwrap_or_default()
        ));
        tokio::fs::write(&tmp, &data).await?;
        tokio::fs::rename(&tmp, &dest).await?;
        Ok(())
    }

    async fn get_stream(&self, key: &str) -> Result<ByteStream, ContentStoreError> {
        let path = self.resolve(key);
        let file = tokio::fs::File::open(&path).await.map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                ContentStoreError::NotFound(key.to_owned())
            } else {
                ContentStoreError::Io(err)
            }
        })?;

        let chunks = stream::unfold(Some(file), move |state| async move {
            let mut file = state?;
            let mut buf = vec![0u8; READ_CHUNK_BYTES];
            match file.read(&mut buf).await {
                Ok(0) => None,
                Ok(n) => {
                    buf.truncate(n);
                    Some((Ok(Bytes::from(buf)), Some(file)))
                }
                Err(err) => Some((Err(err), None)),
            }
        });
        Ok(Box::pin(chunks))
    }

    async fn exists(&self, key: &str) -> Result<bool, ContentStoreError> {
        Ok(tokio::fs::try_exists(self.resolve(key)).await?)
    }

    async fn delete(&self, key: &str) -> Result<(), ContentStoreError> {
        match tokio::fs::remove_file(self.resolve(key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_round_trips_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let backend = DiskBackend::new(dir.path());
        backend.put("ab/cd/abcd.pdf", Bytes::from_static(b"hello world")).await.unwrap();
        assert!(backend.exists("ab/cd/abcd.pdf").await.unwrap());

        let mut stream = backend.get_stream("ab/cd/abcd.pdf").await.unwrap();
        let mut collected = Vec::new();
        use futures::StreamExt;
        while let Some(chunk) = stream.next().await {
            collected.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(collected, b"hello world");
    }

    #[tokio::test]
    async fn get_missing_key_returns_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let backend = DiskBackend::new(dir.path());
        let err = match backend.get_stream("missing/key.pdf").await {
            Ok(_) => panic!("expected error"),
            Err(err) => err,
        };
        assert!(matches!(err, ContentStoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_is_idempotent_for_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let backend = DiskBackend::new(dir.path());
        backend.delete("never/written.pdf").await.unwrap();
    }
}
