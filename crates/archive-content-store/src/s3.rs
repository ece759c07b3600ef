use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream as SdkByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use futures::stream;

use crate::backend::{ByteStream, ContentBackend, READ_CHUNK_BYTES};
use crate::error::ContentStoreError;

/// Stores objects in a single S3-compatible bucket, keyed by the caller's
/// `storage_key`. `put_object` is itself atomic on S3 and S3-compatible
/// stores (no partial object is ever visible to a concurrent `get_object`),
/// so unlike [`crate::disk::DiskBackend`] no temp-then-rename dance is
/// needed here.
#[derive(Debug, Clone)]
pub struct S3Backend {
    client: Client,
    bucket: String,
}

impl S3Backend {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    pub async fn from_env(bucket: impl Into<String>) -> Self {
        let config = aws_config::load_from_env().await;
        Self::new(Client::new(&config), bucket)
    }
}

fn map_sdk_err<E: std::fmt::Display>(err: E) -> ContentStoreError {
    ContentStoreError::ObjectStore(err.to_string())
}

#[async_trait]
impl ContentBackend for S3Backend {
    async fn put(&self, key: &str, data: Bytes) -> Result<(), ContentStoreError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(SdkByteStream::from(data))
            .send()
            .await
            .map_err(map_sdk_err)?;
        Ok(())
    }

    async fn get_stream(&self, key: &str) -> Result<ByteStream, ContentStoreError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| {
                if err.as_service_error().map(|e| e.is_no_such_key()).unwrap_or(false) {
                    ContentStoreError::NotFound(key.to_owned())
                } else {
                    map_sdk_err(err)
                }
            })?;

        let body = output.body;
        let chunks = stream::unfold(Some(body), move |state| async move {
            let mut body = state?;
            match body.next().await {
                Some(Ok(bytes)) => Some((Ok(bytes), Some(body))),
                Some(Err(err)) => Some((
                    Err(std::io::Error::new(std::io::ErrorKind::Other, err.to_string())),
                    None,
                )),
                None => None,
            }
        });
        let _ = READ_CHUNK_BYTES;
        Ok(Box::pin(chunks))
    }

    async fn exists(&self, key: &str) -> Result<bool, ContentStoreError> {
        match self.client.head_object().bucket(&self.bucket).key(key).send().await {
            Ok(_) => Ok(true),
            Err(err) => {
                if err
                    .as_service_error()
                    .map(|e| e.is_not_found())
                    .unwrap_or(false)
                {
                    Ok(false)
                } else {
                    Err(map_sdk_err(err))
                }
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<(), ContentStoreError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(map_sdk_err)?;
        Ok(())
    }
}
