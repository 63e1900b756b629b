use std::sync::Arc;

use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use futures::future::BoxFuture;

use super::error_mapping::{map_get_object_error, map_put_object_error};
use super::types::{StageError, StageErrorKind};

/// Stores and fetches staged payloads by key.
///
/// The trait mirrors exactly what the pipeline needs from the staging bucket, so the
/// executors can run against an in-memory store in tests.
pub trait BlobStore: Send + Sync {
    fn put_blob<'a>(
        &'a self,
        key: &'a str,
        payload: Vec<u8>,
        content_type: &'a str,
    ) -> BoxFuture<'a, Result<(), StageError>>;

    fn get_blob<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Vec<u8>, StageError>>;
}

impl<T> BlobStore for Arc<T>
where
    T: BlobStore + ?Sized,
{
    fn put_blob<'a>(
        &'a self,
        key: &'a str,
        payload: Vec<u8>,
        content_type: &'a str,
    ) -> BoxFuture<'a, Result<(), StageError>> {
        (**self).put_blob(key, payload, content_type)
    }

    fn get_blob<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Vec<u8>, StageError>> {
        (**self).get_blob(key)
    }
}

/// S3-backed blob store used by both production workers.
pub struct S3BlobStore {
    client: Client,
    bucket: String,
}

impl S3BlobStore {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

impl BlobStore for S3BlobStore {
    fn put_blob<'a>(
        &'a self,
        key: &'a str,
        payload: Vec<u8>,
        content_type: &'a str,
    ) -> BoxFuture<'a, Result<(), StageError>> {
        Box::pin(async move {
            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(key)
                .content_type(content_type)
                .body(ByteStream::from(payload))
                .send()
                .await
                .map_err(|err| map_put_object_error(err, key))?;

            Ok(())
        })
    }

    fn get_blob<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Vec<u8>, StageError>> {
        Box::pin(async move {
            let output = self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(key)
                .send()
                .await
                .map_err(|err| map_get_object_error(err, key))?;

            let bytes = output.body.collect().await.map_err(|err| {
                StageError::new(
                    StageErrorKind::Network,
                    format!("failed to read staged payload body for {key}: {err}"),
                )
            })?;

            Ok(bytes.into_bytes().to_vec())
        })
    }
}
