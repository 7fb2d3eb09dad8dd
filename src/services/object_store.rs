//! Object store access: read the uploaded file, write the result artifact,
//! and copy the original into the backup bucket.

use super::sdk_errors;
use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    error::{ProvideErrorMetadata, SdkError},
    primitives::ByteStream,
};
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("object `{key}` not found in bucket `{bucket}`")]
    NotFound { bucket: String, key: String },
    #[error("access denied to object `{key}` in bucket `{bucket}`")]
    AccessDenied { bucket: String, key: String },
    #[error("object store request for `{bucket}/{key}` failed: {message}")]
    Backend {
        bucket: String,
        key: String,
        message: String,
    },
}

pub type ObjectStoreResult<T> = Result<T, ObjectStoreError>;

/// The three object operations the processing workflow needs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read the full object body.
    async fn get(&self, bucket: &str, key: &str) -> ObjectStoreResult<Bytes>;

    /// Write `body` under `bucket/key` with the given content type.
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> ObjectStoreResult<()>;

    /// Server-side copy of `source_bucket/source_key` to `dest_bucket/dest_key`.
    async fn copy(
        &self,
        source_bucket: &str,
        source_key: &str,
        dest_bucket: &str,
        dest_key: &str,
    ) -> ObjectStoreResult<()>;
}

/// [`ObjectStore`] backed by Amazon S3.
#[derive(Clone, Debug)]
pub struct S3ObjectStore {
    inner: Client,
}

impl S3ObjectStore {
    pub fn new(inner: Client) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    #[tracing::instrument(skip(self))]
    async fn get(&self, bucket: &str, key: &str) -> ObjectStoreResult<Bytes> {
        let resp = self
            .inner
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| classify_sdk_error(err, bucket, key))?;

        let body = resp
            .body
            .collect()
            .await
            .map_err(|err| ObjectStoreError::Backend {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: format!("could not collect body: {err}"),
            })?;

        Ok(body.into_bytes())
    }

    #[tracing::instrument(skip(self, body), fields(len = body.len()))]
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> ObjectStoreResult<()> {
        self.inner
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|err| classify_sdk_error(err, bucket, key))?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn copy(
        &self,
        source_bucket: &str,
        source_key: &str,
        dest_bucket: &str,
        dest_key: &str,
    ) -> ObjectStoreResult<()> {
        self.inner
            .copy_object()
            .copy_source(copy_source(source_bucket, source_key))
            .bucket(dest_bucket)
            .key(dest_key)
            .send()
            .await
            .map_err(|err| classify_sdk_error(err, source_bucket, source_key))?;
        Ok(())
    }
}

/// Build the `x-amz-copy-source` value. Each key segment is percent-encoded;
/// the separators stay literal.
pub fn copy_source(bucket: &str, key: &str) -> String {
    let encoded_key = key
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    format!("{bucket}/{encoded_key}")
}

/// Map an SDK failure onto the store's error kinds by service error code.
fn classify_sdk_error<E, R>(err: SdkError<E, R>, bucket: &str, key: &str) -> ObjectStoreError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    match sdk_errors::service_code(&err) {
        Some("NoSuchKey" | "NoSuchBucket" | "NotFound") => ObjectStoreError::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        },
        Some("AccessDenied" | "AllAccessDisabled" | "Forbidden") => {
            ObjectStoreError::AccessDenied {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }
        }
        _ => ObjectStoreError::Backend {
            bucket: bucket.to_string(),
            key: key.to_string(),
            message: sdk_errors::describe(&err),
        },
    }
}
