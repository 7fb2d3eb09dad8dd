//! In-memory stand-ins for the external services, shared by the unit tests.

use super::{
    metadata_recorder::{MetadataConnection, MetadataConnector},
    notifier::{MAX_SUBJECT_LEN, NotificationError, Publisher},
    object_store::{ObjectStore, ObjectStoreError, ObjectStoreResult},
    secret_store::{SecretError, SecretStore},
};
use crate::models::{credentials::Credentials, metadata::NewFileMetadata};
use async_trait::async_trait;
use aws_sdk_s3::error::SdkError;
use aws_smithy_runtime_api::{client::orchestrator::HttpResponse, http::StatusCode};
use aws_smithy_types::{body::SdkBody, error::ErrorMetadata};
use bytes::Bytes;
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

pub fn test_credentials() -> Credentials {
    Credentials {
        host: "localhost".into(),
        dbname: "files".into(),
        username: "intake".into(),
        password: "pw".into(),
        port: 5432,
    }
}

pub const TEST_SECRET: &str =
    r#"{"host":"localhost","dbname":"files","username":"intake","password":"pw","port":5432}"#;

/// Service error metadata carrying `code`, as the SDK parses it from a
/// failed response.
pub fn error_metadata(code: &str) -> ErrorMetadata {
    ErrorMetadata::builder()
        .code(code)
        .message("rejected by the service")
        .build()
}

/// Wrap an operation error the way the SDK returns it for an HTTP `status`.
pub fn sdk_service_error<E>(error: E, status: u16) -> SdkError<E, HttpResponse> {
    let raw = HttpResponse::new(StatusCode::try_from(status).unwrap(), SdkBody::empty());
    SdkError::service_error(error, raw)
}

/// Every call made against [`FakeObjectStore`], in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Get {
        bucket: String,
        key: String,
    },
    Put {
        bucket: String,
        key: String,
        content_type: String,
    },
    Copy {
        source: String,
        dest: String,
    },
}

#[derive(Default)]
pub struct FakeObjectStore {
    objects: Mutex<HashMap<(String, String), Bytes>>,
    calls: Mutex<Vec<StoreCall>>,
    deny_puts: bool,
}

impl FakeObjectStore {
    pub fn with_object(bucket: &str, key: &str, body: impl Into<Bytes>) -> Self {
        let store = Self::default();
        store.insert(bucket, key, body);
        store
    }

    pub fn denying_puts(mut self) -> Self {
        self.deny_puts = true;
        self
    }

    pub fn insert(&self, bucket: &str, key: &str, body: impl Into<Bytes>) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), body.into());
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// Keys present in `bucket`, sorted.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        let mut keys: Vec<_> = self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for FakeObjectStore {
    async fn get(&self, bucket: &str, key: &str) -> ObjectStoreResult<Bytes> {
        self.calls.lock().unwrap().push(StoreCall::Get {
            bucket: bucket.into(),
            key: key.into(),
        });
        self.object(bucket, key)
            .ok_or_else(|| ObjectStoreError::NotFound {
                bucket: bucket.into(),
                key: key.into(),
            })
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> ObjectStoreResult<()> {
        self.calls.lock().unwrap().push(StoreCall::Put {
            bucket: bucket.into(),
            key: key.into(),
            content_type: content_type.into(),
        });
        if self.deny_puts {
            return Err(ObjectStoreError::AccessDenied {
                bucket: bucket.into(),
                key: key.into(),
            });
        }
        self.insert(bucket, key, body);
        Ok(())
    }

    async fn copy(
        &self,
        source_bucket: &str,
        source_key: &str,
        dest_bucket: &str,
        dest_key: &str,
    ) -> ObjectStoreResult<()> {
        self.calls.lock().unwrap().push(StoreCall::Copy {
            source: format!("{source_bucket}/{source_key}"),
            dest: format!("{dest_bucket}/{dest_key}"),
        });
        let body = self
            .object(source_bucket, source_key)
            .ok_or_else(|| ObjectStoreError::NotFound {
                bucket: source_bucket.into(),
                key: source_key.into(),
            })?;
        self.insert(dest_bucket, dest_key, body);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeSecretStore {
    secrets: HashMap<String, String>,
    deny: bool,
    lookups: AtomicUsize,
}

impl FakeSecretStore {
    pub fn with_secret(name: &str, value: &str) -> Self {
        Self {
            secrets: HashMap::from([(name.to_string(), value.to_string())]),
            ..Default::default()
        }
    }

    pub fn denying() -> Self {
        Self {
            deny: true,
            ..Default::default()
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretStore for FakeSecretStore {
    async fn get_secret_string(&self, secret_id: &str) -> Result<String, SecretError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.deny {
            return Err(SecretError::AccessDenied(secret_id.into()));
        }
        self.secrets
            .get(secret_id)
            .cloned()
            .ok_or_else(|| SecretError::NotFound(secret_id.into()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub topic_arn: String,
    pub subject: String,
    pub message: String,
}

/// Records publishes; can be told to fail all of them or only the ones
/// whose subject contains a marker. Like SNS, it rejects subjects with
/// control characters or over the length limit.
#[derive(Default)]
pub struct FakePublisher {
    published: Mutex<Vec<Published>>,
    fail_when_subject_contains: Option<&'static str>,
}

impl FakePublisher {
    pub fn failing() -> Self {
        Self::failing_on("")
    }

    pub fn failing_on(marker: &'static str) -> Self {
        Self {
            fail_when_subject_contains: Some(marker),
            ..Default::default()
        }
    }

    pub fn published(&self) -> Vec<Published> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher for FakePublisher {
    async fn publish(
        &self,
        topic_arn: &str,
        subject: &str,
        message: &str,
    ) -> Result<(), NotificationError> {
        if subject.chars().any(char::is_control) || subject.chars().count() > MAX_SUBJECT_LEN {
            return Err(NotificationError {
                topic_arn: topic_arn.into(),
                message: "InvalidParameter: Subject".into(),
            });
        }
        if let Some(marker) = self.fail_when_subject_contains {
            if subject.contains(marker) {
                return Err(NotificationError {
                    topic_arn: topic_arn.into(),
                    message: "topic does not exist".into(),
                });
            }
        }
        self.published.lock().unwrap().push(Published {
            topic_arn: topic_arn.into(),
            subject: subject.into(),
            message: message.into(),
        });
        Ok(())
    }
}

#[derive(Default)]
struct ConnectorState {
    opened: AtomicUsize,
    closed: AtomicUsize,
    rows: Mutex<Vec<NewFileMetadata>>,
}

/// Counts opened and closed connections and keeps inserted rows in memory.
#[derive(Default)]
pub struct FakeMetadataConnector {
    state: Arc<ConnectorState>,
    refuse_connect: bool,
    fail_store: bool,
    fail_close: bool,
}

impl FakeMetadataConnector {
    pub fn unreachable() -> Self {
        Self {
            refuse_connect: true,
            ..Default::default()
        }
    }

    pub fn failing_store() -> Self {
        Self {
            fail_store: true,
            ..Default::default()
        }
    }

    pub fn failing_close() -> Self {
        Self {
            fail_close: true,
            ..Default::default()
        }
    }

    pub fn opened(&self) -> usize {
        self.state.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.state.closed.load(Ordering::SeqCst)
    }

    pub fn rows(&self) -> Vec<NewFileMetadata> {
        self.state.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetadataConnector for FakeMetadataConnector {
    async fn connect(
        &self,
        _credentials: &Credentials,
    ) -> Result<Box<dyn MetadataConnection>, sqlx::Error> {
        if self.refuse_connect {
            return Err(sqlx::Error::PoolTimedOut);
        }
        self.state.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeConnection {
            state: self.state.clone(),
            fail_store: self.fail_store,
            fail_close: self.fail_close,
        }))
    }
}

struct FakeConnection {
    state: Arc<ConnectorState>,
    fail_store: bool,
    fail_close: bool,
}

#[async_trait]
impl MetadataConnection for FakeConnection {
    async fn store(&mut self, record: &NewFileMetadata) -> Result<(), sqlx::Error> {
        if self.fail_store {
            return Err(sqlx::Error::Protocol(
                "relation \"file_metadata\" is read-only".into(),
            ));
        }
        self.state.rows.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), sqlx::Error> {
        self.state.closed.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(sqlx::Error::WorkerCrashed);
        }
        Ok(())
    }
}
