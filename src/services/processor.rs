//! FileProcessor: the per-invocation workflow.
//!
//! fetch → size → credentials → metadata → result artifact → backup →
//! success notification. Any failure along the way ends in a single error
//! notification instead; a failure of that last publish is the only error
//! that leaves [`FileProcessor::handle`].

use crate::{
    config::AppConfig,
    errors::ProcessError,
    models::{
        event::{EventParseError, TriggerEvent},
        result::{InvocationResponse, ProcessingResult, size_in_kb},
    },
    services::{
        metadata_recorder::MetadataRecorder,
        notifier::{NotificationError, Notifier},
        object_store::ObjectStore,
        secret_store::CredentialProvider,
    },
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info};

const RESULT_CONTENT_TYPE: &str = "application/json";

/// Source of "now"; swapped for a fixed instant in tests.
pub type Clock = fn() -> DateTime<Utc>;

/// Process-wide service handles plus the deployment settings.
#[derive(Clone)]
pub struct FileProcessor {
    store: Arc<dyn ObjectStore>,
    credentials: CredentialProvider,
    recorder: MetadataRecorder,
    notifier: Notifier,
    config: AppConfig,
    clock: Clock,
}

impl FileProcessor {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        credentials: CredentialProvider,
        recorder: MetadataRecorder,
        notifier: Notifier,
        config: AppConfig,
    ) -> Self {
        Self {
            store,
            credentials,
            recorder,
            notifier,
            config,
            clock: Utc::now,
        }
    }

    #[cfg(test)]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Run one invocation for a raw trigger payload.
    ///
    /// Returns a 200 response on success and a 500 response once the failure
    /// notification went out. `Err` means that failure notification itself
    /// could not be published.
    #[tracing::instrument(skip_all)]
    pub async fn handle(
        &self,
        payload: serde_json::Value,
    ) -> Result<InvocationResponse, NotificationError> {
        let mut filename = None;

        let result = match self.process(payload, &mut filename).await {
            Ok(result) => result,
            Err(err) => self.report_failure(filename.as_deref(), err).await?,
        };

        Ok(response_for(&result))
    }

    /// Like [`FileProcessor::handle`], for a payload that has not been parsed
    /// yet. A body that is not JSON is a malformed trigger event.
    pub async fn handle_body(&self, body: &[u8]) -> Result<InvocationResponse, NotificationError> {
        match serde_json::from_slice(body) {
            Ok(payload) => self.handle(payload).await,
            Err(err) => {
                let err = ProcessError::from(EventParseError::NotJson(err.to_string()));
                let result = self.report_failure(None, err).await?;
                Ok(response_for(&result))
            }
        }
    }

    /// Turn a workflow failure into an error result and publish it.
    async fn report_failure(
        &self,
        filename: Option<&str>,
        err: ProcessError,
    ) -> Result<ProcessingResult, NotificationError> {
        error!(error = %err, filename = ?filename, "error processing file");
        let result = ProcessingResult::error(filename, err.to_string(), (self.clock)());
        self.notifier.notify(&result).await?;
        Ok(result)
    }

    /// The success path. `filename` is filled in as soon as the key is known
    /// so the error path can report it.
    async fn process(
        &self,
        payload: serde_json::Value,
        filename: &mut Option<String>,
    ) -> Result<ProcessingResult, ProcessError> {
        let event = TriggerEvent::from_payload(payload)?;
        *filename = Some(event.key.clone());
        info!(bucket = %event.bucket, key = %event.key, "processing file");

        let bytes = self.store.get(&event.bucket, &event.key).await?;
        let content = String::from_utf8(bytes.to_vec()).map_err(|source| ProcessError::Decode {
            key: event.key.clone(),
            source,
        })?;

        let file_size_kb = size_in_kb(content.len());
        info!(file_size_kb, "computed file size");

        let credentials = self
            .credentials
            .get_credentials(&self.config.db_secret_name)
            .await?;
        self.recorder.record(&credentials, &event.key).await?;

        let result = ProcessingResult::success(&event.key, file_size_kb);
        let result_key = result_key((self.clock)());
        let artifact = serde_json::to_vec_pretty(&result)?;
        self.store
            .put(
                &self.config.output_bucket,
                &result_key,
                Bytes::from(artifact),
                RESULT_CONTENT_TYPE,
            )
            .await?;
        info!(output_bucket = %self.config.output_bucket, result_key = %result_key, "wrote result");

        let backup_key = backup_key((self.clock)(), &event.key);
        self.store
            .copy(
                &event.bucket,
                &event.key,
                &self.config.backup_bucket,
                &backup_key,
            )
            .await?;
        info!(backup_bucket = %self.config.backup_bucket, backup_key = %backup_key, "backed up original");

        self.notifier.notify(&result).await?;

        Ok(result)
    }
}

/// `result_<YYYYMMDD_HHMMSS>.json`; two writes in the same second share a key.
pub fn result_key(at: DateTime<Utc>) -> String {
    format!("result_{}.json", at.format("%Y%m%d_%H%M%S"))
}

/// `backup/<YYYY-MM-DD_HH-MM-SS>_<original key>`.
pub fn backup_key(at: DateTime<Utc>, original_key: &str) -> String {
    format!("backup/{}_{}", at.format("%Y-%m-%d_%H-%M-%S"), original_key)
}

fn response_for(result: &ProcessingResult) -> InvocationResponse {
    InvocationResponse::from_result(result).unwrap_or_else(|err| {
        error!(error = %err, "could not encode processing result");
        InvocationResponse {
            status_code: if result.is_success() { 200 } else { 500 },
            body: String::new(),
        }
    })
}
