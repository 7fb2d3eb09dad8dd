//! Human-readable success/failure notifications published to a topic.

use super::sdk_errors;
use crate::models::result::ProcessingResult;
use async_trait::async_trait;
use aws_sdk_sns::Client;
use std::sync::Arc;
use thiserror::Error;

/// Longest subject the pub/sub service accepts.
pub const MAX_SUBJECT_LEN: usize = 100;

#[derive(Debug, Error)]
#[error("failed to publish notification to `{topic_arn}`: {message}")]
pub struct NotificationError {
    pub topic_arn: String,
    pub message: String,
}

/// Publishes plain-text messages to a topic.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(
        &self,
        topic_arn: &str,
        subject: &str,
        message: &str,
    ) -> Result<(), NotificationError>;
}

/// [`Publisher`] backed by Amazon SNS.
#[derive(Clone, Debug)]
pub struct SnsPublisher {
    inner: Client,
}

impl SnsPublisher {
    pub fn new(inner: Client) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Publisher for SnsPublisher {
    #[tracing::instrument(skip(self, message))]
    async fn publish(
        &self,
        topic_arn: &str,
        subject: &str,
        message: &str,
    ) -> Result<(), NotificationError> {
        self.inner
            .publish()
            .topic_arn(topic_arn)
            .subject(subject)
            .message(message)
            .send()
            .await
            .map_err(|err| NotificationError {
                topic_arn: topic_arn.to_string(),
                message: sdk_errors::describe(&err),
            })?;
        Ok(())
    }
}

/// A rendered notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub message: String,
}

impl Notification {
    /// Pick the success or failure template from the result variant.
    pub fn render(result: &ProcessingResult) -> Self {
        match result {
            ProcessingResult::Success(ok) => Self {
                subject: subject_line(format!("CSV Processing Success - {}", ok.filename)),
                message: format!(
                    "File processing completed successfully.\n\n\
                     Filename: {}\n\
                     File Size (KB): {}\n\
                     Status: success\n",
                    ok.filename,
                    format_kb(ok.file_size_kb),
                ),
            },
            ProcessingResult::Error(failed) => Self {
                subject: subject_line(format!("CSV Processing Error - {}", failed.filename)),
                message: format!(
                    "File processing failed.\n\n\
                     Filename: {}\n\
                     Error: {}\n\
                     Processed At: {}\n\
                     Status: error\n",
                    failed.filename, failed.error, failed.processed_at,
                ),
            },
        }
    }
}

/// Sends processing outcomes to the configured topic.
#[derive(Clone)]
pub struct Notifier {
    publisher: Arc<dyn Publisher>,
    topic_arn: String,
}

impl Notifier {
    pub fn new(publisher: Arc<dyn Publisher>, topic_arn: impl Into<String>) -> Self {
        Self {
            publisher,
            topic_arn: topic_arn.into(),
        }
    }

    /// Publish the notification for `result`. Delivery is not awaited beyond
    /// the publish call itself.
    #[tracing::instrument(skip(self, result), fields(filename = result.filename(), success = result.is_success()))]
    pub async fn notify(&self, result: &ProcessingResult) -> Result<(), NotificationError> {
        let notification = Notification::render(result);
        self.publisher
            .publish(&self.topic_arn, &notification.subject, &notification.message)
            .await?;
        tracing::info!(subject = %notification.subject, "notification sent");
        Ok(())
    }
}

/// Whole numbers keep one decimal (`0.0`, `2.0`) to match the JSON rendering.
fn format_kb(kb: f64) -> String {
    if kb.fract() == 0.0 {
        format!("{kb:.1}")
    } else {
        kb.to_string()
    }
}

/// SNS rejects subjects with line breaks or other control characters, and
/// object keys may contain them. Replace those with spaces, then truncate.
fn subject_line(subject: String) -> String {
    subject
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .take(MAX_SUBJECT_LEN)
        .collect()
}
