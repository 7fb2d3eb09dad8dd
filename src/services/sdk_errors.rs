//! Reading AWS SDK failures. The S3, SNS and Secrets Manager clients share
//! the same `SdkError` type, so one set of helpers serves all three.

use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use std::{error::Error, fmt::Debug};

/// Error code reported by the service, if the request got that far.
pub fn service_code<E, R>(err: &SdkError<E, R>) -> Option<&str>
where
    E: ProvideErrorMetadata,
{
    err.as_service_error().and_then(|e| e.code())
}

/// Short operator-facing description of an SDK failure.
///
/// Service errors render as `<code>: <message>` and never include the raw
/// HTTP response. Transport and timeout failures render their source chain
/// joined with `: `.
pub fn describe<E, R>(err: &SdkError<E, R>) -> String
where
    E: ProvideErrorMetadata + Error + Send + Sync + 'static,
    R: Debug + Send + Sync + 'static,
{
    match err.as_service_error() {
        Some(service) => match (service.code(), service.message()) {
            (Some(code), Some(message)) => format!("{code}: {message}"),
            (Some(code), None) => code.to_string(),
            (None, Some(message)) => message.to_string(),
            (None, None) => service.to_string(),
        },
        None => {
            let mut text = err.to_string();
            let mut source = err.source();
            while let Some(cause) = source {
                text.push_str(": ");
                text.push_str(&cause.to_string());
                source = cause.source();
            }
            text
        }
    }
}
