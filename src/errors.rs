use crate::{
    models::event::EventParseError,
    services::{
        notifier::NotificationError, object_store::ObjectStoreError, secret_store::SecretError,
    },
};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::{fmt, string::FromUtf8Error};
use thiserror::Error;

/// Any failure inside the processing workflow. Each one is turned into an
/// error result and a failure notification by the processor.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error(transparent)]
    EventParse(#[from] EventParseError),
    #[error(transparent)]
    ObjectStore(#[from] ObjectStoreError),
    #[error("object `{key}` is not valid UTF-8: {source}")]
    Decode {
        key: String,
        #[source]
        source: FromUtf8Error,
    },
    #[error(transparent)]
    Secret(#[from] SecretError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Notification(#[from] NotificationError),
    #[error("could not encode processing result: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A lightweight wrapper for invocation failures surfaced over HTTP.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<NotificationError> for AppError {
    fn from(err: NotificationError) -> Self {
        AppError::internal(err.to_string())
    }
}
