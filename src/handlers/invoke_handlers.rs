//! Invocation entry points: the Lambda runtime and the local `POST /invoke`.
//! Both hand the raw trigger payload to `FileProcessor` unchanged, so a
//! malformed payload is reported the same way in either mode.

use crate::{errors::AppError, models::result::InvocationResponse, services::processor::FileProcessor};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use lambda_runtime::LambdaEvent;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Lambda handler. A failed error notification fails the invocation so the
/// runtime records it.
pub async fn handle_lambda_event(
    processor: Arc<FileProcessor>,
    event: LambdaEvent<serde_json::Value>,
) -> Result<InvocationResponse, lambda_runtime::Error> {
    let span = tracing::info_span!("invocation", request_id = %event.context.request_id);
    let response = processor.handle(event.payload).instrument(span).await?;
    Ok(response)
}

/// `POST /invoke`
///
/// Body is the trigger event JSON. Responds with the invocation document and
/// an HTTP status equal to its `statusCode`. The body is not checked up
/// front; a non-JSON body produces a 500 and a failure notification.
pub async fn invoke(
    State(processor): State<Arc<FileProcessor>>,
    body: Bytes,
) -> Result<Response, AppError> {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("invocation", %request_id);

    let response = processor.handle_body(&body).instrument(span).await?;

    let status = StatusCode::from_u16(response.status_code)
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    Ok((status, Json(response)).into_response())
}
