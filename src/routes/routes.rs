//! Routes for the local invoke server.
//!
//! - `GET  /healthz`: liveness
//! - `POST /invoke`: run one invocation with the request body as the trigger event

use crate::{
    handlers::{health_handlers::healthz, invoke_handlers::invoke},
    services::processor::FileProcessor,
};
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

/// Build the router. Handlers share the process-wide `FileProcessor`.
pub fn routes() -> Router<Arc<FileProcessor>> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/invoke", post(invoke))
}
