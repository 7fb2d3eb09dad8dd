//! Secret store access and the credential provider built on top of it.

use super::sdk_errors;
use crate::models::credentials::Credentials;
use async_trait::async_trait;
use aws_sdk_secretsmanager::{
    Client, error::SdkError, operation::get_secret_value::GetSecretValueError,
};
use std::{fmt::Debug, sync::Arc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("secret `{0}` not found")]
    NotFound(String),
    #[error("access denied to secret `{0}`")]
    AccessDenied(String),
    #[error("secret `{name}` is not a valid credentials document: {reason}")]
    Malformed { name: String, reason: String },
    #[error("secret store request for `{name}` failed: {message}")]
    Backend { name: String, message: String },
}

/// Fetches raw secret strings by logical name.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get_secret_string(&self, secret_id: &str) -> Result<String, SecretError>;
}

/// [`SecretStore`] backed by AWS Secrets Manager.
#[derive(Clone, Debug)]
pub struct SecretsManagerStore {
    inner: Client,
}

impl SecretsManagerStore {
    pub fn new(inner: Client) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl SecretStore for SecretsManagerStore {
    #[tracing::instrument(skip(self))]
    async fn get_secret_string(&self, secret_id: &str) -> Result<String, SecretError> {
        let result = self
            .inner
            .get_secret_value()
            .secret_id(secret_id)
            .send()
            .await
            .map_err(|err| classify_secret_error(err, secret_id))?;

        result
            .secret_string()
            .map(str::to_owned)
            .ok_or_else(|| SecretError::NotFound(secret_id.into()))
    }
}

/// Map a `GetSecretValue` failure onto [`SecretError`] by service error code.
fn classify_secret_error<R>(err: SdkError<GetSecretValueError, R>, secret_id: &str) -> SecretError
where
    R: Debug + Send + Sync + 'static,
{
    match sdk_errors::service_code(&err) {
        Some("ResourceNotFoundException") => SecretError::NotFound(secret_id.into()),
        Some("AccessDeniedException") => SecretError::AccessDenied(secret_id.into()),
        _ => SecretError::Backend {
            name: secret_id.into(),
            message: sdk_errors::describe(&err),
        },
    }
}

/// Turns a secret identifier into relational store [`Credentials`].
#[derive(Clone)]
pub struct CredentialProvider {
    store: Arc<dyn SecretStore>,
}

impl CredentialProvider {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self { store }
    }

    /// Fetch and parse the credentials secret. No retries; every failure is
    /// fatal for the invocation.
    #[tracing::instrument(skip(self))]
    pub async fn get_credentials(&self, secret_id: &str) -> Result<Credentials, SecretError> {
        let secret = self.store.get_secret_string(secret_id).await?;
        Credentials::from_secret_string(&secret).map_err(|err| SecretError::Malformed {
            name: secret_id.to_string(),
            reason: err.to_string(),
        })
    }
}
