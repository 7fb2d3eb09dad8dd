//! Persists one `file_metadata` row per processed file.
//!
//! Every call opens its own connection, makes sure the table and its lookup
//! indexes exist, inserts the row and commits, all in one transaction. The
//! connection is closed on every path out of [`MetadataRecorder::record`]
//! once it has been opened.

use crate::models::{credentials::Credentials, metadata::NewFileMetadata};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{
    Connection, PgConnection,
    postgres::{PgConnectOptions, PgSslMode},
};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Schema setup, in execution order. Every statement is a no-op when the
/// object already exists.
pub const SCHEMA_STATEMENTS: [&str; 4] = [
    r#"
    CREATE TABLE IF NOT EXISTS file_metadata (
        id SERIAL PRIMARY KEY,
        filename VARCHAR(255) NOT NULL,
        status VARCHAR(50) NOT NULL,
        timestamp TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_file_metadata_filename ON file_metadata(filename)",
    "CREATE INDEX IF NOT EXISTS idx_file_metadata_timestamp ON file_metadata(timestamp)",
    "CREATE INDEX IF NOT EXISTS idx_file_metadata_status ON file_metadata(status)",
];

const INSERT_STATEMENT: &str =
    "INSERT INTO file_metadata (filename, status, timestamp) VALUES ($1, $2, $3)";

/// An open connection to the metadata store.
#[async_trait]
pub trait MetadataConnection: Send {
    /// Ensure the schema and insert `record` inside a single committed transaction.
    async fn store(&mut self, record: &NewFileMetadata) -> Result<(), sqlx::Error>;

    /// Release the connection.
    async fn close(self: Box<Self>) -> Result<(), sqlx::Error>;
}

/// Opens [`MetadataConnection`]s from credentials.
#[async_trait]
pub trait MetadataConnector: Send + Sync {
    async fn connect(
        &self,
        credentials: &Credentials,
    ) -> Result<Box<dyn MetadataConnection>, sqlx::Error>;
}

/// PostgreSQL connector; one fresh connection per call.
#[derive(Clone, Debug, Default)]
pub struct PgMetadataConnector;

impl PgMetadataConnector {
    pub fn connect_options(credentials: &Credentials) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&credentials.host)
            .port(credentials.port)
            .database(&credentials.dbname)
            .username(&credentials.username)
            .password(&credentials.password)
            .ssl_mode(PgSslMode::Prefer)
            .application_name("file-intake-handler")
    }

    /// Open a connection from explicit options.
    pub async fn connect_with(
        options: &PgConnectOptions,
    ) -> Result<Box<dyn MetadataConnection>, sqlx::Error> {
        let conn = PgConnection::connect_with(options).await?;
        Ok(Box::new(PgMetadataConnection { conn }))
    }
}

#[async_trait]
impl MetadataConnector for PgMetadataConnector {
    #[tracing::instrument(skip_all, fields(host = %credentials.host, dbname = %credentials.dbname))]
    async fn connect(
        &self,
        credentials: &Credentials,
    ) -> Result<Box<dyn MetadataConnection>, sqlx::Error> {
        Self::connect_with(&Self::connect_options(credentials)).await
    }
}

struct PgMetadataConnection {
    conn: PgConnection,
}

#[async_trait]
impl MetadataConnection for PgMetadataConnection {
    async fn store(&mut self, record: &NewFileMetadata) -> Result<(), sqlx::Error> {
        let mut tx = self.conn.begin().await?;

        for statement in SCHEMA_STATEMENTS {
            sqlx::query(statement).execute(&mut *tx).await?;
        }

        sqlx::query(INSERT_STATEMENT)
            .bind(&record.filename)
            .bind(record.status)
            .bind(record.timestamp)
            .execute(&mut *tx)
            .await?;

        tx.commit().await
    }

    async fn close(self: Box<Self>) -> Result<(), sqlx::Error> {
        self.conn.close().await
    }
}

/// Records processed files in the metadata store.
#[derive(Clone)]
pub struct MetadataRecorder {
    connector: Arc<dyn MetadataConnector>,
}

impl MetadataRecorder {
    pub fn new(connector: Arc<dyn MetadataConnector>) -> Self {
        Self { connector }
    }

    /// Insert a `processed` row for `filename` stamped with the current time.
    ///
    /// Errors are logged and returned after the connection has been closed.
    #[tracing::instrument(skip(self, credentials))]
    pub async fn record(&self, credentials: &Credentials, filename: &str) -> Result<(), sqlx::Error> {
        let record = NewFileMetadata::processed(filename, Utc::now().naive_utc());

        let mut conn = self.connector.connect(credentials).await.inspect_err(|err| {
            error!(error = %err, "could not connect to metadata store");
        })?;

        let stored = conn.store(&record).await;
        let closed = conn.close().await;

        match (stored, closed) {
            (Ok(()), Ok(())) => {
                info!("stored metadata for file");
                Ok(())
            }
            (Ok(()), Err(err)) => {
                warn!(error = %err, "metadata committed but connection did not close cleanly");
                Ok(())
            }
            (Err(err), closed) => {
                if let Err(close_err) = closed {
                    warn!(error = %close_err, "failed to close metadata connection");
                }
                error!(error = %err, "database error while storing metadata");
                Err(err)
            }
        }
    }
}
