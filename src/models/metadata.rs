//! Rows of the `file_metadata` table.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Status literal written for every file that reaches the metadata step.
pub const PROCESSED_STATUS: &str = "processed";

/// A persisted processed-file record. Rows are only ever inserted.
#[allow(dead_code)]
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct FileMetadata {
    /// Auto-increment primary key.
    pub id: i32,

    /// Decoded object key of the processed file.
    pub filename: String,

    /// Always [`PROCESSED_STATUS`] for rows written by this handler.
    pub status: String,

    /// Insert time (UTC, no zone stored).
    pub timestamp: NaiveDateTime,
}

/// Values bound into the insert statement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewFileMetadata {
    pub filename: String,
    pub status: &'static str,
    pub timestamp: NaiveDateTime,
}

impl NewFileMetadata {
    pub fn processed(filename: impl Into<String>, timestamp: NaiveDateTime) -> Self {
        Self {
            filename: filename.into(),
            status: PROCESSED_STATUS,
            timestamp,
        }
    }
}
