//! Parsing of the S3 "object created" notification that triggers a run.

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventParseError {
    #[error("trigger event is not valid JSON: {0}")]
    NotJson(String),
    #[error("trigger event is not an S3 notification: {0}")]
    Shape(String),
    #[error("trigger event contains no records")]
    NoRecords,
    #[error("trigger event record is missing `{0}`")]
    MissingField(&'static str),
    #[error("object key `{key}` does not decode to UTF-8")]
    InvalidKeyEncoding { key: String },
}

/// The subset of the S3 notification document this handler reads.
#[derive(Debug, Deserialize)]
struct S3Event {
    #[serde(rename = "Records")]
    records: Vec<S3Record>,
}

#[derive(Debug, Deserialize)]
struct S3Record {
    s3: S3Entity,
}

#[derive(Debug, Deserialize)]
struct S3Entity {
    bucket: S3Bucket,
    object: S3Object,
}

#[derive(Debug, Deserialize)]
struct S3Bucket {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct S3Object {
    key: Option<String>,
}

/// Source location of the object that triggered this invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerEvent {
    pub bucket: String,
    /// Object key with S3's form encoding removed.
    pub key: String,
}

impl TriggerEvent {
    /// Extract the first record's bucket and decoded key from a raw payload.
    ///
    /// Only one file is processed per invocation; any further records are
    /// logged and left alone.
    pub fn from_payload(payload: serde_json::Value) -> Result<Self, EventParseError> {
        let event: S3Event = serde_json::from_value(payload)
            .map_err(|err| EventParseError::Shape(err.to_string()))?;

        let mut records = event.records.into_iter();
        let record = records.next().ok_or(EventParseError::NoRecords)?;
        let ignored = records.count();
        if ignored > 0 {
            tracing::warn!(ignored, "trigger event carried extra records; only the first is processed");
        }

        let bucket = record
            .s3
            .bucket
            .name
            .filter(|name| !name.is_empty())
            .ok_or(EventParseError::MissingField("s3.bucket.name"))?;
        let raw_key = record
            .s3
            .object
            .key
            .filter(|key| !key.is_empty())
            .ok_or(EventParseError::MissingField("s3.object.key"))?;

        let key = decode_object_key(&raw_key)?;

        Ok(Self { bucket, key })
    }
}

/// Undo the form encoding S3 applies to keys in event notifications.
///
/// `+` stands for a space and must be replaced before percent-decoding so an
/// encoded plus (`%2B`) survives as a literal `+`.
pub fn decode_object_key(raw: &str) -> Result<String, EventParseError> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| EventParseError::InvalidKeyEncoding {
            key: raw.to_string(),
        })
}
