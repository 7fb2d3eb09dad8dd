//! The processing result produced once per invocation.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Filename reported when the trigger event never yielded a key.
pub const UNKNOWN_FILENAME: &str = "unknown";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Success,
    Error,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SuccessResult {
    pub filename: String,
    pub file_size_kb: f64,
    pub status: ProcessingStatus,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ErrorResult {
    pub filename: String,
    pub error: String,
    /// RFC 3339 timestamp (UTC, microsecond precision) of when the failure was reported.
    pub processed_at: String,
    pub status: ProcessingStatus,
}

/// Outcome of one invocation; serialized as the result artifact, the
/// invocation body, and the notification content.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum ProcessingResult {
    Success(SuccessResult),
    Error(ErrorResult),
}

impl ProcessingResult {
    pub fn success(filename: impl Into<String>, file_size_kb: f64) -> Self {
        Self::Success(SuccessResult {
            filename: filename.into(),
            file_size_kb,
            status: ProcessingStatus::Success,
        })
    }

    /// Build the error variant, falling back to [`UNKNOWN_FILENAME`] when the
    /// key was never parsed.
    pub fn error(filename: Option<&str>, error: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self::Error(ErrorResult {
            filename: filename.unwrap_or(UNKNOWN_FILENAME).to_string(),
            error: error.into(),
            processed_at: at.to_rfc3339_opts(SecondsFormat::Micros, true),
            status: ProcessingStatus::Error,
        })
    }

    pub fn filename(&self) -> &str {
        match self {
            Self::Success(result) => &result.filename,
            Self::Error(result) => &result.filename,
        }
    }

    pub fn status(&self) -> ProcessingStatus {
        match self {
            Self::Success(result) => result.status,
            Self::Error(result) => result.status,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status() == ProcessingStatus::Success
    }
}

/// Size of `byte_len` bytes in KiB, rounded to two decimals.
///
/// Halfway cases round to even (`128` bytes is `0.125` KiB and reports as
/// `0.12`). `byte_len / 1024 * 100` is exact in `f64`, so the tie is real.
pub fn size_in_kb(byte_len: usize) -> f64 {
    (byte_len as f64 / 1024.0 * 100.0).round_ties_even() / 100.0
}

/// `{statusCode, body}` document returned to the invoker.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct InvocationResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    /// Compact JSON encoding of the [`ProcessingResult`].
    pub body: String,
}

impl InvocationResponse {
    pub fn from_result(result: &ProcessingResult) -> Result<Self, serde_json::Error> {
        let status_code = if result.is_success() { 200 } else { 500 };
        Ok(Self {
            status_code,
            body: serde_json::to_string(result)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn size_rounds_to_two_decimals() {
        assert_eq!(size_in_kb(0), 0.0);
        assert_eq!(size_in_kb(8), 0.01);
        assert_eq!(size_in_kb(1024), 1.0);
        assert_eq!(size_in_kb(1536), 1.5);
        assert_eq!(size_in_kb(10 * 1024 * 1024), 10240.0);
    }

    #[test]
    fn size_ties_round_to_even() {
        // 128 B = 0.125 KiB, 384 B = 0.375 KiB
        assert_eq!(size_in_kb(128), 0.12);
        assert_eq!(size_in_kb(384), 0.38);
    }

    #[test]
    fn success_result_serializes_in_field_order() {
        let result = ProcessingResult::success("data/sample.csv", 0.01);
        assert_eq!(
            serde_json::to_string(&result).unwrap(),
            r#"{"filename":"data/sample.csv","file_size_kb":0.01,"status":"success"}"#
        );
    }

    #[test]
    fn error_result_uses_unknown_filename_when_key_missing() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 45).unwrap();
        let result = ProcessingResult::error(None, "trigger event contains no records", at);

        assert_eq!(result.filename(), UNKNOWN_FILENAME);
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({
                "filename": "unknown",
                "error": "trigger event contains no records",
                "processed_at": "2024-05-01T12:30:45.000000Z",
                "status": "error"
            })
        );
    }

    #[test]
    fn invocation_status_follows_result_variant() {
        let ok = InvocationResponse::from_result(&ProcessingResult::success("a.csv", 1.5)).unwrap();
        assert_eq!(ok.status_code, 200);

        let failed = InvocationResponse::from_result(&ProcessingResult::error(
            Some("a.csv"),
            "boom",
            Utc::now(),
        ))
        .unwrap();
        assert_eq!(failed.status_code, 500);

        let body: ProcessingResult = serde_json::from_str(&failed.body).unwrap();
        assert_eq!(body.filename(), "a.csv");
        assert_eq!(body.status(), ProcessingStatus::Error);
    }

    #[test]
    fn invocation_response_uses_lambda_field_names() {
        let response = InvocationResponse {
            status_code: 200,
            body: "{}".into(),
        };
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({ "statusCode": 200, "body": "{}" })
        );
    }
}
