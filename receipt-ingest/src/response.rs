//! Automation-service response decoding.
//!
//! Expected body:
//!   { "status": "success", "totalSum": 42.5, "allRecords": [ {..}, .. ] }
//!
//! Older deployments send `allRecords` as a JSON-encoded string of the same
//! array. Both are accepted.

use receipt_core::{RawRecord, parse_amount};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

pub const SUCCESS_STATUS: &str = "success";

#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("response body is not JSON: {0}")]
    NotJson(#[source] serde_json::Error),
    #[error("response body is not a JSON object")]
    NotAnObject,
    #[error("response body has an unexpected shape: {0}")]
    Shape(#[source] serde_json::Error),
    #[error("response status is {0:?}, expected \"success\"")]
    UnexpectedStatus(String),
    #[error("response has no allRecords")]
    MissingRecords,
    #[error("allRecords string is not valid JSON: {0}")]
    EmbeddedJson(#[source] serde_json::Error),
    #[error("allRecords is not an array")]
    RecordsNotArray,
}

/// How `allRecords` arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordsEncoding {
    Array,
    JsonString,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WebhookResponse {
    pub status: Option<String>,
    /// Server-computed total, kept for comparison only.
    pub total_sum: Option<f64>,
    pub records: Vec<RawRecord>,
    pub encoding: RecordsEncoding,
}

#[derive(Deserialize)]
struct Envelope {
    status: Option<String>,
    #[serde(rename = "totalSum")]
    total_sum: Option<Value>,
    #[serde(rename = "allRecords")]
    all_records: Option<Value>,
}

/// Decode a response body. Non-object entries inside `allRecords` are
/// skipped with a warning rather than failing the batch.
pub fn decode_response(body: &str) -> Result<WebhookResponse, ResponseError> {
    let value: Value = serde_json::from_str(body).map_err(ResponseError::NotJson)?;
    if !value.is_object() {
        return Err(ResponseError::NotAnObject);
    }
    let env: Envelope = serde_json::from_value(value).map_err(ResponseError::Shape)?;

    if let Some(status) = &env.status {
        if status != SUCCESS_STATUS {
            return Err(ResponseError::UnexpectedStatus(status.clone()));
        }
    }

    let (items, encoding) = match env.all_records {
        None | Some(Value::Null) => return Err(ResponseError::MissingRecords),
        Some(Value::Array(items)) => (items, RecordsEncoding::Array),
        Some(Value::String(s)) => {
            let inner: Value = serde_json::from_str(&s).map_err(ResponseError::EmbeddedJson)?;
            match inner {
                Value::Array(items) => (items, RecordsEncoding::JsonString),
                _ => return Err(ResponseError::RecordsNotArray),
            }
        }
        Some(_) => return Err(ResponseError::RecordsNotArray),
    };

    let total = items.len();
    let records: Vec<RawRecord> = items.into_iter().filter_map(RawRecord::from_value).collect();
    if records.len() < total {
        warn!(
            skipped = total - records.len(),
            "allRecords contained non-object entries"
        );
    }

    Ok(WebhookResponse {
        status: env.status,
        total_sum: env.total_sum.as_ref().and_then(parse_amount),
        records,
        encoding,
    })
}
