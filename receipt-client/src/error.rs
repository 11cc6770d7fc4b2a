use reqwest::StatusCode;
use receipt_ingest::ResponseError;
use thiserror::Error;

/// Failure of the primary submission path.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("no receipt selected")]
    NoFileSelected,
    #[error("Webhook request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("Webhook failed: {status} - {body}")]
    Status { status: StatusCode, body: String },
    #[error("Webhook response violated contract: {0}")]
    Contract(#[from] ResponseError),
}

impl SubmitError {
    /// True when the server answered but the body was unusable.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, SubmitError::Contract(_))
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("extraction request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("extraction error: {status} {body}")]
    Status { status: StatusCode, body: String },
    #[error("extraction returned no text")]
    EmptyResponse,
    #[error("extraction returned unreadable JSON: {0}")]
    Parse(#[source] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record store request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("record store error: {status} {body}")]
    Status { status: StatusCode, body: String },
    #[error("record store returned an unexpected document: {0}")]
    Decode(String),
}
