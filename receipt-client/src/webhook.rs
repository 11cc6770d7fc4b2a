//! Multipart upload to the automation webhook.

use std::time::Duration;

use receipt_ingest::{ReceiptImage, WebhookResponse, decode_response};
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use tracing::{debug, info};

use crate::error::SubmitError;

/// Name of the single multipart part carrying the image.
pub const FILE_FIELD: &str = "file";

#[derive(Debug, Clone)]
pub struct WebhookClient {
    http: Client,
    url: String,
}

impl WebhookClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, SubmitError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(SubmitError::Transport)?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }

    /// POST the image and decode the consolidated record list.
    ///
    /// No retry: a failed call is reported and the caller decides.
    pub async fn submit(&self, image: &ReceiptImage) -> Result<WebhookResponse, SubmitError> {
        let part = Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(&image.mime_type)
            .map_err(SubmitError::Transport)?;
        let form = Form::new().part(FILE_FIELD, part);

        debug!(url = %self.url, file = %image.file_name, bytes = image.len(), "posting receipt");
        let resp = self
            .http
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(SubmitError::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SubmitError::Status {
                status,
                body: body.trim().to_string(),
            });
        }

        let body = resp.text().await.map_err(SubmitError::Transport)?;
        let decoded = decode_response(&body)?;
        info!(
            status = %status,
            records = decoded.records.len(),
            encoding = ?decoded.encoding,
            "webhook accepted receipt"
        );
        Ok(decoded)
    }
}
