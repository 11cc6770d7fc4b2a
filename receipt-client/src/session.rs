//! Submission session: the state a front end renders between uploads.
//!
//! `submit` takes `&mut self`, so a second upload cannot start while one
//! is outstanding. A successful response replaces the displayed state
//! wholesale; any failure leaves it untouched.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use receipt_core::{AggregateState, amount_cents, reconcile};
use receipt_ingest::ReceiptImage;
use tracing::{info, warn};

use crate::error::{ExtractError, SubmitError};
use crate::extract::{ExtractionClient, ReceiptGuess};
use crate::store::RecordStore;
use crate::webhook::WebhookClient;

pub const UPLOAD_OK: &str = "Uploaded successfully";
pub const PREVIEW_FAILED: &str = "AI Preview failed, but you can still submit the file.";

/// Single-line user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
}

impl Notice {
    pub fn is_error(&self) -> bool {
        matches!(self, Notice::Error(_))
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Success(m) | Notice::Error(m) => f.write_str(m),
        }
    }
}

/// Extract a guess from `image` and append it to `store`.
///
/// A store write failure is logged but the guess is still returned.
pub async fn preview_receipt(
    extractor: &ExtractionClient,
    store: &dyn RecordStore,
    image: &ReceiptImage,
) -> Result<ReceiptGuess, ExtractError> {
    let guess = extractor.extract(image).await?;
    if let Err(e) = store.append(&guess, Utc::now()).await {
        warn!(store = store.kind(), error = %e, "could not persist preview");
    }
    Ok(guess)
}

pub struct Session {
    webhook: WebhookClient,
    extractor: Option<ExtractionClient>,
    store: Arc<dyn RecordStore>,
    currency: String,
    selected: Option<ReceiptImage>,
    state: AggregateState,
    notice: Option<Notice>,
}

impl Session {
    pub fn new(webhook: WebhookClient, store: Arc<dyn RecordStore>, currency: impl Into<String>) -> Self {
        Self {
            webhook,
            extractor: None,
            store,
            currency: currency.into(),
            selected: None,
            state: AggregateState::default(),
            notice: None,
        }
    }

    pub fn with_extractor(mut self, extractor: ExtractionClient) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn state(&self) -> &AggregateState {
        &self.state
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn selected(&self) -> Option<&ReceiptImage> {
        self.selected.as_ref()
    }

    /// Choose the file for the next submission, clearing old notices.
    pub fn select(&mut self, image: ReceiptImage) {
        self.selected = Some(image);
        self.notice = None;
    }

    /// Run the optional AI preview on the selected file and store the guess.
    ///
    /// Never fails: problems become a notice and `None`.
    pub async fn preview(&mut self) -> Option<ReceiptGuess> {
        let (extractor, image) = match (&self.extractor, &self.selected) {
            (Some(e), Some(i)) => (e, i),
            _ => return None,
        };

        match preview_receipt(extractor, self.store.as_ref(), image).await {
            Ok(guess) => Some(guess),
            Err(e) => {
                warn!(error = %e, "receipt preview failed");
                self.notice = Some(Notice::Error(PREVIEW_FAILED.to_string()));
                None
            }
        }
    }

    /// Upload the selected file and reconcile the response.
    ///
    /// On success the selection is cleared and the state replaced. On
    /// failure the selection is kept so the user can retry.
    pub async fn submit(&mut self) -> Result<&AggregateState, SubmitError> {
        let Some(image) = self.selected.as_ref() else {
            return Err(SubmitError::NoFileSelected);
        };
        self.notice = None;

        let resp = match self.webhook.submit(image).await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(error = %e, "submission failed");
                self.notice = Some(Notice::Error(e.to_string()));
                return Err(e);
            }
        };

        let next = reconcile(resp.records, &self.currency);
        if let Some(server_total) = resp.total_sum {
            // The recomputed total is authoritative.
            let differs = match (amount_cents(server_total), amount_cents(next.total)) {
                (Some(server), Some(client)) => server != client,
                _ => server_total != next.total,
            };
            if differs {
                warn!(server_total, client_total = next.total, "server totalSum disagrees");
            }
        }
        info!(records = next.len(), total = next.total, "reconciled webhook response");

        self.state = next;
        self.selected = None;
        self.notice = Some(Notice::Success(UPLOAD_OK.to_string()));
        Ok(&self.state)
    }
}
