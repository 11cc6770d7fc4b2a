//! Optional AI preview: ask a Gemini model to read the receipt.
//!
//! Best effort only. Callers treat every error here as non-fatal.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use receipt_ingest::ReceiptImage;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::error::ExtractError;

pub const DEFAULT_GEMINI_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

const PROMPT: &str = "Extract receipt data. Return ONLY JSON with fields: merchant (string), \
amount (number, no currency symbols), date (string), currency (string).";

/// The model's structured guess at a receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptGuess {
    pub merchant: String,
    pub amount: f64,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ExtractionClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl ExtractionClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_base_url(api_key, model, DEFAULT_GEMINI_BASE)
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    pub async fn extract(&self, image: &ReceiptImage) -> Result<ReceiptGuess, ExtractError> {
        #[derive(Serialize)]
        struct Req {
            contents: Vec<Content>,
            #[serde(rename = "generationConfig")]
            generation_config: GenerationConfig,
        }

        #[derive(Serialize)]
        struct Content {
            parts: Vec<Value>,
        }

        #[derive(Serialize)]
        struct GenerationConfig {
            #[serde(rename = "responseMimeType")]
            response_mime_type: &'static str,
            #[serde(rename = "responseSchema")]
            response_schema: Value,
        }

        #[derive(Deserialize)]
        struct Resp {
            #[serde(default)]
            candidates: Vec<Candidate>,
        }

        #[derive(Deserialize)]
        struct Candidate {
            content: Option<CandidateContent>,
        }

        #[derive(Deserialize)]
        struct CandidateContent {
            #[serde(default)]
            parts: Vec<TextPart>,
        }

        #[derive(Deserialize)]
        struct TextPart {
            text: Option<String>,
        }

        let body = Req {
            contents: vec![Content {
                parts: vec![
                    json!({
                        "inlineData": {
                            "mimeType": image.mime_type,
                            "data": STANDARD.encode(&image.bytes),
                        }
                    }),
                    json!({ "text": PROMPT }),
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: json!({
                    "type": "OBJECT",
                    "properties": {
                        "merchant": { "type": "STRING" },
                        "amount": { "type": "NUMBER" },
                        "date": { "type": "STRING" },
                        "currency": { "type": "STRING" }
                    },
                    "required": ["merchant", "amount"]
                }),
            },
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );
        debug!(model = %self.model, bytes = image.len(), "requesting receipt extraction");

        let resp = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(ExtractError::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ExtractError::Status { status, body });
        }

        let out: Resp = resp.json().await.map_err(ExtractError::Transport)?;
        let text: String = out
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        parse_guess(&text)
    }
}

/// Parse the model's JSON text, tolerating a surrounding code fence.
fn parse_guess(text: &str) -> Result<ReceiptGuess, ExtractError> {
    let mut s = text.trim();
    if let Some(rest) = s.strip_prefix("```") {
        s = rest.trim_start_matches("json").trim_end_matches("```").trim();
    }
    if s.is_empty() {
        return Err(ExtractError::EmptyResponse);
    }
    serde_json::from_str(s).map_err(ExtractError::Parse)
}
