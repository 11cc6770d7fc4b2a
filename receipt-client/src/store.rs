//! Best-effort record persistence.
//!
//! One `RecordStore` is picked at startup: Firestore over REST when a
//! project is configured, otherwise an in-memory store that lives for the
//! process. Callers never check which one they have.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use receipt_core::record::DEFAULT_CATEGORY;
use receipt_core::{ExpenseRecord, parse_date, sum_amounts};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::extract::ReceiptGuess;

pub const UNKNOWN_MERCHANT: &str = "Unknown Merchant";
pub const RECENT: &str = "Recent";
pub const DEFAULT_FIRESTORE_BASE: &str = "https://firestore.googleapis.com";
pub const DEFAULT_COLLECTION: &str = "expenses";

/// A persisted preview record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredExpense {
    pub id: String,
    pub merchant: Option<String>,
    pub amount: Option<f64>,
    pub date: Option<String>,
    pub currency: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StoredExpense {
    pub fn from_guess(id: impl Into<String>, guess: &ReceiptGuess, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            merchant: Some(guess.merchant.clone()),
            amount: Some(guess.amount),
            date: guess.date.clone(),
            currency: guess.currency.clone(),
            created_at,
        }
    }

    /// Display form, with the list-view fallbacks.
    pub fn to_expense(&self, default_currency: &str) -> ExpenseRecord {
        let merchant = self.merchant.as_deref().map(str::trim).filter(|m| !m.is_empty());
        let date = self.date.as_deref().map(str::trim).filter(|d| !d.is_empty());
        ExpenseRecord {
            store: merchant.unwrap_or(UNKNOWN_MERCHANT).to_string(),
            amount: self.amount.filter(|a| a.is_finite()).unwrap_or(0.0),
            timestamp: date.and_then(parse_date),
            date: date.unwrap_or(RECENT).to_string(),
            category: DEFAULT_CATEGORY.to_string(),
            currency: self
                .currency
                .clone()
                .unwrap_or_else(|| default_currency.to_string()),
            item: None,
        }
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Short name for logs.
    fn kind(&self) -> &'static str;

    /// Append one record. Records are never updated.
    async fn append(
        &self,
        guess: &ReceiptGuess,
        created_at: DateTime<Utc>,
    ) -> Result<StoredExpense, StoreError>;

    /// Most recent `limit` records, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<StoredExpense>, StoreError>;
}

/// Process-local fallback store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<StoredExpense>>,
    next_id: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn append(
        &self,
        guess: &ReceiptGuess,
        created_at: DateTime<Utc>,
    ) -> Result<StoredExpense, StoreError> {
        let seq = self.next_id.fetch_add(1, Ordering::Relaxed);
        let id = format!("{}-{seq}", created_at.timestamp_millis());
        let record = StoredExpense::from_guess(id, guess, created_at);
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record.clone());
        Ok(record)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<StoredExpense>, StoreError> {
        let mut out: Vec<StoredExpense> = self
            .records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .rev()
            .cloned()
            .collect();
        // Reversed first, so equal timestamps keep newest-appended first.
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out.truncate(limit);
        Ok(out)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FirestoreConfig {
    pub project_id: String,
    pub api_key: Option<String>,
    pub collection: String,
    pub base_url: String,
}

impl FirestoreConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            api_key: None,
            collection: DEFAULT_COLLECTION.to_string(),
            base_url: DEFAULT_FIRESTORE_BASE.to_string(),
        }
    }
}

/// Firestore REST-backed store.
#[derive(Debug, Clone)]
pub struct FirestoreStore {
    http: Client,
    config: FirestoreConfig,
}

impl FirestoreStore {
    pub fn new(config: FirestoreConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    fn documents_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/databases/(default)/documents",
            self.config.base_url.trim_end_matches('/'),
            self.config.project_id
        )
    }

    fn post(&self, url: &str) -> reqwest::RequestBuilder {
        let req = self.http.post(url);
        match &self.config.api_key {
            Some(key) => req.query(&[("key", key)]),
            None => req,
        }
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<Value, StoreError> {
        let resp = req.send().await.map_err(StoreError::Transport)?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Status { status, body });
        }
        resp.json().await.map_err(StoreError::Transport)
    }
}

#[async_trait]
impl RecordStore for FirestoreStore {
    fn kind(&self) -> &'static str {
        "firestore"
    }

    async fn append(
        &self,
        guess: &ReceiptGuess,
        created_at: DateTime<Utc>,
    ) -> Result<StoredExpense, StoreError> {
        let url = format!("{}/{}", self.documents_url(), self.config.collection);
        let body = json!({ "fields": encode_fields(guess, created_at) });

        let doc = self.send(self.post(&url).json(&body)).await?;
        let record = decode_document(&doc)
            .ok_or_else(|| StoreError::Decode("created document has no name".to_string()))?;
        debug!(id = %record.id, "stored expense");
        Ok(record)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<StoredExpense>, StoreError> {
        let url = format!("{}:runQuery", self.documents_url());
        let body = json!({
            "structuredQuery": {
                "from": [{ "collectionId": self.config.collection }],
                "orderBy": [{ "field": { "fieldPath": "createdAt" }, "direction": "DESCENDING" }],
                "limit": limit
            }
        });

        let rows = self.send(self.post(&url).json(&body)).await?;
        let rows = rows
            .as_array()
            .ok_or_else(|| StoreError::Decode("runQuery response is not an array".to_string()))?;

        // Rows without a `document` only carry read metadata.
        Ok(rows
            .iter()
            .filter_map(|row| row.get("document"))
            .filter_map(|doc| {
                let decoded = decode_document(doc);
                if decoded.is_none() {
                    warn!("skipping undecodable firestore document");
                }
                decoded
            })
            .collect())
    }
}

fn encode_fields(guess: &ReceiptGuess, created_at: DateTime<Utc>) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("merchant".into(), json!({ "stringValue": guess.merchant }));
    fields.insert("amount".into(), json!({ "doubleValue": guess.amount }));
    if let Some(date) = &guess.date {
        fields.insert("date".into(), json!({ "stringValue": date }));
    }
    if let Some(currency) = &guess.currency {
        fields.insert("currency".into(), json!({ "stringValue": currency }));
    }
    fields.insert(
        "createdAt".into(),
        json!({ "timestampValue": created_at.to_rfc3339() }),
    );
    fields
}

fn decode_document(doc: &Value) -> Option<StoredExpense> {
    let id = doc.get("name")?.as_str()?.rsplit('/').next()?.to_string();
    let empty = Map::new();
    let fields = doc.get("fields").and_then(Value::as_object).unwrap_or(&empty);

    let string = |key: &str| -> Option<String> {
        fields.get(key)?.get("stringValue")?.as_str().map(str::to_string)
    };
    let number = |key: &str| -> Option<f64> {
        let v = fields.get(key)?;
        v.get("doubleValue")
            .and_then(Value::as_f64)
            .or_else(|| match v.get("integerValue")? {
                Value::String(s) => s.parse().ok(),
                other => other.as_f64(),
            })
    };
    let timestamp = |v: Option<&Value>| -> Option<DateTime<Utc>> {
        let s = v?.as_str()?;
        DateTime::parse_from_rfc3339(s).ok().map(|t| t.with_timezone(&Utc))
    };

    let created_at = timestamp(fields.get("createdAt").and_then(|v| v.get("timestampValue")))
        .or_else(|| timestamp(doc.get("createTime")))?;

    Some(StoredExpense {
        id,
        merchant: string("merchant"),
        amount: number("amount"),
        date: string("date"),
        currency: string("currency"),
        created_at,
    })
}

/// Pick the store once, from configuration presence.
pub fn select_store(firestore: Option<FirestoreConfig>) -> Arc<dyn RecordStore> {
    match firestore {
        Some(cfg) => {
            info!(project = %cfg.project_id, collection = %cfg.collection, "using firestore record store");
            Arc::new(FirestoreStore::new(cfg))
        }
        None => {
            info!("record store not configured; keeping records in memory");
            Arc::new(MemoryStore::new())
        }
    }
}

/// Latest view of the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub records: Vec<StoredExpense>,
    pub total: f64,
}

impl Snapshot {
    pub fn from_records(records: Vec<StoredExpense>) -> Self {
        let total = sum_amounts(records.iter().map(|r| r.amount.unwrap_or(0.0)));
        Self { records, total }
    }
}

/// A live view of the most recent records. Polling stops when this is
/// dropped.
pub struct Subscription {
    rx: watch::Receiver<Snapshot>,
    handle: JoinHandle<()>,
}

impl Subscription {
    /// Wait for the next distinct snapshot. `None` once the poller is gone.
    pub async fn changed(&mut self) -> Option<Snapshot> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    pub fn latest(&self) -> Snapshot {
        self.rx.borrow().clone()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Poll `store` every `every`, publishing a snapshot whenever it changes.
/// The first poll always publishes. Must be called inside a tokio runtime.
pub fn subscribe(store: Arc<dyn RecordStore>, limit: usize, every: Duration) -> Subscription {
    let (tx, rx) = watch::channel(Snapshot::default());

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        let mut first = true;
        loop {
            ticker.tick().await;
            match store.recent(limit).await {
                Ok(records) => {
                    let snap = Snapshot::from_records(records);
                    tx.send_if_modified(|cur| {
                        if !first && *cur == snap {
                            return false;
                        }
                        *cur = snap;
                        true
                    });
                    first = false;
                }
                Err(e) => warn!(store = store.kind(), error = %e, "record store poll failed"),
            }
            if tx.is_closed() {
                break;
            }
        }
    });

    Subscription { rx, handle }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use httpmock::prelude::*;

    fn guess(merchant: &str, amount: f64) -> ReceiptGuess {
        ReceiptGuess {
            merchant: merchant.to_string(),
            amount,
            date: Some("2024-01-05".to_string()),
            currency: None,
        }
    }

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 19, h, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_memory_recent_newest_first_and_limited() {
        let store = MemoryStore::new();
        store.append(&guess("a", 1.0), at(9)).await.unwrap();
        store.append(&guess("b", 2.0), at(11)).await.unwrap();
        store.append(&guess("c", 3.0), at(10)).await.unwrap();

        let recent = store.recent(2).await.unwrap();
        let names: Vec<_> = recent.iter().map(|r| r.merchant.clone().unwrap()).collect();
        assert_eq!(names, ["b", "c"]);
    }

    #[test]
    fn test_to_expense_fallbacks() {
        let rec = StoredExpense {
            id: "1".into(),
            merchant: None,
            amount: None,
            date: None,
            currency: None,
            created_at: at(9),
        };
        let e = rec.to_expense("USD");
        assert_eq!(e.store, UNKNOWN_MERCHANT);
        assert_eq!(e.date, RECENT);
        assert_eq!(e.amount, 0.0);
        assert_eq!(e.currency, "USD");
    }

    #[test]
    fn test_decode_document() {
        let doc = json!({
            "name": "projects/p/databases/(default)/documents/expenses/abc123",
            "fields": {
                "merchant": {"stringValue": "Cafe"},
                "amount": {"integerValue": "12"},
                "createdAt": {"timestampValue": "2026-02-19T09:00:00Z"}
            }
        });
        let rec = decode_document(&doc).unwrap();
        assert_eq!(rec.id, "abc123");
        assert_eq!(rec.amount, Some(12.0));
        assert_eq!(rec.date, None);
        assert_eq!(rec.created_at, at(9));
    }

    #[tokio::test]
    async fn test_firestore_append_and_recent() {
        let server = MockServer::start_async().await;
        let docs = "/v1/projects/demo/databases/(default)/documents";

        let create = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(format!("{docs}/expenses"))
                    .query_param("key", "fs-key")
                    .body_includes("\"timestampValue\"");
                then.status(200).json_body(json!({
                    "name": "projects/demo/databases/(default)/documents/expenses/new1",
                    "fields": {
                        "merchant": {"stringValue": "Cafe"},
                        "amount": {"doubleValue": 4.5},
                        "createdAt": {"timestampValue": "2026-02-19T09:00:00Z"}
                    }
                }));
            })
            .await;

        let query = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(format!("{docs}:runQuery"))
                    .body_includes("\"DESCENDING\"");
                then.status(200).json_body(json!([
                    {"document": {
                        "name": "projects/demo/databases/(default)/documents/expenses/new1",
                        "fields": {
                            "merchant": {"stringValue": "Cafe"},
                            "amount": {"doubleValue": 4.5},
                            "createdAt": {"timestampValue": "2026-02-19T09:00:00Z"}
                        }
                    }},
                    {"readTime": "2026-02-19T09:00:01Z"}
                ]));
            })
            .await;

        let mut cfg = FirestoreConfig::new("demo");
        cfg.api_key = Some("fs-key".into());
        cfg.base_url = server.base_url();
        let store = FirestoreStore::new(cfg);

        let rec = store.append(&guess("Cafe", 4.5), at(9)).await.unwrap();
        assert_eq!(rec.id, "new1");

        let recent = store.recent(20).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].merchant.as_deref(), Some("Cafe"));

        create.assert_async().await;
        query.assert_async().await;
    }

    #[tokio::test]
    async fn test_subscription_publishes_first_and_changes() {
        let store = Arc::new(MemoryStore::new());
        let mut sub = subscribe(store.clone(), 20, Duration::from_millis(10));

        let first = sub.changed().await.unwrap();
        assert!(first.records.is_empty());

        store.append(&guess("Cafe", 4.5), at(9)).await.unwrap();
        let next = sub.changed().await.unwrap();
        assert_eq!(next.records.len(), 1);
        assert_eq!(next.total, 4.5);
        assert_eq!(sub.latest(), next);
    }
}
