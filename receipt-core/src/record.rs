//! Record types: the raw shape the automation service returns and the
//! canonical shape used for display and totals.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::coerce::coerce_amount;
use crate::dates::parse_date;
use crate::fields::Field;

pub const UNKNOWN_STORE: &str = "Unknown Store";
pub const NO_DATE: &str = "No Date";
pub const DEFAULT_CATEGORY: &str = "General";
pub const DEFAULT_CURRENCY: &str = "USD";

/// An unvalidated record as returned by the automation service.
///
/// The payload may be flat (`{"Store": ..}`) or nested under `Fields`
/// (`{"Fields": {"Store": ..}}`). Read it through [`crate::get_field`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(Map<String, Value>);

impl RawRecord {
    /// Wrap a JSON value; only objects are records.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Top-level lookup only. Use [`crate::get_field`] for logical fields.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Resolve a logical field through the shape-tolerant accessor.
    pub fn field(&self, field: Field) -> Option<&Value> {
        crate::fields::get_field(self, field.key())
    }

    /// Resolve a logical field as display text.
    pub fn text(&self, field: Field) -> Option<String> {
        self.field(field).and_then(value_text)
    }

    /// Parsed Date field, used only for ordering.
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        self.text(Field::Date).and_then(|d| parse_date(&d))
    }
}

impl From<Map<String, Value>> for RawRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Render a scalar JSON value as trimmed display text. Empty strings,
/// objects and arrays have no text.
pub(crate) fn value_text(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    if s.is_empty() { None } else { Some(s) }
}

/// Canonical, normalized expense record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    pub store: String,
    pub amount: f64,
    /// Free-form display string, as the service sent it.
    pub date: String,
    pub category: String,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<String>,
    /// Parsed `date`, when it parses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<NaiveDateTime>,
}

impl ExpenseRecord {
    /// Normalize a raw record, applying the display fallbacks.
    pub fn from_raw(raw: &RawRecord, default_currency: &str) -> Self {
        let date = raw.text(Field::Date);
        Self {
            store: raw.text(Field::Store).unwrap_or_else(|| UNKNOWN_STORE.to_string()),
            amount: coerce_amount(raw.field(Field::Amount)),
            timestamp: date.as_deref().and_then(parse_date),
            date: date.unwrap_or_else(|| NO_DATE.to_string()),
            category: raw
                .text(Field::Category)
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            currency: raw
                .text(Field::Currency)
                .unwrap_or_else(|| default_currency.to_string()),
            item: raw.text(Field::Item),
        }
    }

    /// First letter of the store, upper-cased, for list badges.
    pub fn initial(&self) -> char {
        self.store
            .chars()
            .next()
            .and_then(|c| c.to_uppercase().next())
            .unwrap_or('?')
    }
}

/// Display-ready state derived from one server response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AggregateState {
    pub records: Vec<ExpenseRecord>,
    pub total: f64,
}

impl AggregateState {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(v: Value) -> RawRecord {
        RawRecord::from_value(v).unwrap()
    }

    #[test]
    fn test_from_raw_flat() {
        let r = raw(json!({
            "Store": "Cafe Luna",
            "Amount": "12.50",
            "Date": "2024-01-05",
            "Expense Category": "Food",
            "Item": "Latte"
        }));
        let e = ExpenseRecord::from_raw(&r, "USD");
        assert_eq!(e.store, "Cafe Luna");
        assert_eq!(e.amount, 12.5);
        assert_eq!(e.date, "2024-01-05");
        assert_eq!(e.category, "Food");
        assert_eq!(e.currency, "USD");
        assert_eq!(e.item.as_deref(), Some("Latte"));
        assert!(e.timestamp.is_some());
    }

    #[test]
    fn test_from_raw_fallbacks() {
        let e = ExpenseRecord::from_raw(&RawRecord::default(), "KRW");
        assert_eq!(e.store, UNKNOWN_STORE);
        assert_eq!(e.amount, 0.0);
        assert_eq!(e.date, NO_DATE);
        assert_eq!(e.category, DEFAULT_CATEGORY);
        assert_eq!(e.currency, "KRW");
        assert_eq!(e.item, None);
        assert_eq!(e.timestamp, None);
        assert_eq!(e.initial(), 'U');
    }

    #[test]
    fn test_per_record_currency_wins() {
        let r = raw(json!({"Fields": {"Store": "x", "Currency": "EUR"}}));
        assert_eq!(ExpenseRecord::from_raw(&r, "USD").currency, "EUR");
    }

    #[test]
    fn test_from_value_rejects_non_objects() {
        assert!(RawRecord::from_value(json!([1, 2])).is_none());
        assert!(RawRecord::from_value(json!("Store")).is_none());
    }
}
