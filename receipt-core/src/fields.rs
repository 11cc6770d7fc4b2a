//! Shape-tolerant field lookup.
//!
//! The automation service has returned records both flat and nested under
//! `Fields`, with no version marker. Every field read goes through
//! [`get_field`] so callers never care which shape they got.

use serde_json::Value;

use crate::record::RawRecord;

/// Key under which the nested record shape keeps its payload.
pub const FIELDS_KEY: &str = "Fields";

/// Logical fields the client reads from a raw record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Store,
    Amount,
    Date,
    Category,
    Item,
    Currency,
}

impl Field {
    /// Key as it appears in the service payload.
    pub fn key(self) -> &'static str {
        match self {
            Field::Store => "Store",
            Field::Amount => "Amount",
            Field::Date => "Date",
            Field::Category => "Expense Category",
            Field::Item => "Item",
            Field::Currency => "Currency",
        }
    }
}

/// Resolve `key` against `record.Fields` first, then the record itself.
///
/// `null` counts as absent at both levels. A `Fields` entry that is not an
/// object is ignored.
pub fn get_field<'a>(record: &'a RawRecord, key: &str) -> Option<&'a Value> {
    let nested = record
        .get(FIELDS_KEY)
        .and_then(Value::as_object)
        .and_then(|fields| fields.get(key))
        .filter(|v| !v.is_null());

    nested.or_else(|| record.get(key).filter(|v| !v.is_null()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(v: Value) -> RawRecord {
        RawRecord::from_value(v).unwrap()
    }

    #[test]
    fn test_nested_and_flat_resolve_identically() {
        let nested = raw(json!({"Fields": {"Store": "A"}}));
        let flat = raw(json!({"Store": "A"}));
        assert_eq!(get_field(&nested, "Store"), Some(&json!("A")));
        assert_eq!(get_field(&flat, "Store"), Some(&json!("A")));
    }

    #[test]
    fn test_absent_key_is_none() {
        let nested = raw(json!({"Fields": {"Store": "A"}}));
        let flat = raw(json!({"Store": "A"}));
        assert_eq!(get_field(&nested, "Amount"), None);
        assert_eq!(get_field(&flat, "Amount"), None);
    }

    #[test]
    fn test_nested_takes_priority() {
        let r = raw(json!({"Store": "outer", "Fields": {"Store": "inner"}}));
        assert_eq!(get_field(&r, "Store"), Some(&json!("inner")));
    }

    #[test]
    fn test_falls_back_when_nested_lacks_key() {
        let r = raw(json!({"Amount": 4, "Fields": {"Store": "inner"}}));
        assert_eq!(get_field(&r, "Amount"), Some(&json!(4)));
    }

    #[test]
    fn test_null_is_absent() {
        let r = raw(json!({"Store": "outer", "Fields": {"Store": null}}));
        assert_eq!(get_field(&r, "Store"), Some(&json!("outer")));

        let r = raw(json!({"Store": null}));
        assert_eq!(get_field(&r, "Store"), None);
    }

    #[test]
    fn test_non_object_fields_is_ignored() {
        let r = raw(json!({"Fields": "oops", "Store": "A"}));
        assert_eq!(get_field(&r, "Store"), Some(&json!("A")));

        let r = raw(json!({"Fields": ["Store"]}));
        assert_eq!(get_field(&r, "Store"), None);
    }

    #[test]
    fn test_category_key() {
        let r = raw(json!({"Fields": {"Expense Category": "Travel"}}));
        assert_eq!(r.field(Field::Category), Some(&json!("Travel")));
    }
}
