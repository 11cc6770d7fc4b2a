//! Deduplication on the (Store, Amount, Date) natural key.
//!
//! The service does not hand out stable ids, so identity is the composite
//! key, compared after normalization: `"12.00"` and `12` are the same
//! amount, and `"2024-01-05"` and `"01/05/2024"` are the same date.

use std::collections::HashSet;

use chrono::NaiveDateTime;

use crate::coerce::{amount_cents, coerce_amount};
use crate::dates::parse_date;
use crate::fields::Field;
use crate::record::RawRecord;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DateKey {
    Parsed(NaiveDateTime),
    Raw(String),
    Missing,
}

/// Cents when they fit, else the exact bit pattern of the amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AmountKey {
    Cents(i64),
    Exact(u64),
}

impl AmountKey {
    pub fn of(amount: f64) -> Self {
        match amount_cents(amount) {
            Some(cents) => AmountKey::Cents(cents),
            None => AmountKey::Exact(amount.to_bits()),
        }
    }
}

/// Normalized composite key of a raw record. Store names are trimmed but
/// compared case-sensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub store: Option<String>,
    pub amount: AmountKey,
    pub date: DateKey,
}

impl DedupKey {
    pub fn of(record: &RawRecord) -> Self {
        let date = match record.text(Field::Date) {
            Some(d) => match parse_date(&d) {
                Some(ts) => DateKey::Parsed(ts),
                None => DateKey::Raw(d),
            },
            None => DateKey::Missing,
        };
        Self {
            store: record.text(Field::Store),
            amount: AmountKey::of(coerce_amount(record.field(Field::Amount))),
            date,
        }
    }
}

/// Keep the first record of every key, in input order.
pub fn dedupe(records: Vec<RawRecord>) -> Vec<RawRecord> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|r| seen.insert(DedupKey::of(r)))
        .collect()
}
