use receipt_core::{Field, RawRecord, dedupe, get_field, parse_date, reconcile};
use serde_json::{Value, json};
use std::collections::HashSet;

fn batch(v: Value) -> Vec<RawRecord> {
    v.as_array()
        .unwrap()
        .iter()
        .cloned()
        .filter_map(RawRecord::from_value)
        .collect()
}

/// A messy batch in both shapes, with duplicates and bad fields.
fn messy_batch() -> Vec<RawRecord> {
    batch(json!([
        {"Fields": {"Store": "Cafe", "Amount": 10, "Date": "2024-01-05", "Expense Category": "Food"}},
        {"Store": "Cafe", "Amount": "10.00", "Date": "2024-01-05"},
        {"Store": "Garage", "Amount": "$45.10", "Date": "Feb 3, 2024"},
        {"Fields": {"Store": "Books", "Amount": "oops", "Date": "someday"}},
        {"Store": "Grocer", "Amount": 23.4, "Date": "2023-12-30T18:00:00Z"},
        {"Fields": {"Store": "Garage", "Amount": 45.1, "Date": "2024-02-03"}},
        {"Store": "Kiosk", "Amount": 2}
    ]))
}

#[test]
fn test_reconcile_is_deterministic() {
    let a = reconcile(messy_batch(), "USD");
    let b = reconcile(messy_batch(), "USD");
    assert_eq!(a, b);
    assert_eq!(a.total.to_bits(), b.total.to_bits());
}

#[test]
fn test_dedupe_invariants() {
    let input = messy_batch();
    let out = dedupe(input.clone());
    assert!(out.len() <= input.len());
    assert_eq!(out.len(), 5);

    let keys: HashSet<_> = out.iter().map(receipt_core::DedupKey::of).collect();
    assert_eq!(keys.len(), out.len());

    // First-seen Cafe is the nested one carrying a category.
    let cafe = out
        .iter()
        .find(|r| r.text(Field::Store).as_deref() == Some("Cafe"))
        .unwrap();
    assert_eq!(get_field(cafe, "Expense Category"), Some(&json!("Food")));
}

#[test]
fn test_sorted_descending_with_undated_last() {
    let state = reconcile(messy_batch(), "USD");
    let stores: Vec<_> = state.records.iter().map(|r| r.store.as_str()).collect();
    assert_eq!(stores, ["Garage", "Cafe", "Grocer", "Books", "Kiosk"]);

    let dated: Vec<_> = state.records.iter().filter_map(|r| r.timestamp).collect();
    assert!(dated.windows(2).all(|w| w[0] >= w[1]));
    assert_eq!(parse_date(&state.records[3].date), None);
    assert_eq!(state.records[4].date, "No Date");
}

#[test]
fn test_total_matches_final_list_and_ignores_order() {
    let state = reconcile(messy_batch(), "USD");
    let expected: f64 = state.records.iter().map(|r| r.amount).sum();
    assert!((state.total - expected).abs() < 1e-9);
    assert!((state.total - 80.5).abs() < 1e-9);

    let mut reversed = messy_batch();
    reversed.reverse();
    let again = reconcile(reversed, "USD");
    assert_eq!(again.total.to_bits(), state.total.to_bits());
}

#[test]
fn test_scenario_nested_duplicate() {
    let state = reconcile(
        batch(json!([
            {"Fields": {"Store": "Cafe", "Amount": 10, "Date": "2024-01-05"}},
            {"Store": "Cafe", "Amount": 10, "Date": "2024-01-05"}
        ])),
        "USD",
    );
    assert_eq!(state.records.len(), 1);
    assert_eq!(state.total, 10.0);
}

#[test]
fn test_scenario_two_stores() {
    let state = reconcile(
        batch(json!([
            {"Store": "A", "Amount": 5, "Date": "2024-02-01"},
            {"Store": "B", "Amount": 7, "Date": "2024-01-01"}
        ])),
        "USD",
    );
    assert_eq!(state.records[0].store, "A");
    assert_eq!(state.records[1].store, "B");
    assert_eq!(state.total, 12.0);
}
