use std::io::Write;

use receipt_core::reconcile;
use receipt_ingest::{ImageError, RecordsEncoding, decode_response, load_image};
use serde_json::json;

#[test]
fn test_string_encoded_records_match_array() {
    let records = json!([
        {"Fields": {"Store": "Cafe", "Amount": 10, "Date": "2024-01-05"}},
        {"Store": "Deli", "Amount": "4.50", "Date": "2024-01-07"}
    ]);

    let as_array = json!({"status": "success", "allRecords": records}).to_string();
    let as_string = json!({"status": "success", "allRecords": records.to_string()}).to_string();

    let a = decode_response(&as_array).unwrap();
    let b = decode_response(&as_string).unwrap();

    assert_eq!(a.encoding, RecordsEncoding::Array);
    assert_eq!(b.encoding, RecordsEncoding::JsonString);
    assert_eq!(a.records, b.records);
    assert_eq!(reconcile(a.records, "USD"), reconcile(b.records, "USD"));
}

#[test]
fn test_load_image_reads_bytes_and_mime() {
    let mut f = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
    f.write_all(&[0x89, b'P', b'N', b'G']).unwrap();

    let img = load_image(f.path()).unwrap();
    assert_eq!(img.mime_type, "image/png");
    assert_eq!(img.len(), 4);
    assert!(img.file_name.ends_with(".png"));
}

#[test]
fn test_load_image_rejects_empty_and_non_images() {
    let empty = tempfile::Builder::new().suffix(".jpg").tempfile().unwrap();
    assert!(matches!(load_image(empty.path()), Err(ImageError::Empty(_))));

    let mut txt = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
    txt.write_all(b"hello").unwrap();
    assert!(matches!(load_image(txt.path()), Err(ImageError::UnsupportedType(_))));
}

#[test]
fn test_load_image_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_image(dir.path().join("gone.jpeg")).unwrap_err();
    assert!(matches!(err, ImageError::Io { .. }));
    assert!(err.to_string().contains("gone.jpeg"));
}
