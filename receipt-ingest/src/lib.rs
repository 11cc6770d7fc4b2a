//! receipt-ingest: decoding what crosses the wire, in both directions.
//! Receipt images going out, automation-service responses coming back.

pub mod image;
pub mod response;

pub use image::{ImageError, ReceiptImage, load_image, mime_for_path};
pub use response::{RecordsEncoding, ResponseError, WebhookResponse, decode_response};
