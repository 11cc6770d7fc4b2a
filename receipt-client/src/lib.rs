//! receipt-client: talks to the automation webhook, the optional extraction
//! model and the optional record store, and keeps the session state the
//! front end renders.

pub mod error;
pub mod extract;
pub mod session;
pub mod store;
pub mod webhook;

pub use error::{ExtractError, StoreError, SubmitError};
pub use extract::{ExtractionClient, ReceiptGuess};
pub use session::{Notice, Session, preview_receipt};
pub use store::{
    FirestoreConfig, FirestoreStore, MemoryStore, RecordStore, Snapshot, StoredExpense,
    Subscription, select_store, subscribe,
};
pub use webhook::WebhookClient;
