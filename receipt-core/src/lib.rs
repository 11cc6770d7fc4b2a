//! receipt-core: canonical expense records and the reconciliation pipeline
//! applied to every automation-service response.
//!
//! Everything here is pure: no I/O, no clocks, no shared state.

pub mod aggregate;
pub mod coerce;
pub mod dates;
pub mod dedup;
pub mod fields;
pub mod reconcile;
pub mod record;
pub mod sort;

pub use aggregate::{sum_amounts, total_amount};
pub use coerce::{amount_cents, coerce_amount, parse_amount};
pub use dates::parse_date;
pub use dedup::{AmountKey, DateKey, DedupKey, dedupe};
pub use fields::{FIELDS_KEY, Field, get_field};
pub use reconcile::reconcile;
pub use record::{AggregateState, ExpenseRecord, RawRecord};
pub use sort::sort_by_date_desc;
