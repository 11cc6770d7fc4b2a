//! The reconciliation pipeline: dedupe, sort, then total.

use crate::aggregate::total_amount;
use crate::dedup::dedupe;
use crate::record::{AggregateState, ExpenseRecord, RawRecord};
use crate::sort::sort_by_date_desc;

/// Turn one raw server batch into display-ready state.
///
/// Pure and deterministic. The result is meant to replace the previous
/// state wholesale; nothing is merged with earlier batches.
pub fn reconcile(raw: Vec<RawRecord>, default_currency: &str) -> AggregateState {
    let unique = dedupe(raw);
    let sorted = sort_by_date_desc(unique);
    let total = total_amount(&sorted);

    let records = sorted
        .iter()
        .map(|r| ExpenseRecord::from_raw(r, default_currency))
        .collect();

    AggregateState { records, total }
}
