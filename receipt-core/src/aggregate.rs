//! Running total over resolved amounts.

use crate::coerce::coerce_amount;
use crate::fields::Field;
use crate::record::RawRecord;

/// Sum of the coerced Amount of every record; malformed amounts add 0.
pub fn total_amount<'a>(records: impl IntoIterator<Item = &'a RawRecord>) -> f64 {
    sum_amounts(
        records
            .into_iter()
            .map(|r| coerce_amount(r.field(Field::Amount))),
    )
}

/// Order-independent sum: addends are summed in ascending order so the
/// result does not depend on the order records arrived in.
pub fn sum_amounts(amounts: impl IntoIterator<Item = f64>) -> f64 {
    let mut amounts: Vec<f64> = amounts.into_iter().collect();
    amounts.sort_by(f64::total_cmp);
    amounts.into_iter().sum()
}
