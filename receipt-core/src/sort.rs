//! Date ordering: most recent first, unparseable dates last.

use crate::record::RawRecord;

/// Sort by parsed Date, descending.
///
/// Records whose date is missing or unparseable sort after every dated
/// record. The sort is stable, so ties and undated records keep their
/// input order.
pub fn sort_by_date_desc(records: Vec<RawRecord>) -> Vec<RawRecord> {
    let mut keyed: Vec<_> = records.into_iter().map(|r| (r.timestamp(), r)).collect();
    // `None < Some(_)`, so reversing the comparison puts undated records last.
    keyed.sort_by(|a, b| b.0.cmp(&a.0));
    keyed.into_iter().map(|(_, r)| r).collect()
}
