//! Typed grouping and date-window primitives shared by the time-series
//! builder and the exclusion window.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use insights_core::models::Record;

/// Group records by a typed key, ascending by key.
///
/// Records for which `key_fn` returns `None` are left out. Input order is
/// preserved within each group.
pub fn group_by<'a, K, F>(records: &[&'a Record], key_fn: F) -> BTreeMap<K, Vec<&'a Record>>
where
    K: Ord,
    F: Fn(&Record) -> Option<K>,
{
    let mut groups: BTreeMap<K, Vec<&'a Record>> = BTreeMap::new();
    for record in records {
        if let Some(key) = key_fn(record) {
            groups.entry(key).or_default().push(record);
        }
    }
    groups
}

/// Records bucketed by calendar date, ascending.
pub fn group_by_date<'a>(records: &[&'a Record]) -> BTreeMap<NaiveDate, Vec<&'a Record>> {
    group_by(records, |r| Some(r.date()))
}

/// Distinct calendar dates, ascending.
pub fn distinct_dates(records: &[&Record]) -> Vec<NaiveDate> {
    group_by_date(records).into_keys().collect()
}

/// The leading `first` and trailing `last` elements of an ordered slice.
///
/// The two edges may overlap when `first + last` exceeds the slice length.
pub fn edges<T>(sorted: &[T], first: usize, last: usize) -> (&[T], &[T]) {
    let head = &sorted[..first.min(sorted.len())];
    let tail = &sorted[sorted.len().saturating_sub(last)..];
    (head, tail)
}
