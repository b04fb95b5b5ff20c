//! Final sorter: deterministic ascending order over the key tuple.
//!
//! Columns are compared in schema order. Within a column, two cells that both
//! parse as finite numbers compare numerically (so `"9" < "10"`), a numeric
//! cell sorts before a non-numeric one, and anything else compares as text.

use crate::record::{AggregatedRecord, GroupKey};
use ordered_float::OrderedFloat;
use std::cmp::Ordering;

fn as_number(s: &str) -> Option<OrderedFloat<f64>> {
    s.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(OrderedFloat)
}

/// Order two cells of the same column.
#[must_use]
pub fn compare_cells(a: &str, b: &str) -> Ordering {
    match (as_number(a), as_number(b)) {
        // "1" and "1.0" are numerically equal; fall back to text to stay total.
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Order two group keys column by column.
#[must_use]
pub fn compare_keys(a: &GroupKey, b: &GroupKey) -> Ordering {
    a.parts()
        .iter()
        .zip(b.parts())
        .map(|(x, y)| compare_cells(x, y))
        .find(|o| o.is_ne())
        .unwrap_or_else(|| a.parts().len().cmp(&b.parts().len()))
}

/// Sort merged records ascending by key. Stable.
#[must_use]
pub fn sort(mut records: Vec<AggregatedRecord>) -> Vec<AggregatedRecord> {
    records.sort_by(|a, b| compare_keys(&a.key, &b.key));
    records
}
