//! Chunk reducer: group one normalized chunk by key and union its values.
//!
//! Stateless across calls; peak memory per call is one entry per distinct key
//! in the chunk.

use crate::combine::{CombineFn, DistinctJoin};
use crate::normalize::NormalizedRows;
use crate::record::{AggregatedRecord, GroupKey, ValueSet};
use std::collections::HashMap;

/// Keyed accumulators for one chunk (or for a fan-in of several).
pub type GroupMap = HashMap<GroupKey, ValueSet>;

/// Fold `(key, value)` pairs into per-key accumulators with `comb`.
pub fn combine_local<C, A>(comb: &C, pairs: Vec<(GroupKey, String)>) -> HashMap<GroupKey, A>
where
    C: CombineFn<String, A, String>,
{
    let mut map: HashMap<GroupKey, A> = HashMap::new();
    for (k, v) in pairs {
        comb.add_input(map.entry(k).or_insert_with(|| comb.create()), v);
    }
    map
}

/// Group a chunk's rows and compute each group's value set.
///
/// Output order is unspecified; the final sort fixes it.
#[must_use]
pub fn reduce(chunk: NormalizedRows) -> Vec<AggregatedRecord> {
    into_records(reduce_to_map(chunk))
}

/// Same as [`reduce`], but leaves the result keyed for a later fan-in.
#[must_use]
pub fn reduce_to_map(chunk: NormalizedRows) -> GroupMap {
    combine_local(&DistinctJoin, chunk.pairs)
}

pub(crate) fn into_records(map: GroupMap) -> Vec<AggregatedRecord> {
    map.into_iter()
        .map(|(key, values)| AggregatedRecord::new(key, values))
        .collect()
}
