//! Merge combiner: unify partial groups produced by different chunks.
//!
//! Concatenates the accumulator with a chunk result and regroups with the same
//! [`DistinctJoin`] combine the chunk reducer uses, so a key split across chunk
//! boundaries ends up with one record holding the union of its values.

use crate::combine::{CombineFn, DistinctJoin};
use crate::record::AggregatedRecord;
use crate::reduce::{GroupMap, into_records};
use rayon::prelude::*;

/// Fold `other` into `acc`, key by key.
pub fn merge_maps<C>(comb: &C, mut acc: GroupMap, other: GroupMap) -> GroupMap
where
    C: CombineFn<String, crate::record::ValueSet, String>,
{
    if acc.len() < other.len() {
        return merge_maps(comb, other, acc);
    }
    for (k, vs) in other {
        comb.merge(acc.entry(k).or_insert_with(|| comb.create()), vs);
    }
    acc
}

fn regroup(records: impl IntoIterator<Item = AggregatedRecord>) -> GroupMap {
    let comb = DistinctJoin;
    let mut map = GroupMap::new();
    for r in records {
        comb.merge(map.entry(r.key).or_insert_with(|| comb.create()), r.values);
    }
    map
}

/// Merge one chunk's reduced output into the accumulator.
///
/// Consumes both inputs and returns the replacement accumulator; keys are
/// unique in the result.
#[must_use]
pub fn merge(
    accumulator: Vec<AggregatedRecord>,
    chunk_result: Vec<AggregatedRecord>,
) -> Vec<AggregatedRecord> {
    into_records(regroup(accumulator.into_iter().chain(chunk_result)))
}

/// Merge every chunk result at once. Gives the same records as folding
/// [`merge`] over `results` in any order.
#[must_use]
pub fn merge_all(results: Vec<Vec<AggregatedRecord>>) -> Vec<AggregatedRecord> {
    into_records(regroup(results.into_iter().flatten()))
}

/// Fan several keyed partials into one, in parallel.
///
/// Union is associative and commutative, so rayon is free to pair partials up
/// in whatever tree shape it likes.
#[must_use]
pub fn merge_maps_par(parts: Vec<GroupMap>) -> GroupMap {
    parts
        .into_par_iter()
        .reduce(GroupMap::new, |a, b| merge_maps(&DistinctJoin, a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{GroupKey, ValueSet};

    fn rec(key: &[&str], values: &[&str]) -> AggregatedRecord {
        AggregatedRecord::new(
            key.iter().copied().collect::<GroupKey>(),
            values.iter().map(|s| (*s).to_string()).collect::<ValueSet>(),
        )
    }

    fn sorted(mut v: Vec<AggregatedRecord>) -> Vec<AggregatedRecord> {
        v.sort_by(|a, b| a.key.parts().cmp(b.key.parts()));
        v
    }

    #[test]
    fn unifies_key_split_across_chunks() {
        let acc = vec![rec(&["A", "1"], &["url2"])];
        let chunk = vec![rec(&["A", "1"], &["url1"]), rec(&["B", "2"], &["url3"])];
        let out = sorted(merge(acc, chunk));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].rendered(), "url1, url2");
        assert_eq!(out[1].rendered(), "url3");
    }

    #[test]
    fn overlapping_values_dedup_across_chunks() {
        let out = merge(vec![rec(&["A"], &["a", "b"])], vec![rec(&["A"], &["b", "c"])]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].rendered(), "a, b, c");
    }

    #[test]
    fn online_and_batch_agree() {
        let chunks = vec![
            vec![rec(&["A"], &["3"]), rec(&["B"], &["1"])],
            vec![rec(&["A"], &["1"])],
            vec![rec(&["C"], &["9"]), rec(&["A"], &["2", "3"])],
        ];
        let online = chunks
            .clone()
            .into_iter()
            .fold(Vec::new(), merge);
        let batch = merge_all(chunks);
        assert_eq!(sorted(online), sorted(batch));
    }

    #[test]
    fn merge_with_empty_sides() {
        assert!(merge(vec![], vec![]).is_empty());
        let out = merge(vec![rec(&["A"], &["x"])], vec![]);
        assert_eq!(out, vec![rec(&["A"], &["x"])]);
    }

    #[test]
    fn parallel_fan_in_matches_sequential() {
        let parts: Vec<GroupMap> = (0..16)
            .map(|i| {
                let mut m = GroupMap::new();
                m.entry(GroupKey::from_iter([format!("k{}", i % 3)]))
                    .or_default()
                    .insert(format!("v{}", i % 5));
                m
            })
            .collect();
        let seq = parts
            .clone()
            .into_iter()
            .fold(GroupMap::new(), |a, b| merge_maps(&DistinctJoin, a, b));
        let par = merge_maps_par(parts);
        assert_eq!(seq, par);
        assert_eq!(par.len(), 3);
    }
}
