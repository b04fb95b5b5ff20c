//! Per-group value combining.
//!
//! The chunk reducer and the merge combiner share one combining rule, expressed
//! as a [`CombineFn`]: accumulate values into a [`ValueSet`], merge two sets by
//! union, finish by rendering. Union is associative and commutative, which is
//! what lets chunks be reduced independently and merged in any order.

use crate::record::ValueSet;

/// Separator between members of a rendered value set.
pub const JOIN_SEPARATOR: &str = ", ";

/// An associative per-key aggregation.
///
/// - `create` builds an empty accumulator,
/// - `add_input` folds one value in,
/// - `merge` folds another accumulator in,
/// - `finish` produces the output.
///
/// `merge` must be associative and commutative for chunked evaluation to agree
/// with whole-input evaluation.
pub trait CombineFn<V, A, O>: Send + Sync + 'static {
    fn create(&self) -> A;
    fn add_input(&self, acc: &mut A, v: V);
    fn merge(&self, acc: &mut A, other: A);
    fn finish(&self, acc: A) -> O;
}

/// Union of `existing` and `incoming`; neither input is reused.
#[must_use]
pub fn combine_values(mut existing: ValueSet, mut incoming: ValueSet) -> ValueSet {
    // Extend the larger set with the smaller one.
    if existing.len() < incoming.len() {
        std::mem::swap(&mut existing, &mut incoming);
    }
    existing.extend(incoming);
    existing
}

/// Sorted members joined with [`JOIN_SEPARATOR`].
#[must_use]
pub fn render(values: &ValueSet) -> String {
    let mut out = String::new();
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            out.push_str(JOIN_SEPARATOR);
        }
        out.push_str(v);
    }
    out
}

/// Distinct values of a group, sorted and joined: `{"b","a","a"}` → `"a, b"`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DistinctJoin;

impl CombineFn<String, ValueSet, String> for DistinctJoin {
    fn create(&self) -> ValueSet {
        ValueSet::new()
    }

    fn add_input(&self, acc: &mut ValueSet, v: String) {
        acc.insert(v);
    }

    fn merge(&self, acc: &mut ValueSet, other: ValueSet) {
        if acc.is_empty() {
            *acc = other;
        } else {
            *acc = combine_values(std::mem::take(acc), other);
        }
    }

    fn finish(&self, acc: ValueSet) -> String {
        render(&acc)
    }
}
