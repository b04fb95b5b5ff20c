//! Row model: [`Schema`], [`Record`], [`GroupKey`], [`ValueSet`] and
//! [`AggregatedRecord`].
//!
//! Every cell is kept as text. A [`Record`] stores its cells positionally,
//! aligned with the [`Schema`] it was read under; a missing trailing cell is
//! represented by a shorter row rather than a sentinel.

use crate::error::FoldError;
use std::collections::BTreeSet;

/// Column layout for one run, resolved once before any chunk is processed.
///
/// Holds the full ordered header plus the value column's position; the key
/// columns are every other column, in header order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<String>,
    value_idx: usize,
    key_idx: Vec<usize>,
}

impl Schema {
    /// Resolve `value_column` against `columns`.
    ///
    /// # Errors
    /// [`FoldError::MissingColumn`] if `value_column` is not one of `columns`.
    pub fn resolve(columns: Vec<String>, value_column: &str) -> Result<Self, FoldError> {
        let value_idx = columns
            .iter()
            .position(|c| c == value_column)
            .ok_or_else(|| FoldError::MissingColumn {
                column: value_column.to_string(),
                available: columns.clone(),
                chunk: None,
            })?;
        let key_idx = (0..columns.len()).filter(|&i| i != value_idx).collect();
        Ok(Self {
            columns,
            value_idx,
            key_idx,
        })
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn value_column(&self) -> &str {
        &self.columns[self.value_idx]
    }

    #[must_use]
    pub const fn value_index(&self) -> usize {
        self.value_idx
    }

    /// Key column names in header order.
    pub fn key_columns(&self) -> impl Iterator<Item = &str> {
        self.key_idx.iter().map(|&i| self.columns[i].as_str())
    }

    #[must_use]
    pub fn key_indices(&self) -> &[usize] {
        &self.key_idx
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.columns.len()
    }
}

/// One input row, cells aligned with the [`Schema`] it was read under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record(Vec<String>);

impl Record {
    #[must_use]
    pub const fn new(cells: Vec<String>) -> Self {
        Self(cells)
    }

    /// Cell at `idx`, `None` when the row is too short to have it.
    #[must_use]
    pub fn get(&self, idx: usize) -> Option<&str> {
        self.0.get(idx).map(String::as_str)
    }

    #[must_use]
    pub fn cells(&self) -> &[String] {
        &self.0
    }

    /// Split into `(group key, value)` under `schema`. Missing key cells read
    /// as empty strings; a missing value cell yields `None`.
    #[must_use]
    pub fn into_key_value(mut self, schema: &Schema) -> (GroupKey, Option<String>) {
        let value = if schema.value_index() < self.0.len() {
            Some(std::mem::take(&mut self.0[schema.value_index()]))
        } else {
            None
        };
        let key = schema
            .key_indices()
            .iter()
            .map(|&i| self.0.get_mut(i).map(std::mem::take).unwrap_or_default())
            .collect();
        (GroupKey(key), value)
    }
}

impl<S: Into<String>> FromIterator<S> for Record {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Tuple of key-column values; equality is element-wise.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GroupKey(pub Vec<String>);

impl GroupKey {
    #[must_use]
    pub fn parts(&self) -> &[String] {
        &self.0
    }
}

impl<S: Into<String>> FromIterator<S> for GroupKey {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Distinct value-column strings seen for one group. Ordered, so rendering is
/// a straight join.
pub type ValueSet = BTreeSet<String>;

/// Group key plus the union of values observed for it so far.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AggregatedRecord {
    pub key: GroupKey,
    pub values: ValueSet,
}

impl AggregatedRecord {
    #[must_use]
    pub const fn new(key: GroupKey, values: ValueSet) -> Self {
        Self { key, values }
    }

    /// The joined value cell, e.g. `"url1, url2"`.
    #[must_use]
    pub fn rendered(&self) -> String {
        crate::combine::render(&self.values)
    }

    /// Lay the record back out as an output row in `schema` column order.
    #[must_use]
    pub fn to_row(&self, schema: &Schema) -> Vec<String> {
        let mut row = vec![String::new(); schema.width()];
        for (&idx, part) in schema.key_indices().iter().zip(self.key.parts()) {
            row[idx].clone_from(part);
        }
        row[schema.value_index()] = self.rendered();
        row
    }
}
