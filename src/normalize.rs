//! Input normalization: schema checks and missing-value filtering.
//!
//! Rows arrive in [`Chunk`]s that carry the header they were read under. The
//! [`Normalizer`] lines each chunk up against the run's [`Schema`], then splits
//! every row into `(GroupKey, value)` and drops the ones without a value.

use crate::config::EmptyValuePolicy;
use crate::error::FoldError;
use crate::record::{GroupKey, Record, Schema};
use std::sync::Arc;
use tracing::warn;

/// A bounded batch of input rows plus the header they are aligned with.
#[derive(Clone, Debug)]
pub struct Chunk {
    pub index: usize,
    pub columns: Arc<[String]>,
    pub rows: Vec<Record>,
}

impl Chunk {
    #[must_use]
    pub fn new(index: usize, columns: Arc<[String]>, rows: Vec<Record>) -> Self {
        Self {
            index,
            columns,
            rows,
        }
    }
}

/// Rows that survived normalization, already split into key and value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NormalizedRows {
    pub pairs: Vec<(GroupKey, String)>,
    /// Rows removed because their value cell was empty or absent.
    pub dropped: usize,
}

impl NormalizedRows {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }
}

#[derive(Clone, Debug)]
pub struct Normalizer {
    schema: Schema,
    policy: EmptyValuePolicy,
}

impl Normalizer {
    #[must_use]
    pub const fn new(schema: Schema, policy: EmptyValuePolicy) -> Self {
        Self { schema, policy }
    }

    #[must_use]
    pub const fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Filter and split one chunk.
    ///
    /// A chunk whose header matches the schema is used as is; one whose header
    /// lists the same columns in another order is realigned by name.
    ///
    /// # Errors
    /// [`FoldError::MissingColumn`] (with the chunk index) if the chunk's header
    /// lacks any schema column.
    pub fn normalize(&self, chunk: Chunk) -> Result<NormalizedRows, FoldError> {
        let rows = if *chunk.columns == *self.schema.columns() {
            chunk.rows
        } else {
            let layout = self.layout_for(&chunk.columns, chunk.index)?;
            chunk
                .rows
                .into_iter()
                .map(|r| {
                    layout
                        .iter()
                        .map(|&src| r.get(src).unwrap_or_default().to_string())
                        .collect()
                })
                .collect()
        };
        Ok(self.normalize_rows(rows))
    }

    /// Filter and split rows already aligned with the schema.
    #[must_use]
    pub fn normalize_rows(&self, rows: Vec<Record>) -> NormalizedRows {
        let mut out = NormalizedRows {
            pairs: Vec::with_capacity(rows.len()),
            dropped: 0,
        };
        for row in rows {
            let (key, value) = row.into_key_value(&self.schema);
            match value {
                Some(v) if !v.is_empty() || self.policy == EmptyValuePolicy::Keep => {
                    out.pairs.push((key, v));
                }
                _ => out.dropped += 1,
            }
        }
        out
    }

    /// For each schema column, its position in `columns`.
    fn layout_for(&self, columns: &[String], chunk: usize) -> Result<Vec<usize>, FoldError> {
        let layout = self
            .schema
            .columns()
            .iter()
            .map(|want| {
                columns
                    .iter()
                    .position(|c| c == want)
                    .ok_or_else(|| FoldError::MissingColumn {
                        column: want.clone(),
                        available: columns.to_vec(),
                        chunk: Some(chunk),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if columns.len() > layout.len() {
            warn!(
                chunk,
                extra = columns.len() - layout.len(),
                "chunk has columns outside the schema; ignoring them"
            );
        }
        Ok(layout)
    }
}
