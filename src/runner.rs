//! Pipeline driver.
//!
//! The [`Runner`] owns the accumulator for the length of one fold and walks the
//! [`Stage`] machine:
//!
//! ```text
//! Idle → Normalizing → (ChunkReduce → Merge → Normalizing)* → FinalReduceSort → Done
//!                    ↘ Done (nothing survived filtering)
//! ```
//!
//! Chunks are consumed strictly in arrival order. In [`ExecMode::Parallel`] the
//! runner pulls a window of chunks (one per worker), reduces them on a rayon
//! pool, fans the partial maps in with the union combine, and merges the result
//! into the accumulator; the final sort still happens exactly once.

use crate::config::{ExecMode, FoldConfig, MergeStrategy};
use crate::io::{Format, TableReader, open_reader, write_table};
use crate::combine::DistinctJoin;
use crate::merge::{merge_maps, merge_maps_par};
use crate::normalize::{Chunk, NormalizedRows, Normalizer};
use crate::record::{AggregatedRecord, Record, Schema};
use crate::reduce::{GroupMap, into_records, reduce_to_map};
use crate::report::{RunReport, Stage};
use crate::sort::sort;
use anyhow::{Context, Result};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{Level, debug, enabled, info, trace, warn};

/// Result of a fold that has not been written anywhere yet.
#[derive(Clone, Debug)]
pub struct FoldOutput {
    pub schema: Schema,
    /// Merged groups, sorted by key.
    pub records: Vec<AggregatedRecord>,
    pub report: RunReport,
}

impl FoldOutput {
    /// Records laid out as output rows in schema column order.
    #[must_use]
    pub fn rows(&self) -> Vec<Vec<String>> {
        self.records.iter().map(|r| r.to_row(&self.schema)).collect()
    }
}

#[derive(Clone, Debug, Default)]
pub struct Runner {
    pub config: FoldConfig,
}

/// Per-fold bookkeeping: current stage plus counters.
struct Driver {
    stage: Stage,
    report: RunReport,
    started: Instant,
}

impl Driver {
    fn new() -> Self {
        Self {
            stage: Stage::Idle,
            report: RunReport::default(),
            started: Instant::now(),
        }
    }

    fn enter(&mut self, next: Stage) {
        if self.stage == next {
            return;
        }
        debug_assert!(
            self.stage.can_advance_to(next),
            "illegal stage transition {:?} -> {next:?}",
            self.stage
        );
        trace!(from = ?self.stage, to = ?next, "stage");
        self.stage = next;
    }

    fn finish(mut self) -> RunReport {
        self.report.stage = self.stage;
        self.report.elapsed_ms =
            u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.report
    }
}

impl Runner {
    #[must_use]
    pub const fn new(config: FoldConfig) -> Self {
        Self { config }
    }

    /// Fold `input` into `output`, grouping on every column except `value_column`.
    ///
    /// Both formats are checked before any input is read, so an unsupported
    /// output extension fails without doing any work.
    ///
    /// # Errors
    /// - [`FoldError::UnsupportedFormat`](crate::FoldError::UnsupportedFormat)
    ///   for either path,
    /// - [`FoldError::MissingColumn`](crate::FoldError::MissingColumn) if the
    ///   value column is absent,
    /// - [`FoldError::Io`](crate::FoldError::Io) on read or write failure,
    /// - an invalid configuration.
    pub fn run(
        &self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
        value_column: &str,
    ) -> Result<RunReport> {
        let started = Instant::now();
        let (input, output) = (input.as_ref(), output.as_ref());
        self.config.validate().context("invalid configuration")?;
        let in_format = Format::from_path(input)?;
        let out_format = Format::from_path(output)?;
        info!(
            input = %input.display(),
            output = %output.display(),
            value_column,
            chunked = in_format.is_chunked(),
            "starting fold"
        );

        let mut reader = open_reader(input, in_format, &self.config)?;
        let out = self.fold_reader(reader.as_mut(), value_column)?;

        let written = write_table(
            output,
            out_format,
            out.schema.columns(),
            &out.rows(),
            &self.config,
        )?;
        info!(rows = written, path = %output.display(), "wrote result");

        let mut report = out.report;
        report.input = Some(input.to_path_buf());
        report.output = Some(output.to_path_buf());
        report.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        Ok(report)
    }

    /// Fold everything `reader` yields.
    ///
    /// # Errors
    /// See [`Runner::fold_chunks`].
    pub fn fold_reader(
        &self,
        reader: &mut dyn TableReader,
        value_column: &str,
    ) -> Result<FoldOutput> {
        let columns = reader.columns();
        let chunks = std::iter::from_fn(|| reader.next_chunk().transpose());
        self.fold_chunks(columns, chunks, value_column)
    }

    /// Fold in-memory rows, cut into chunks of `config.chunk_size`.
    ///
    /// # Errors
    /// See [`Runner::fold_chunks`].
    pub fn fold_records(
        &self,
        columns: &[String],
        rows: Vec<Record>,
        value_column: &str,
    ) -> Result<FoldOutput> {
        let columns: Arc<[String]> = columns.into();
        let size = self.config.chunk_size.max(1);
        let mut rows = rows.into_iter();
        let header = Arc::clone(&columns);
        let chunks = std::iter::from_fn(move || {
            let batch: Vec<Record> = rows.by_ref().take(size).collect();
            (!batch.is_empty()).then_some(batch)
        })
        .enumerate()
        .map(move |(i, batch)| Ok(Chunk::new(i, Arc::clone(&header), batch)));
        self.fold_chunks(columns, chunks, value_column)
    }

    /// Fold a sequence of chunks read under `columns`.
    ///
    /// An empty result (no row had a value) is not an error: it is logged as a
    /// warning and flagged in the report.
    ///
    /// # Errors
    /// - [`FoldError::MissingColumn`](crate::FoldError::MissingColumn) if
    ///   `value_column` is not in `columns`, or if a chunk's header lacks a
    ///   schema column,
    /// - any error yielded by `chunks`.
    pub fn fold_chunks<I>(
        &self,
        columns: Arc<[String]>,
        chunks: I,
        value_column: &str,
    ) -> Result<FoldOutput>
    where
        I: IntoIterator<Item = Result<Chunk>>,
    {
        let mut driver = Driver::new();
        match self.drive(&mut driver, &columns, chunks.into_iter(), value_column) {
            Ok((schema, records)) => {
                driver.report.output_rows = records.len();
                Ok(FoldOutput {
                    schema,
                    records,
                    report: driver.finish(),
                })
            }
            Err(e) => {
                driver.enter(Stage::Failed);
                debug!(report = ?driver.finish(), "fold failed");
                Err(e)
            }
        }
    }

    fn drive(
        &self,
        d: &mut Driver,
        columns: &[String],
        mut chunks: impl Iterator<Item = Result<Chunk>>,
        value_column: &str,
    ) -> Result<(Schema, Vec<AggregatedRecord>)> {
        let cfg = &self.config;
        d.enter(Stage::Normalizing);
        let schema = Schema::resolve(columns.to_vec(), value_column)?;
        d.report.columns = schema.width();
        info!(
            columns = schema.width(),
            value_column,
            key_columns = ?schema.key_columns().collect::<Vec<_>>(),
            "resolved schema"
        );
        let normalizer = Normalizer::new(schema.clone(), cfg.empty_values);

        let pool = self.build_pool()?;
        let window = pool.as_ref().map_or(1, ThreadPool::current_num_threads);

        let mut acc = GroupMap::new();
        let mut pending: Vec<GroupMap> = Vec::new();
        let mut kept: u64 = 0;
        let mut exhausted = false;

        while !exhausted {
            d.enter(Stage::Normalizing);
            let mut batch: Vec<NormalizedRows> = Vec::with_capacity(window);
            while batch.len() < window {
                let Some(chunk) = chunks.next().transpose()? else {
                    exhausted = true;
                    break;
                };
                let rows = self.normalize_chunk(d, &normalizer, chunk)?;
                if !rows.is_empty() {
                    kept += rows.len() as u64;
                    batch.push(rows);
                }
            }
            if batch.is_empty() {
                continue;
            }

            d.enter(Stage::ChunkReduce);
            let maps: Vec<GroupMap> = match &pool {
                Some(pool) => pool.install(|| batch.into_par_iter().map(reduce_to_map).collect()),
                None => batch.into_iter().map(reduce_to_map).collect(),
            };
            let part = fan_in(pool.as_ref(), maps);

            d.enter(Stage::Merge);
            let partial_groups = part.len();
            match cfg.merge {
                MergeStrategy::Online => {
                    acc = merge_maps(&DistinctJoin, std::mem::take(&mut acc), part);
                }
                MergeStrategy::Batch => pending.push(part),
            }
            info!(
                chunks = d.report.chunks,
                rows = d.report.input_rows,
                partial_groups,
                groups = acc.len(),
                "merged"
            );
        }

        if kept == 0 {
            warn!(
                value_column,
                rows = d.report.input_rows,
                "no rows have a value; result is empty"
            );
            d.report.empty_result = true;
            d.enter(Stage::Done);
            return Ok((schema, Vec::new()));
        }

        d.enter(Stage::FinalReduceSort);
        if cfg.merge == MergeStrategy::Batch {
            acc = fan_in(pool.as_ref(), std::mem::take(&mut pending));
        }
        let records = sort(into_records(acc));
        preview("sorted", records.iter().map(|r| r.to_row(&schema)), cfg.preview_rows);
        d.enter(Stage::Done);
        info!(
            input_rows = d.report.input_rows,
            dropped = d.report.dropped_rows,
            groups = records.len(),
            "fold complete"
        );
        Ok((schema, records))
    }

    fn normalize_chunk(
        &self,
        d: &mut Driver,
        normalizer: &Normalizer,
        chunk: Chunk,
    ) -> Result<NormalizedRows> {
        let index = chunk.index;
        let raw = chunk.rows.len() as u64;
        if d.report.chunks == 0 {
            preview(
                "input",
                chunk.rows.iter().map(|r| r.cells().to_vec()),
                self.config.preview_rows,
            );
        }
        let rows = normalizer.normalize(chunk)?;
        d.report.chunks += 1;
        d.report.input_rows += raw;
        d.report.dropped_rows += rows.dropped as u64;
        if rows.dropped > 0 {
            debug!(
                chunk = index,
                dropped = rows.dropped,
                column = normalizer.schema().value_column(),
                "rows missing a value"
            );
        }
        debug!(chunk = index, rows = raw, kept = rows.len(), "read chunk");
        Ok(rows)
    }

    fn build_pool(&self) -> Result<Option<ThreadPool>> {
        match self.config.exec {
            ExecMode::Sequential => Ok(None),
            ExecMode::Parallel { threads } => {
                let threads = threads.unwrap_or_else(num_cpus::get).max(1);
                let pool = ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("rowfold-{i}"))
                    .build()
                    .context("build rayon thread pool")?;
                Ok(Some(pool))
            }
        }
    }
}

/// Union keyed partials, on `pool` when there is one.
fn fan_in(pool: Option<&ThreadPool>, maps: Vec<GroupMap>) -> GroupMap {
    match pool {
        Some(pool) => pool.install(|| merge_maps_par(maps)),
        None => maps
            .into_iter()
            .fold(GroupMap::new(), |a, b| merge_maps(&DistinctJoin, a, b)),
    }
}

/// Log the first `n` rows of a stage at debug level.
fn preview(stage: &str, rows: impl Iterator<Item = Vec<String>>, n: usize) {
    if n == 0 || !enabled!(Level::DEBUG) {
        return;
    }
    for (i, row) in rows.take(n).enumerate() {
        debug!(stage, row = i, cells = ?row, "preview");
    }
}

/// Fold `input` into `output` with the default configuration.
///
/// # Errors
/// See [`Runner::run`].
pub fn run(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    value_column: &str,
) -> Result<RunReport> {
    Runner::default().run(input, output, value_column)
}
