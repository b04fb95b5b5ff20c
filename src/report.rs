//! Run statistics and pipeline stages.
//!
//! A [`RunReport`] is filled in by the runner as it moves through the
//! [`Stage`]s of a fold and is returned to the caller on success. It can be
//! printed to stdout or saved as JSON.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Driver states. `Failed` is reachable from any non-terminal state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Idle,
    Normalizing,
    ChunkReduce,
    Merge,
    FinalReduceSort,
    Done,
    Failed,
}

impl Stage {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Whether the driver may move from `self` to `next`.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        use Stage::{ChunkReduce, Done, Failed, FinalReduceSort, Idle, Merge, Normalizing};
        match (self, next) {
            _ if self.is_terminal() => false,
            (_, Failed) => true,
            (Idle, Normalizing)
            | (Normalizing, ChunkReduce | FinalReduceSort | Done)
            | (ChunkReduce, Merge)
            | (Merge, Normalizing | FinalReduceSort)
            | (FinalReduceSort, Done) => true,
            _ => false,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub columns: usize,
    pub input_rows: u64,
    /// Rows removed for an empty or absent value cell.
    pub dropped_rows: u64,
    pub chunks: usize,
    /// Distinct groups in the result, i.e. output rows.
    pub output_rows: usize,
    /// Set when every row was filtered out and the result is empty.
    pub empty_result: bool,
    pub elapsed_ms: u64,
    pub stage: Stage,
}

impl RunReport {
    pub fn print(&self) {
        println!("\n========== Fold Summary ==========");
        if let Some(p) = &self.input {
            println!("input: {}", p.display());
        }
        if let Some(p) = &self.output {
            println!("output: {}", p.display());
        }
        println!("columns: {}", self.columns);
        println!("input rows: {}", self.input_rows);
        println!("rows missing a value: {}", self.dropped_rows);
        println!("chunks: {}", self.chunks);
        println!("output rows: {}", self.output_rows);
        if self.empty_result {
            println!("result: empty (no rows had a value)");
        }
        println!("elapsed: {} ms", self.elapsed_ms);
        println!("==================================\n");
    }

    /// Save the report as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or written.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
        let mut w = BufWriter::new(f);
        serde_json::to_writer_pretty(&mut w, self)
            .with_context(|| format!("serialize report to {}", path.display()))?;
        w.write_all(b"\n")?;
        w.flush()?;
        Ok(())
    }
}
