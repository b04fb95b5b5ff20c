//! Error taxonomy for a fold run.
//!
//! Library functions return [`anyhow::Result`] like the rest of the crate, but
//! every fatal condition the pipeline detects itself is rooted in a
//! [`FoldError`], so callers can `downcast_ref::<FoldError>()` to tell them apart.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FoldError {
    /// Input or output extension is not a known container format.
    #[error("unsupported file format: {}", path.display())]
    UnsupportedFormat { path: PathBuf },

    /// The designated value column is not part of the schema.
    #[error("column '{column}' not found{} (available: {})", chunk_suffix(*chunk), available.join(", "))]
    MissingColumn {
        column: String,
        available: Vec<String>,
        /// Index of the chunk being read when the column went missing, if any.
        chunk: Option<usize>,
    },

    /// Read or write failure from the I/O layer.
    #[error("I/O failure on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

fn chunk_suffix(chunk: Option<usize>) -> String {
    chunk.map_or_else(String::new, |i| format!(" in chunk #{i}"))
}

impl FoldError {
    pub fn unsupported(path: impl Into<PathBuf>) -> Self {
        Self::UnsupportedFormat { path: path.into() }
    }

    pub fn io(path: impl Into<PathBuf>, source: impl Into<anyhow::Error>) -> Self {
        Self::Io {
            path: path.into(),
            source: source.into(),
        }
    }
}
