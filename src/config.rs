//! Run configuration.
//!
//! [`FoldConfig`] can be built in code, loaded from a TOML file with
//! [`FoldConfig::from_toml_file`], and then overridden field by field (the CLI
//! does this with its flags). Every field has a default, so a config file only
//! needs the keys it changes:
//!
//! ```toml
//! chunk_size = 50000
//! empty_values = "keep"
//! merge = "batch"
//! exec = { parallel = { threads = 4 } }
//! ```

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Rows per chunk when reading delimited input.
pub const DEFAULT_CHUNK_SIZE: usize = 10_000;

/// What to do with rows whose value cell is empty or absent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyValuePolicy {
    /// Drop the row before grouping.
    #[default]
    Drop,
    /// Keep empty strings as an ordinary value. Absent cells are still dropped.
    Keep,
}

/// When chunk results are folded into the accumulator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    /// Merge after every chunk; memory stays bounded by distinct keys.
    #[default]
    Online,
    /// Keep every chunk result and merge once at the end.
    Batch,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecMode {
    #[default]
    Sequential,
    /// Reduce chunks on a rayon pool and fan their maps in with the union
    /// combine. The pool is built per run; `threads: None` sizes it to the
    /// number of logical CPUs.
    Parallel { threads: Option<usize> },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FoldConfig {
    pub chunk_size: usize,
    pub empty_values: EmptyValuePolicy,
    pub merge: MergeStrategy,
    pub exec: ExecMode,
    /// Field delimiter override for delimited input and output. When unset the
    /// delimiter follows the extension (`,` for `.csv`, tab for `.tsv`).
    pub delimiter: Option<char>,
    pub has_headers: bool,
    /// Rows shown in debug previews at each stage.
    pub preview_rows: usize,
}

impl Default for FoldConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            empty_values: EmptyValuePolicy::default(),
            merge: MergeStrategy::default(),
            exec: ExecMode::default(),
            delimiter: None,
            has_headers: true,
            preview_rows: 5,
        }
    }
}

impl FoldConfig {
    /// Parse a TOML config file. Missing keys take their defaults.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not valid TOML, or fails
    /// [`FoldConfig::validate`].
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let cfg: Self =
            toml::from_str(&text).with_context(|| format!("parse config {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// # Errors
    /// Rejects a zero chunk size, a non-ASCII delimiter, and `has_headers = false`
    /// (columns are addressed by name).
    pub fn validate(&self) -> Result<()> {
        ensure!(self.chunk_size > 0, "chunk_size must be at least 1");
        if let Some(d) = self.delimiter {
            ensure!(d.is_ascii(), "delimiter must be a single ASCII character, got {d:?}");
        }
        ensure!(
            self.has_headers,
            "input must have a header row to locate the value column"
        );
        Ok(())
    }

    #[must_use]
    pub const fn with_chunk_size(mut self, n: usize) -> Self {
        self.chunk_size = n;
        self
    }

    #[must_use]
    pub const fn with_empty_values(mut self, policy: EmptyValuePolicy) -> Self {
        self.empty_values = policy;
        self
    }

    #[must_use]
    pub const fn with_merge(mut self, merge: MergeStrategy) -> Self {
        self.merge = merge;
        self
    }

    #[must_use]
    pub const fn with_exec(mut self, exec: ExecMode) -> Self {
        self.exec = exec;
        self
    }
}
