//! # rowfold
//!
//! Collapse duplicate rows of a table into one row per **group**, where a group
//! is every row sharing the same values in all columns except one designated
//! **value column**. The value cell of each output row is the sorted,
//! de-duplicated set of values seen for that group, joined with `", "`.
//!
//! ```text
//! Name,Age,Url            Name,Age,Url
//! A,1,url2                A,1,"url1, url2"
//! A,1,url1        ==>     B,2,url3
//! A,1,url1
//! B,2,url3
//! ```
//!
//! Inputs larger than memory are processed in bounded chunks. Each chunk is
//! reduced on its own, then merged into an accumulator with the same union
//! combine; union is associative and commutative, so the output is identical to
//! a whole-file computation however the chunk boundaries fall. Memory grows with
//! the number of distinct groups, not with the input size.
//!
//! ## Pipeline
//!
//! 1. [`normalize`]: resolve the [`Schema`], drop rows without a value.
//! 2. [`reduce`]: group one chunk by key, union its values.
//! 3. [`merge`]: fold a chunk result into the accumulator.
//! 4. [`sort`]: order groups by key tuple (numeric-aware per column).
//! 5. [`io`]: write CSV/TSV (optionally compressed), Parquet, or Excel.
//!
//! [`Runner`] drives the whole thing and reports a [`RunReport`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use rowfold::{FoldConfig, Runner};
//! # fn main() -> anyhow::Result<()> {
//! let runner = Runner::new(FoldConfig::default().with_chunk_size(50_000));
//! let report = runner.run("links.csv", "links_folded.csv", "Url")?;
//! println!("{} groups", report.output_rows);
//! # Ok(())
//! # }
//! ```
//!
//! ## Errors
//!
//! Fatal conditions are rooted in [`FoldError`] and travel as
//! [`anyhow::Error`]; downcast to tell an unsupported format from a missing
//! column or an I/O failure. An input where no row has a value is not an error:
//! the result is empty and [`RunReport::empty_result`] is set.

pub mod combine;
pub mod config;
pub mod error;
pub mod io;
pub mod logging;
pub mod merge;
pub mod normalize;
pub mod record;
pub mod reduce;
pub mod report;
pub mod runner;
pub mod sort;

pub use combine::{CombineFn, DistinctJoin, JOIN_SEPARATOR, combine_values, render};
pub use config::{DEFAULT_CHUNK_SIZE, EmptyValuePolicy, ExecMode, FoldConfig, MergeStrategy};
pub use error::FoldError;
pub use io::{Format, TableReader};
pub use normalize::{Chunk, NormalizedRows, Normalizer};
pub use record::{AggregatedRecord, GroupKey, Record, Schema, ValueSet};
pub use report::{RunReport, Stage};
pub use runner::{FoldOutput, Runner, run};
