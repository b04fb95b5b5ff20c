//! Delimited (CSV/TSV) table I/O.
//!
//! - **Chunked reads**: [`CsvTableReader`] keeps one `csv::Reader` open and
//!   hands out `chunk_size` rows per call, so only one chunk of raw rows is
//!   resident at a time.
//! - **Writes**: [`write_csv_rows`] emits the header and every row in order.
//!
//! Both directions go through [`compression`](super::compression), so codec
//! suffixes such as `.csv.gz` work transparently. Readers run in flexible mode:
//! a row shorter than the header simply lacks its trailing cells.

use super::TableReader;
use super::compression::{FinishWrite, auto_detect_reader, auto_detect_writer};
use crate::error::FoldError;
use crate::normalize::Chunk;
use crate::record::Record;
use anyhow::{Context, Result, anyhow};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct CsvTableReader {
    path: PathBuf,
    rdr: csv::Reader<Box<dyn Read>>,
    columns: Arc<[String]>,
    chunk_size: usize,
    next_index: usize,
    rows_read: u64,
    buf: StringRecord,
    done: bool,
}

impl CsvTableReader {
    /// Open `path` and read its header row.
    ///
    /// # Errors
    /// [`FoldError::Io`] if the file cannot be opened or the header cannot be
    /// decoded.
    pub fn open(path: impl AsRef<Path>, delimiter: u8, chunk_size: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let f = File::open(&path).map_err(|e| FoldError::io(&path, e))?;
        let inner = auto_detect_reader(f, &path)
            .with_context(|| format!("setup decompression for {}", path.display()))
            .map_err(|e| FoldError::io(&path, e))?;
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(inner);
        let columns: Arc<[String]> = rdr
            .headers()
            .map_err(|e| FoldError::io(&path, e))?
            .iter()
            .map(str::to_string)
            .collect();
        Ok(Self {
            path,
            rdr,
            columns,
            chunk_size: chunk_size.max(1),
            next_index: 0,
            rows_read: 0,
            buf: StringRecord::new(),
            done: false,
        })
    }

    /// Data rows consumed so far (header excluded).
    #[must_use]
    pub const fn rows_read(&self) -> u64 {
        self.rows_read
    }
}

impl TableReader for CsvTableReader {
    fn columns(&self) -> Arc<[String]> {
        Arc::clone(&self.columns)
    }

    fn next_chunk(&mut self) -> Result<Option<Chunk>> {
        if self.done {
            return Ok(None);
        }
        let mut rows = Vec::with_capacity(self.chunk_size);
        while rows.len() < self.chunk_size {
            let more = self
                .rdr
                .read_record(&mut self.buf)
                .with_context(|| format!("parse CSV record #{}", self.rows_read + 1))
                .map_err(|e| FoldError::io(&self.path, e))?;
            if !more {
                self.done = true;
                break;
            }
            self.rows_read += 1;
            rows.push(self.buf.iter().collect::<Record>());
        }
        if rows.is_empty() {
            return Ok(None);
        }
        let chunk = Chunk::new(self.next_index, self.columns(), rows);
        self.next_index += 1;
        Ok(Some(chunk))
    }
}

/// Write a header and `rows` as delimited text.
///
/// # Returns
/// The number of data rows written.
///
/// # Errors
/// [`FoldError::Io`] on any create, encode, or flush failure.
pub fn write_csv_rows(
    path: impl AsRef<Path>,
    delimiter: u8,
    columns: &[String],
    rows: &[Vec<String>],
) -> Result<usize> {
    let path = path.as_ref();
    let io_err = |e: anyhow::Error| FoldError::io(path, e);
    let f = File::create(path)
        .with_context(|| format!("create {}", path.display()))
        .map_err(io_err)?;
    let w = auto_detect_writer(f, path)
        .with_context(|| format!("setup compression for {}", path.display()))
        .map_err(io_err)?;
    let mut wtr = WriterBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .from_writer(w);
    wtr.write_record(columns)
        .context("write CSV header")
        .map_err(io_err)?;
    for (i, row) in rows.iter().enumerate() {
        wtr.write_record(row)
            .with_context(|| format!("write CSV row #{}", i + 1))
            .map_err(io_err)?;
    }
    let inner = wtr
        .into_inner()
        .map_err(|e| anyhow!("flush CSV writer: {}", e.error()))
        .map_err(io_err)?;
    inner
        .finish()
        .with_context(|| format!("finish {}", path.display()))
        .map_err(io_err)?;
    Ok(rows.len())
}
