//! Excel workbook I/O.
//!
//! Like Parquet, a workbook is read whole: [`XlsxTableReader`] parses the first
//! worksheet and yields it as a single chunk. The first row of the sheet is the
//! header. Cells are rendered as text (`1.0` reads as `"1"`) and blank cells
//! read as `""`. Output goes to a single worksheet with every cell written as a
//! string; empty cells are left blank.

use super::TableReader;
use crate::error::FoldError;
use crate::normalize::Chunk;
use crate::record::Record;
use anyhow::{Context, Result, anyhow};
use calamine::{Data, Reader, open_workbook_auto};
use rust_xlsxwriter::Workbook;
use std::path::Path;
use std::sync::Arc;

pub struct XlsxTableReader {
    columns: Arc<[String]>,
    rows: Option<Vec<Record>>,
}

impl XlsxTableReader {
    /// Parse the first worksheet of `path`.
    ///
    /// # Errors
    /// [`FoldError::Io`] if the file cannot be opened, is not a workbook, or
    /// has no worksheet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let (columns, rows) = read_xlsx_rows(path)?;
        Ok(Self {
            columns: columns.into(),
            rows: Some(rows),
        })
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

/// Read the header and data rows of the first worksheet of `path`.
///
/// # Errors
/// [`FoldError::Io`] on open or decode failure.
pub fn read_xlsx_rows(path: impl AsRef<Path>) -> Result<(Vec<String>, Vec<Record>)> {
    let path = path.as_ref();
    let read = || -> Result<(Vec<String>, Vec<Record>)> {
        let mut workbook = open_workbook_auto(path).context("open workbook")?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| anyhow!("workbook has no worksheets"))?
            .context("read first worksheet")?;
        let mut rows = range.rows();
        let columns = rows
            .next()
            .map(|header| header.iter().map(cell_text).collect())
            .unwrap_or_default();
        let records = rows.map(|row| row.iter().map(cell_text).collect()).collect();
        Ok((columns, records))
    };
    read().map_err(|e| FoldError::io(path, e).into())
}

impl TableReader for XlsxTableReader {
    fn columns(&self) -> Arc<[String]> {
        Arc::clone(&self.columns)
    }

    fn next_chunk(&mut self) -> Result<Option<Chunk>> {
        Ok(self
            .rows
            .take()
            .map(|rows| Chunk::new(0, self.columns(), rows)))
    }
}

/// Write `columns` and `rows` to the first worksheet of a new workbook.
///
/// # Returns
/// The number of data rows written.
///
/// # Errors
/// [`FoldError::Io`] if the table exceeds worksheet limits or the file cannot
/// be saved.
pub fn write_xlsx_rows(
    path: impl AsRef<Path>,
    columns: &[String],
    rows: &[Vec<String>],
) -> Result<usize> {
    let path = path.as_ref();
    let write = || -> Result<()> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        let lines = std::iter::once(columns).chain(rows.iter().map(Vec::as_slice));
        for (r, line) in lines.enumerate() {
            let r = u32::try_from(r).context("row index exceeds worksheet limit")?;
            for (c, cell) in line.iter().enumerate() {
                if cell.is_empty() {
                    continue;
                }
                let c = u16::try_from(c).context("column index exceeds worksheet limit")?;
                sheet
                    .write_string(r, c, cell.as_str())
                    .with_context(|| format!("write cell ({r}, {c})"))?;
            }
        }
        workbook
            .save(path)
            .with_context(|| format!("save {}", path.display()))?;
        Ok(())
    };
    write().map_err(|e| FoldError::io(path, e))?;
    Ok(rows.len())
}
