//! Parquet table I/O.
//!
//! Parquet is treated as a whole-file format: [`ParquetTableReader`] yields the
//! entire file as a single chunk. Every column is cast to UTF-8 on the way in
//! (nulls read as empty cells), and output files use an all-`Utf8` schema.

use super::TableReader;
use crate::error::FoldError;
use crate::normalize::Chunk;
use crate::record::Record;
use anyhow::{Context, Result};
use arrow::array::{Array, ArrayRef, AsArray, StringArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Schema as ArrowSchema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::arrow_writer::ArrowWriter;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const BATCH_SIZE: usize = 64 * 1024;

pub struct ParquetTableReader {
    path: PathBuf,
    columns: Arc<[String]>,
    consumed: bool,
}

impl ParquetTableReader {
    /// Open `path` and read its schema from the footer.
    ///
    /// # Errors
    /// [`FoldError::Io`] if the file cannot be opened or is not Parquet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let builder = open_builder(&path)?;
        let columns = builder
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        Ok(Self {
            path,
            columns,
            consumed: false,
        })
    }
}

fn open_builder(path: &Path) -> Result<ParquetRecordBatchReaderBuilder<File>> {
    let f = File::open(path).map_err(|e| FoldError::io(path, e))?;
    ParquetRecordBatchReaderBuilder::try_new(f)
        .context("open ParquetRecordBatchReader")
        .map_err(|e| FoldError::io(path, e).into())
}

/// Read every row of `path` as text cells.
///
/// # Errors
/// [`FoldError::Io`] on open, decode, or cast failure.
pub fn read_parquet_rows(path: impl AsRef<Path>) -> Result<Vec<Record>> {
    let path = path.as_ref();
    let reader = open_builder(path)?
        .with_batch_size(BATCH_SIZE)
        .build()
        .context("build ParquetRecordBatchReader")
        .map_err(|e| FoldError::io(path, e))?;

    let mut out = Vec::new();
    for batch in reader {
        let batch = batch
            .context("read next batch")
            .map_err(|e| FoldError::io(path, e))?;
        append_batch(&batch, &mut out).map_err(|e| FoldError::io(path, e))?;
    }
    Ok(out)
}

fn append_batch(batch: &RecordBatch, out: &mut Vec<Record>) -> Result<()> {
    let text: Vec<ArrayRef> = batch
        .columns()
        .iter()
        .map(|c| cast(c, &DataType::Utf8))
        .collect::<Result<_, _>>()
        .context("cast columns to Utf8")?;
    let cols: Vec<&StringArray> = text.iter().map(|c| c.as_string::<i32>()).collect();
    out.reserve(batch.num_rows());
    for row in 0..batch.num_rows() {
        out.push(
            cols.iter()
                .map(|a| if a.is_null(row) { "" } else { a.value(row) })
                .collect(),
        );
    }
    Ok(())
}

impl TableReader for ParquetTableReader {
    fn columns(&self) -> Arc<[String]> {
        Arc::clone(&self.columns)
    }

    fn next_chunk(&mut self) -> Result<Option<Chunk>> {
        if self.consumed {
            return Ok(None);
        }
        self.consumed = true;
        let rows = read_parquet_rows(&self.path)?;
        Ok(Some(Chunk::new(0, self.columns(), rows)))
    }
}

/// Write `rows` as a single-row-group Parquet file with `Utf8` columns.
///
/// # Returns
/// The number of data rows written.
///
/// # Errors
/// [`FoldError::Io`] on create, encode, or close failure.
pub fn write_parquet_rows(
    path: impl AsRef<Path>,
    columns: &[String],
    rows: &[Vec<String>],
) -> Result<usize> {
    let path = path.as_ref();
    let schema = Arc::new(ArrowSchema::new(
        columns
            .iter()
            .map(|name| Field::new(name, DataType::Utf8, false))
            .collect::<Vec<_>>(),
    ));
    let arrays: Vec<ArrayRef> = (0..columns.len())
        .map(|i| {
            Arc::new(StringArray::from_iter_values(
                rows.iter().map(|r| r.get(i).map_or("", String::as_str)),
            )) as ArrayRef
        })
        .collect();
    let write = || -> Result<()> {
        let batch = RecordBatch::try_new(Arc::clone(&schema), arrays)
            .context("assemble RecordBatch")?;
        let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
        let props = WriterProperties::builder().build();
        let mut writer = ArrowWriter::try_new(file, Arc::clone(&schema), Some(props))
            .context("create ArrowWriter")?;
        writer.write(&batch).context("write batch to parquet")?;
        writer.close().context("close ArrowWriter")?;
        Ok(())
    };
    write().map_err(|e| FoldError::io(path, e))?;
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Int64Array;

    #[test]
    fn whole_file_is_one_chunk() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("t.parquet");
        let cols = vec!["Name".to_string(), "Url".to_string()];
        let rows = vec![
            vec!["A".to_string(), "u1".to_string()],
            vec!["B".to_string(), "u2".to_string()],
        ];
        assert_eq!(write_parquet_rows(&path, &cols, &rows)?, 2);

        let mut r = ParquetTableReader::open(&path)?;
        assert_eq!(&*r.columns(), &["Name", "Url"]);
        let chunk = r.next_chunk()?.expect("single chunk");
        assert_eq!(chunk.rows.len(), 2);
        assert_eq!(chunk.rows[1].cells(), &["B", "u2"]);
        assert!(r.next_chunk()?.is_none());
        Ok(())
    }

    #[test]
    fn non_string_columns_are_read_as_text() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("typed.parquet");
        let schema = Arc::new(ArrowSchema::new(vec![
            Field::new("Age", DataType::Int64, true),
            Field::new("Url", DataType::Utf8, true),
        ]));
        let batch = RecordBatch::try_new(
            Arc::clone(&schema),
            vec![
                Arc::new(Int64Array::from(vec![Some(7), None])) as ArrayRef,
                Arc::new(StringArray::from(vec![Some("u"), None])) as ArrayRef,
            ],
        )?;
        let mut w = ArrowWriter::try_new(File::create(&path)?, schema, None)?;
        w.write(&batch)?;
        w.close()?;

        let rows = read_parquet_rows(&path)?;
        assert_eq!(rows[0].cells(), &["7", "u"]);
        assert_eq!(rows[1].cells(), &["", ""]);
        Ok(())
    }

    #[test]
    fn garbage_file_is_io_failure() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("bad.parquet");
        std::fs::write(&path, b"not parquet")?;
        let err = ParquetTableReader::open(&path).err().expect("open should fail");
        assert!(matches!(
            err.downcast_ref::<FoldError>(),
            Some(FoldError::Io { .. })
        ));
        Ok(())
    }
}
