//! Table I/O: format detection, chunked readers, and writers.
//!
//! Two container families are supported:
//! - **delimited** (`.csv`, `.tsv`, optionally with a codec suffix such as
//!   `.csv.gz`), read [`chunk_size`](crate::FoldConfig::chunk_size) rows at a time;
//! - **whole-file** (`.parquet`, `.xlsx`), read in a single pass as one chunk.
//!
//! Every cell crosses this boundary as text.

pub mod compression;

#[cfg_attr(docsrs, doc(cfg(feature = "io-csv")))]
#[cfg(feature = "io-csv")]
pub mod csv;

#[cfg_attr(docsrs, doc(cfg(feature = "io-parquet")))]
#[cfg(feature = "io-parquet")]
pub mod parquet;

#[cfg_attr(docsrs, doc(cfg(feature = "io-xlsx")))]
#[cfg(feature = "io-xlsx")]
pub mod xlsx;

use crate::config::FoldConfig;
use crate::error::FoldError;
use crate::normalize::Chunk;
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

/// Container format, picked from a path's extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Csv,
    Tsv,
    Parquet,
    Xlsx,
}

impl Format {
    /// Detect the format of `path`, ignoring a trailing compression suffix on
    /// delimited files. Matching is case-insensitive.
    ///
    /// # Errors
    /// [`FoldError::UnsupportedFormat`] for any other extension, for a
    /// compressed whole-file name, or for a family compiled out of this build.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, FoldError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase())
            .ok_or_else(|| FoldError::unsupported(path))?;
        let (codec, stem) = compression::split_codec_suffix(&name);
        let ext = Path::new(stem)
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| FoldError::unsupported(path))?;
        let format = match ext {
            "csv" => Self::Csv,
            "tsv" | "tab" => Self::Tsv,
            "parquet" | "pq" if codec.is_none() => Self::Parquet,
            "xlsx" if codec.is_none() => Self::Xlsx,
            _ => return Err(FoldError::unsupported(path)),
        };
        if format.is_available() {
            Ok(format)
        } else {
            Err(FoldError::unsupported(path))
        }
    }

    /// Whether this build can read and write the format.
    #[must_use]
    pub const fn is_available(self) -> bool {
        match self {
            Self::Csv | Self::Tsv => cfg!(feature = "io-csv"),
            Self::Parquet => cfg!(feature = "io-parquet"),
            Self::Xlsx => cfg!(feature = "io-xlsx"),
        }
    }

    /// Whether input in this format is read in bounded chunks.
    #[must_use]
    pub const fn is_chunked(self) -> bool {
        matches!(self, Self::Csv | Self::Tsv)
    }

    /// Field delimiter for delimited formats, honoring a configured override.
    #[must_use]
    pub fn delimiter(self, cfg: &FoldConfig) -> u8 {
        match (cfg.delimiter, self) {
            // validate() guarantees an ASCII char.
            (Some(d), _) => d as u8,
            (None, Self::Tsv) => b'\t',
            (None, _) => b',',
        }
    }
}

/// Source of input chunks.
pub trait TableReader {
    /// Header shared by every chunk this reader yields.
    fn columns(&self) -> Arc<[String]>;

    /// Next chunk, or `None` once the input is exhausted.
    ///
    /// # Errors
    /// Propagates read and decode failures as [`FoldError::Io`].
    fn next_chunk(&mut self) -> Result<Option<Chunk>>;
}

/// Open a reader for `path` in the given `format`.
///
/// # Errors
/// Fails if the file cannot be opened or its header cannot be read.
pub fn open_reader(
    path: &Path,
    format: Format,
    cfg: &FoldConfig,
) -> Result<Box<dyn TableReader>> {
    match format {
        #[cfg(feature = "io-csv")]
        Format::Csv | Format::Tsv => Ok(Box::new(csv::CsvTableReader::open(
            path,
            format.delimiter(cfg),
            cfg.chunk_size,
        )?)),
        #[cfg(feature = "io-parquet")]
        Format::Parquet => Ok(Box::new(parquet::ParquetTableReader::open(path)?)),
        #[cfg(feature = "io-xlsx")]
        Format::Xlsx => Ok(Box::new(xlsx::XlsxTableReader::open(path)?)),
        #[allow(unreachable_patterns)]
        _ => {
            let _ = cfg;
            Err(FoldError::unsupported(path).into())
        }
    }
}

/// Write `rows` (already laid out in `columns` order) to `path`.
///
/// Parent directories are created as needed. The file is written in place; a
/// failure part-way can leave a partial file behind.
///
/// # Returns
/// The number of data rows written.
///
/// # Errors
/// Fails on any I/O or encoding error.
pub fn write_table(
    path: &Path,
    format: Format,
    columns: &[String],
    rows: &[Vec<String>],
    cfg: &FoldConfig,
) -> Result<usize> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| FoldError::io(parent, e))?;
    }
    match format {
        #[cfg(feature = "io-csv")]
        Format::Csv | Format::Tsv => csv::write_csv_rows(path, format.delimiter(cfg), columns, rows),
        #[cfg(feature = "io-parquet")]
        Format::Parquet => parquet::write_parquet_rows(path, columns, rows),
        #[cfg(feature = "io-xlsx")]
        Format::Xlsx => xlsx::write_xlsx_rows(path, columns, rows),
        #[allow(unreachable_patterns)]
        _ => {
            let _ = (cfg, columns, rows);
            Err(FoldError::unsupported(path).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unsupported(p: &str) -> bool {
        matches!(Format::from_path(p), Err(FoldError::UnsupportedFormat { .. }))
    }

    #[test]
    fn detects_by_extension() {
        assert_eq!(Format::from_path("a/b.csv").unwrap(), Format::Csv);
        assert_eq!(Format::from_path("B.TSV").unwrap(), Format::Tsv);
        assert_eq!(Format::from_path("x.parquet").unwrap(), Format::Parquet);
        assert_eq!(Format::from_path("Links.XLSX").unwrap(), Format::Xlsx);
    }

    #[cfg(feature = "compression-gzip")]
    #[test]
    fn compressed_delimited_is_supported() {
        assert_eq!(Format::from_path("rows.csv.gz").unwrap(), Format::Csv);
    }

    #[test]
    fn rejects_unknown_extensions() {
        assert!(unsupported("report.xls"));
        assert!(unsupported("noext"));
        assert!(unsupported("data.json"));
    }

    #[cfg(feature = "compression-gzip")]
    #[test]
    fn rejects_compressed_whole_file_formats() {
        assert!(unsupported("x.parquet.gz"));
        assert!(unsupported("x.xlsx.gz"));
    }

    #[test]
    fn delimiter_follows_format_unless_overridden() {
        let cfg = FoldConfig::default();
        assert_eq!(Format::Tsv.delimiter(&cfg), b'\t');
        assert_eq!(Format::Csv.delimiter(&cfg), b',');
        let cfg = FoldConfig {
            delimiter: Some(';'),
            ..FoldConfig::default()
        };
        assert_eq!(Format::Tsv.delimiter(&cfg), b';');
    }
}
