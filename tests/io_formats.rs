mod common;

use anyhow::Result;
use common::*;
use flate2::Compression;
use flate2::write::GzEncoder;
use rowfold::io::compression::auto_detect_reader;
use rowfold::io::csv::{CsvTableReader, write_csv_rows};
use rowfold::io::parquet::{read_parquet_rows, write_parquet_rows};
use rowfold::io::xlsx::{read_xlsx_rows, write_xlsx_rows};
use rowfold::{FoldConfig, FoldError, Format, Runner, TableReader, run};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

fn read_decompressed(path: &Path) -> Result<String> {
    let mut text = String::new();
    auto_detect_reader(File::open(path)?, path)?.read_to_string(&mut text)?;
    Ok(text)
}

/// Fold the sample into `out.csv<suffix>`, check it, then fold that file again.
fn compressed_round_trip(suffix: &str) -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let input = write_csv(tmp.path(), "in.csv", HEADER, SAMPLE_ROWS);
    let packed = tmp.path().join(format!("out.csv{suffix}"));
    run(&input, &packed, "Url")?;
    assert_eq!(read_decompressed(&packed)?, SAMPLE_FOLDED);

    let again = tmp.path().join("again.csv");
    run(&packed, &again, "Url")?;
    assert_eq!(fs::read_to_string(&again)?, SAMPLE_FOLDED);
    Ok(())
}

#[test]
fn gzip_csv_in_and_out() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let input = tmp.path().join("in.csv.gz");
    let mut enc = GzEncoder::new(File::create(&input)?, Compression::default());
    write!(enc, "{HEADER}\n{SAMPLE_ROWS}")?;
    enc.finish()?;

    let output = tmp.path().join("out.csv.gz");
    run(&input, &output, "Url")?;

    let mut text = String::new();
    flate2::read::MultiGzDecoder::new(File::open(&output)?).read_to_string(&mut text)?;
    assert_eq!(text, SAMPLE_FOLDED);
    Ok(())
}

#[test]
fn zstd_csv_round_trip() -> Result<()> {
    compressed_round_trip(".zst")
}

#[cfg(feature = "compression-bzip2")]
#[test]
fn bzip2_csv_round_trip() -> Result<()> {
    compressed_round_trip(".bz2")
}

#[cfg(feature = "compression-xz")]
#[test]
fn xz_csv_round_trip() -> Result<()> {
    compressed_round_trip(".xz")
}

#[cfg(target_os = "linux")]
#[test]
fn failed_compressed_write_is_io_failure() -> Result<()> {
    let full = Path::new("/dev/full");
    if !full.exists() {
        return Ok(());
    }
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("out.csv.gz");
    std::os::unix::fs::symlink(full, &path)?;
    let rows = vec![columns(&["A", "1", "url1"])];
    let err = write_csv_rows(&path, b',', &columns(&["Name", "Age", "Url"]), &rows).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<FoldError>(),
        Some(FoldError::Io { .. })
    ));
    Ok(())
}

#[test]
fn tsv_uses_tab_delimiter() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let input = tmp.path().join("in.tsv");
    fs::write(&input, "Name\tUrl\nA\tb, c\nA\ta\n")?;
    let output = tmp.path().join("out.tsv");
    run(&input, &output, "Url")?;
    // "b, c" is a single value and stays whole.
    assert_eq!(fs::read_to_string(&output)?, "Name\tUrl\nA\ta, b, c\n");
    Ok(())
}

#[test]
fn csv_to_parquet_and_back() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let input = write_csv(tmp.path(), "in.csv", HEADER, SAMPLE_ROWS);
    let pq = tmp.path().join("mid.parquet");
    let report = run(&input, &pq, "Url")?;
    assert_eq!(report.output_rows, 2);

    let rows = read_parquet_rows(&pq)?;
    assert_eq!(rows, vec![record(&["A", "1", "url1, url2"]), record(&["B", "2", "url3"])]);

    let back = tmp.path().join("back.csv");
    run(&pq, &back, "Url")?;
    assert_eq!(fs::read_to_string(&back)?, SAMPLE_FOLDED);
    Ok(())
}

#[test]
fn csv_to_xlsx_and_back() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let input = write_csv(tmp.path(), "in.csv", HEADER, SAMPLE_ROWS);
    let book = tmp.path().join("mid.xlsx");
    let report = run(&input, &book, "Url")?;
    assert_eq!(report.output_rows, 2);

    let (cols, rows) = read_xlsx_rows(&book)?;
    assert_eq!(cols, columns(&["Name", "Age", "Url"]));
    assert_eq!(rows, vec![record(&["A", "1", "url1, url2"]), record(&["B", "2", "url3"])]);

    let back = tmp.path().join("back.csv");
    run(&book, &back, "Url")?;
    assert_eq!(fs::read_to_string(&back)?, SAMPLE_FOLDED);
    Ok(())
}

#[test]
fn xlsx_input_folds_as_one_chunk() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let book = tmp.path().join("in.xlsx");
    let rows: Vec<Vec<String>> = [
        ["A", "1", "url2"],
        ["A", "1", "url1"],
        ["A", "1", ""],
        ["B", "2", "url3"],
    ]
    .iter()
    .map(|r| columns(r))
    .collect();
    write_xlsx_rows(&book, &columns(&["Name", "Age", "Url"]), &rows)?;

    let output = tmp.path().join("out.xlsx");
    let cfg = FoldConfig::default().with_chunk_size(1);
    let report = Runner::new(cfg).run(&book, &output, "Url")?;
    assert_eq!(report.chunks, 1);
    assert_eq!(report.dropped_rows, 1);

    let (_, folded) = read_xlsx_rows(&output)?;
    assert_eq!(folded, vec![record(&["A", "1", "url1, url2"]), record(&["B", "2", "url3"])]);
    Ok(())
}

#[test]
fn parquet_input_is_one_chunk() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let pq = tmp.path().join("in.parquet");
    let cols = columns(&["k", "v"]);
    let rows: Vec<Vec<String>> = (0..50)
        .map(|i| vec![format!("g{}", i % 4), format!("{}", i % 6)])
        .collect();
    write_parquet_rows(&pq, &cols, &rows)?;

    let cfg = FoldConfig::default().with_chunk_size(3);
    let report = Runner::new(cfg).run(&pq, tmp.path().join("out.csv"), "v")?;
    assert_eq!(report.chunks, 1);
    assert_eq!(report.input_rows, 50);
    assert_eq!(report.output_rows, 4);
    Ok(())
}

#[test]
fn csv_reader_yields_bounded_chunks() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let input = write_csv(tmp.path(), "in.csv", HEADER, SAMPLE_ROWS);
    let mut rdr = CsvTableReader::open(&input, b',', 3)?;
    assert_eq!(&*rdr.columns(), columns(&["Name", "Age", "Url"]).as_slice());

    let first = rdr.next_chunk()?.expect("first chunk");
    assert_eq!((first.index, first.rows.len()), (0, 3));
    let second = rdr.next_chunk()?.expect("second chunk");
    assert_eq!((second.index, second.rows.len()), (1, 1));
    assert!(rdr.next_chunk()?.is_none());
    assert_eq!(rdr.rows_read(), 4);
    Ok(())
}

#[test]
fn format_detection() {
    assert_eq!(Format::from_path("a.CSV").ok(), Some(Format::Csv));
    assert_eq!(Format::from_path("a.tsv.zst").ok(), Some(Format::Tsv));
    assert_eq!(Format::from_path("a.parquet").ok(), Some(Format::Parquet));
    assert!(Format::from_path("a.parquet.gz").is_err());
    assert_eq!(Format::from_path("a.xlsx").ok(), Some(Format::Xlsx));
    assert!(Format::from_path("a.json").is_err());
    assert!(Format::from_path("noext").is_err());
}
