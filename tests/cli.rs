mod common;

use anyhow::Result;
use common::*;
use std::fs;
use std::process::Command;

fn rowfold() -> Command {
    Command::new(env!("CARGO_BIN_EXE_rowfold"))
}

#[test]
fn cli_folds_and_writes_report() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let input = write_csv(tmp.path(), "in.csv", HEADER, SAMPLE_ROWS);
    let output = tmp.path().join("out.csv");
    let report = tmp.path().join("report.json");

    let status = rowfold()
        .arg(&input)
        .arg(&output)
        .arg("Url")
        .args(["--chunk-size", "1", "--merge", "batch", "--report"])
        .arg(&report)
        .status()?;
    assert!(status.success());
    assert_eq!(fs::read_to_string(&output)?, SAMPLE_FOLDED);

    let v: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report)?)?;
    assert_eq!(v["chunks"], 4);
    assert_eq!(v["stage"], "done");
    Ok(())
}

#[test]
fn cli_reads_config_file() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let input = write_csv(tmp.path(), "in.csv", HEADER, "A,1,\nA,1,x\n");
    let output = tmp.path().join("out.csv");
    let cfg = tmp.path().join("rowfold.toml");
    fs::write(&cfg, "chunk_size = 1\nempty_values = \"keep\"\n")?;

    let status = rowfold()
        .arg(&input)
        .arg(&output)
        .arg("Url")
        .arg("--config")
        .arg(&cfg)
        .status()?;
    assert!(status.success());
    assert_eq!(fs::read_to_string(&output)?, "Name,Age,Url\nA,1,\", x\"\n");
    Ok(())
}

#[test]
fn cli_fails_on_missing_column() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let input = write_csv(tmp.path(), "in.csv", HEADER, SAMPLE_ROWS);
    let out = rowfold()
        .arg(&input)
        .arg(tmp.path().join("out.csv"))
        .arg("Link")
        .output()?;
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Link"), "stderr: {stderr}");
    Ok(())
}

#[test]
fn cli_rejects_unknown_output_extension() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let input = write_csv(tmp.path(), "in.csv", HEADER, SAMPLE_ROWS);
    let status = rowfold()
        .arg(&input)
        .arg(tmp.path().join("out.json"))
        .arg("Url")
        .status()?;
    assert!(!status.success());
    Ok(())
}
