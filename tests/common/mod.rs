#![allow(dead_code)]

use rowfold::Record;
use std::fs;
use std::path::{Path, PathBuf};

pub const HEADER: &str = "Name,Age,Url";

/// The four-row sample: `A,1` twice with `url1`, once with `url2`; `B,2` with `url3`.
pub const SAMPLE_ROWS: &str = "A,1,url2\nA,1,url1\nA,1,url1\nB,2,url3\n";

pub const SAMPLE_FOLDED: &str = "Name,Age,Url\nA,1,\"url1, url2\"\nB,2,url3\n";

pub fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| (*s).to_string()).collect()
}

pub fn record(cells: &[&str]) -> Record {
    cells.iter().copied().collect()
}

/// Write `header` + `body` to `dir/name` and return the path.
pub fn write_csv(dir: &Path, name: &str, header: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("{header}\n{body}")).expect("write fixture");
    path
}
