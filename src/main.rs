use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use rowfold::logging::init_tracing;
use rowfold::{EmptyValuePolicy, ExecMode, FoldConfig, MergeStrategy, Runner};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

/// Group rows on every column but one and join that column's distinct values.
#[derive(Parser, Debug)]
#[command(name = "rowfold", version)]
#[command(about = "Fold duplicate rows, joining the distinct values of one column", long_about = None)]
struct Cli {
    /// Input table (.csv, .tsv, optionally .gz/.zst/.bz2/.xz; or .parquet, .xlsx)
    input: PathBuf,

    /// Output table; format follows the extension
    output: PathBuf,

    /// Column whose distinct values are joined per group
    value_column: String,

    /// Rows per chunk for delimited input
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Keep rows whose value cell is empty instead of dropping them
    #[arg(long)]
    keep_empty: bool,

    /// When chunk results are merged
    #[arg(long, value_enum)]
    merge: Option<MergeArg>,

    /// Reduce chunks on a thread pool
    #[arg(long)]
    parallel: bool,

    /// Worker threads for --parallel (default: number of CPUs)
    #[arg(long, requires = "parallel")]
    threads: Option<usize>,

    /// Field delimiter override for delimited files
    #[arg(long)]
    delimiter: Option<char>,

    /// TOML config file; flags override its values
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Write the run report as JSON to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Print the run summary to stdout
    #[arg(long)]
    summary: bool,

    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum MergeArg {
    Online,
    Batch,
}

impl From<MergeArg> for MergeStrategy {
    fn from(m: MergeArg) -> Self {
        match m {
            MergeArg::Online => Self::Online,
            MergeArg::Batch => Self::Batch,
        }
    }
}

impl Cli {
    fn config(&self) -> Result<FoldConfig> {
        let mut cfg = match &self.config {
            Some(path) => FoldConfig::from_toml_file(path)?,
            None => FoldConfig::default(),
        };
        if let Some(n) = self.chunk_size {
            cfg.chunk_size = n;
        }
        if self.keep_empty {
            cfg.empty_values = EmptyValuePolicy::Keep;
        }
        if let Some(m) = self.merge {
            cfg.merge = m.into();
        }
        if self.parallel {
            cfg.exec = ExecMode::Parallel {
                threads: self.threads,
            };
        }
        if self.delimiter.is_some() {
            cfg.delimiter = self.delimiter;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn run(cli: &Cli) -> Result<()> {
    let runner = Runner::new(cli.config()?);
    let report = runner.run(&cli.input, &cli.output, &cli.value_column)?;
    if cli.summary {
        report.print();
    }
    if let Some(path) = &cli.report {
        report
            .save_to_file(path)
            .with_context(|| format!("save report to {}", path.display()))?;
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
