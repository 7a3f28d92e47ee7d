//! stockdata CLI: load, inspect and export OHLCV files from a data directory.
//!
//! Commands:
//! - `load`: normalize a symbol's data and print the first rows
//! - `locate`: list the files backing a symbol, most recent first
//! - `symbols`: list every symbol with at least one supported file
//! - `info`: row range, price stats and backing files
//! - `export`: write the normalized table as CSV, JSON, Parquet or xlsx
//! - `sample`: write deterministic sample CSV files

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use stockdata_core::data::export::default_export_path;
use stockdata_core::data::summary::format_size;
use stockdata_core::data::{
    export_table, write_sample_csv, Canonicalizer, ExportFormat, LoadOutcome, SourceLocator,
};
use stockdata_core::domain::{Symbol, TimeSeriesTable};
use stockdata_core::{LoaderConfig, StockDataLoader};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "stockdata",
    about = "stockdata CLI: locate, normalize and export OHLCV data files"
)]
struct Cli {
    /// Data directory. Overrides `root` from the config file.
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Path to a TOML loader config.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug-level logging (RUST_LOG takes precedence).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a symbol's data and print the first rows.
    Load {
        symbol: String,

        /// Number of rows to print.
        #[arg(long, default_value_t = 10)]
        head: usize,

        /// Also report zero-volume, inverted-range and substituted-volume rows.
        #[arg(long, default_value_t = false)]
        check: bool,
    },
    /// List the files backing a symbol, most recent first.
    Locate { symbol: String },
    /// List every symbol with at least one supported file.
    Symbols,
    /// Row range, price stats and backing files for a symbol.
    Info {
        symbol: String,

        /// Print as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Write the normalized table to a file.
    Export {
        symbol: String,

        /// csv, json, parquet or xlsx.
        #[arg(long, default_value = "csv")]
        format: ExportFormat,

        /// Output path. Defaults to <SYMBOL>_export.<ext> in the current directory.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Write deterministic sample CSV files into the data directory.
    Sample {
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Trading days per symbol.
        #[arg(long, default_value_t = 252)]
        days: usize,

        /// First date (YYYY-MM-DD).
        #[arg(long, default_value = "2023-01-02")]
        start: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => LoaderConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => LoaderConfig::default(),
    };
    if let Some(root) = cli.root {
        config.root = root;
    }

    match cli.command {
        Commands::Load {
            symbol,
            head,
            check,
        } => run_load(&config, &symbol, head, check),
        Commands::Locate { symbol } => run_locate(&config.root, &symbol),
        Commands::Symbols => run_symbols(&config.root),
        Commands::Info { symbol, json } => run_info(&config, &symbol, json),
        Commands::Export {
            symbol,
            format,
            output,
        } => run_export(&config, &symbol, format, output),
        Commands::Sample {
            symbols,
            days,
            start,
        } => run_sample(&config.root, &symbols, days, &start),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_table(config: &LoaderConfig, symbol: &str) -> Result<TimeSeriesTable> {
    let loader = StockDataLoader::from_config(config);
    match loader.load_outcome(symbol)? {
        LoadOutcome::Loaded { table, path } => {
            tracing::info!(path = %path.display(), "using file");
            Ok((*table).clone())
        }
        LoadOutcome::NotFound => bail!(
            "no data for '{symbol}' in {} (run `sample {symbol}` to create some)",
            config.root.display()
        ),
        LoadOutcome::SchemaIncomplete { path } => bail!(
            "{} has no Close column or no parseable dates",
            path.display()
        ),
    }
}

fn run_load(config: &LoaderConfig, symbol: &str, head: usize, check: bool) -> Result<()> {
    let table = load_table(config, symbol)?;

    println!("{}", table.columns().join("\t"));
    for r in table.rows().iter().take(head) {
        let mut fields = vec![
            r.date.to_string(),
            format!("{:.4}", r.open),
            format!("{:.4}", r.high),
            format!("{:.4}", r.low),
            format!("{:.4}", r.close),
            format!("{:.0}", r.volume),
        ];
        if table.has_adj_close() {
            fields.push(r.adj_close.map(|v| format!("{v:.4}")).unwrap_or_default());
        }
        println!("{}", fields.join("\t"));
    }
    println!("({} rows)", table.len());

    if check {
        let canonicalizer = Canonicalizer::new(config.normalize_policy());
        let reports = canonicalizer.detect_anomalies(&table);
        if reports.is_empty() {
            println!("No anomalies.");
        }
        for report in reports {
            println!(
                "{:?}: {:?} in {} rows",
                report.severity, report.anomaly_type, report.count
            );
        }
    }
    Ok(())
}

fn run_locate(root: &Path, symbol: &str) -> Result<()> {
    let symbol = Symbol::parse(symbol)?;
    let files = SourceLocator::new()
        .locate(&symbol, root)
        .with_context(|| format!("scanning {}", root.display()))?;

    if files.is_empty() {
        println!("No files for {symbol} in {}", root.display());
        return Ok(());
    }
    for file in &files {
        println!(
            "{:<32} {:>10} {:>16} {:?}",
            file.file_name(),
            format_size(file.size),
            format_modified(file.modified),
            file.format
        );
    }
    Ok(())
}

fn run_symbols(root: &Path) -> Result<()> {
    let symbols = SourceLocator::new()
        .available_symbols(root)
        .with_context(|| format!("scanning {}", root.display()))?;
    if symbols.is_empty() {
        println!("No data files in {}", root.display());
    }
    for symbol in symbols {
        println!("{symbol}");
    }
    Ok(())
}

fn run_info(config: &LoaderConfig, symbol: &str, json: bool) -> Result<()> {
    let mut loader = StockDataLoader::from_config(config);
    let Some(summary) = loader.summary(symbol)? else {
        bail!("no data for '{symbol}' in {}", config.root.display());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let fmt_opt = |v: Option<f64>, prec: usize| {
        v.map(|v| format!("{v:.prec$}"))
            .unwrap_or_else(|| "-".into())
    };
    println!("Symbol:       {}", summary.symbol);
    println!("Rows:         {}", summary.total_rows);
    if let (Some(first), Some(last)) = (summary.first_date, summary.last_date) {
        println!("Range:        {first} to {last}");
    }
    println!("Latest close: {}", fmt_opt(summary.latest_close, 2));
    println!(
        "Close range:  {} - {}",
        fmt_opt(summary.min_close, 2),
        fmt_opt(summary.max_close, 2)
    );
    println!("Avg volume:   {}", fmt_opt(summary.avg_volume, 0));
    println!("Columns:      {}", summary.columns.join(", "));
    println!("Hash:         {}", &summary.content_hash[..16.min(summary.content_hash.len())]);
    println!("Files:");
    for file in &summary.files {
        println!(
            "  {:<32} {:>10} {}",
            file.name,
            format_size(file.size_bytes),
            file.modified.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

fn run_export(
    config: &LoaderConfig,
    symbol: &str,
    format: ExportFormat,
    output: Option<PathBuf>,
) -> Result<()> {
    let table = load_table(config, symbol)?;
    let path = match output {
        Some(path) => path,
        None => default_export_path(Path::new("."), &Symbol::parse(symbol)?, format),
    };
    export_table(&table, &path, format)
        .with_context(|| format!("exporting {symbol} to {}", path.display()))?;
    println!("Exported {} rows to {}", table.len(), path.display());
    Ok(())
}

fn run_sample(root: &Path, symbols: &[String], days: usize, start: &str) -> Result<()> {
    let start = NaiveDate::parse_from_str(start, "%Y-%m-%d")
        .with_context(|| format!("invalid --start '{start}'"))?;
    let symbols = symbols
        .iter()
        .map(|s| Symbol::parse(s))
        .collect::<Result<Vec<_>, _>>()?;

    let written = write_sample_csv(root, &symbols, start, days)?;
    for path in &written {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn format_modified(modified: std::time::SystemTime) -> String {
    DateTime::<Local>::from(modified)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}
