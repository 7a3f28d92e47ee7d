//! Deterministic sample data for a fresh data directory.

use crate::data::export::{export_table, ExportError, ExportFormat};
use crate::domain::{OhlcvRow, Symbol, TimeSeriesTable};
use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("failed to create {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Random-walk OHLCV rows for `trading_days` weekdays starting at `start`.
///
/// Seeded from the BLAKE3 hash of the symbol, so the same symbol always
/// produces the same series.
pub fn generate_sample_bars(symbol: &Symbol, start: NaiveDate, trading_days: usize) -> TimeSeriesTable {
    let seed: [u8; 32] = *blake3::hash(symbol.as_str().as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut rows = Vec::with_capacity(trading_days);
    let mut price = 100.0_f64;
    let mut current = start;

    while rows.len() < trading_days {
        if matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            current += chrono::Duration::days(1);
            continue;
        }

        let daily_return: f64 = rng.gen_range(-0.03..0.03);
        let open = price;
        let close = price * (1.0 + daily_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let volume = rng.gen_range(500_000..5_000_000u64) as f64;

        rows.push(OhlcvRow {
            date: current,
            open,
            high,
            low,
            close,
            volume,
            adj_close: None,
        });

        price = close;
        current += chrono::Duration::days(1);
    }

    TimeSeriesTable::new(rows, false)
}

/// Write `<SYMBOL>.csv` sample files into `root`, creating it if needed.
pub fn write_sample_csv(
    root: &Path,
    symbols: &[Symbol],
    start: NaiveDate,
    trading_days: usize,
) -> Result<Vec<PathBuf>, SampleError> {
    fs::create_dir_all(root).map_err(|source| SampleError::CreateDir {
        path: root.to_path_buf(),
        source,
    })?;

    let mut written = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        let table = generate_sample_bars(symbol, start, trading_days);
        let path = root.join(format!("{symbol}.csv"));
        export_table(&table, &path, ExportFormat::Csv)?;
        written.push(path);
    }
    Ok(written)
}
