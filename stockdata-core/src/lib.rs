//! stockdata core: tabular OHLCV ingestion for local data directories.
//!
//! - Source locator: find the files backing a ticker symbol
//! - Format loaders: delimited text in several encodings, spreadsheets, JSON records, Parquet
//! - Canonicalizer: map arbitrary headers onto Date/Open/High/Low/Close/Volume[/Adj_Close]
//! - Result cache: per-symbol tables kept for a fixed TTL

pub mod config;
pub mod data;
pub mod domain;

pub use config::{ConfigError, LoaderConfig};
pub use data::StockDataLoader;
