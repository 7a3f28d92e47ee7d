//! Domain types: symbols and canonical OHLCV tables.

pub mod symbol;
pub mod table;

pub use symbol::{Symbol, SymbolError};
pub use table::{OhlcvRow, TimeSeriesTable, CANONICAL_COLUMNS};
