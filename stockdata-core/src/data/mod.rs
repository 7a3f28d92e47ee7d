//! Data ingestion, normalization and caching

pub mod cache;
pub mod canonicalize;
pub mod clock;
pub mod export;
pub mod ingest;
pub mod loader;
pub mod locator;
pub mod provider;
pub mod raw;
pub mod schema;
pub mod summary;
pub mod synthetic;

pub use cache::{ResultCache, DEFAULT_TTL};
pub use canonicalize::{AnomalyReport, Canonicalizer, NormalizePolicy};
pub use clock::{Clock, ManualClock, SystemClock};
pub use export::{export_table, ExportError, ExportFormat};
pub use ingest::{DelimitedPolicy, FormatLoaders, TextEncoding};
pub use loader::StockDataLoader;
pub use locator::{CandidateFile, FileFormat, LocateError, SourceLocator};
pub use provider::{DirectorySource, LoadOutcome, TableSource};
pub use raw::{Cell, RawTable};
pub use schema::{CanonicalColumn, ColumnMapping};
pub use summary::DataSummary;
pub use synthetic::{generate_sample_bars, write_sample_csv, SampleError};
