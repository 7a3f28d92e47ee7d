//! The caller-facing pipeline: cache lookup, then locate, load, normalize.
//!
//! `get_or_load` checks the result cache first and only touches the source on
//! a miss or after the entry's TTL has run out. Only non-empty tables are
//! cached, so a symbol whose files were missing or unusable is retried on the
//! next call. Every miss also sweeps expired entries for other symbols, so
//! tables nobody asks for again do not stay resident.
//!
//! The loader is single-threaded (`&mut self`). Share one across threads by
//! wrapping it in a `Mutex`, which keeps check-then-load atomic.

use crate::config::LoaderConfig;
use crate::data::cache::ResultCache;
use crate::data::canonicalize::Canonicalizer;
use crate::data::ingest::FormatLoaders;
use crate::data::provider::{DirectorySource, LoadOutcome, TableSource};
use crate::data::summary::DataSummary;
use crate::domain::{Symbol, SymbolError, TimeSeriesTable};
use std::path::PathBuf;
use std::sync::Arc;

pub struct StockDataLoader {
    source: Box<dyn TableSource>,
    cache: ResultCache,
}

impl StockDataLoader {
    pub fn new(source: Box<dyn TableSource>, cache: ResultCache) -> Self {
        Self { source, cache }
    }

    /// Loader over a data directory with default policies and a 5 minute TTL.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self::new(
            Box::new(DirectorySource::new(root)),
            ResultCache::default(),
        )
    }

    pub fn from_config(config: &LoaderConfig) -> Self {
        let source = DirectorySource::with_parts(
            config.root.clone(),
            FormatLoaders::new(config.delimited.clone()),
            Canonicalizer::new(config.normalize_policy()),
        );
        Self::new(Box::new(source), ResultCache::with_ttl(config.cache_ttl()))
    }

    /// Normalized table for `symbol`, from cache when fresh.
    ///
    /// `Ok(None)` means no usable data was found. A cache hit returns the
    /// same `Arc` handed out by the load that filled it.
    pub fn get_or_load(
        &mut self,
        symbol: &str,
    ) -> Result<Option<Arc<TimeSeriesTable>>, SymbolError> {
        let symbol = Symbol::parse(symbol)?;

        if let Some(table) = self.cache.get(&symbol) {
            tracing::info!(symbol = %symbol, rows = table.len(), "cache hit");
            return Ok(Some(table));
        }

        tracing::info!(symbol = %symbol, source = self.source.name(), "cache miss");
        let purged = self.cache.purge_expired();
        if purged > 0 {
            tracing::debug!(purged, "evicted expired cache entries");
        }
        match self.source.fetch(&symbol) {
            LoadOutcome::Loaded { table, .. } => {
                self.cache.insert(symbol, Arc::clone(&table));
                Ok(Some(table))
            }
            LoadOutcome::NotFound => Ok(None),
            LoadOutcome::SchemaIncomplete { path } => {
                tracing::warn!(
                    symbol = %symbol,
                    path = %path.display(),
                    "no usable OHLCV rows in any candidate"
                );
                Ok(None)
            }
        }
    }

    /// Uncached load with the typed outcome. Does not touch the cache.
    pub fn load_outcome(&self, symbol: &str) -> Result<LoadOutcome, SymbolError> {
        let symbol = Symbol::parse(symbol)?;
        Ok(self.source.fetch(&symbol))
    }

    /// Row range, price stats and backing files for `symbol`.
    pub fn summary(&mut self, symbol: &str) -> Result<Option<DataSummary>, SymbolError> {
        let Some(table) = self.get_or_load(symbol)? else {
            return Ok(None);
        };
        let symbol = Symbol::parse(symbol)?;
        let files = self.source.files(&symbol);
        Ok(Some(DataSummary::new(symbol, &table, &files)))
    }

    /// Symbols the source can serve.
    pub fn available_symbols(&self) -> Vec<Symbol> {
        self.source.symbols()
    }

    /// Drop one cached symbol so the next call reloads it.
    pub fn invalidate(&mut self, symbol: &str) -> Result<bool, SymbolError> {
        let symbol = Symbol::parse(symbol)?;
        Ok(self.cache.invalidate(&symbol))
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn source(&self) -> &dyn TableSource {
        self.source.as_ref()
    }
}

impl std::fmt::Debug for StockDataLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StockDataLoader")
            .field("source", &self.source.name())
            .field("cache", &self.cache)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::cache::DEFAULT_TTL;
    use crate::data::clock::ManualClock;
    use crate::domain::OhlcvRow;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Source that counts fetches and serves a fixed outcome.
    struct CountingSource {
        calls: Arc<AtomicUsize>,
        empty: bool,
    }

    impl TableSource for CountingSource {
        fn name(&self) -> &str {
            "counting"
        }

        fn fetch(&self, _symbol: &Symbol) -> LoadOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.empty {
                return LoadOutcome::NotFound;
            }
            let row = OhlcvRow {
                date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                open: 1.0,
                high: 1.0,
                low: 1.0,
                close: 1.0,
                volume: 1.0,
                adj_close: None,
            };
            LoadOutcome::Loaded {
                table: Arc::new(TimeSeriesTable::new(vec![row], false)),
                path: PathBuf::from("mock.csv"),
            }
        }
    }

    fn loader(empty: bool) -> (StockDataLoader, Arc<AtomicUsize>, Arc<ManualClock>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let clock = Arc::new(ManualClock::new());
        let source = CountingSource {
            calls: Arc::clone(&calls),
            empty,
        };
        let loader = StockDataLoader::new(
            Box::new(source),
            ResultCache::new(DEFAULT_TTL, clock.clone()),
        );
        (loader, calls, clock)
    }

    #[test]
    fn second_call_within_ttl_is_served_from_cache() {
        let (mut loader, calls, clock) = loader(false);
        let first = loader.get_or_load("spy").unwrap().unwrap();
        clock.advance(Duration::from_secs(60));
        let second = loader.get_or_load("SPY").unwrap().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn expired_entry_is_reloaded() {
        let (mut loader, calls, clock) = loader(false);
        let first = loader.get_or_load("SPY").unwrap().unwrap();
        clock.advance(Duration::from_secs(301));
        let second = loader.get_or_load("SPY").unwrap().unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn miss_sweeps_expired_entries_of_other_symbols() {
        let (mut loader, _calls, clock) = loader(false);
        loader.get_or_load("SPY").unwrap();
        loader.get_or_load("QQQ").unwrap();
        assert_eq!(loader.cache().len(), 2);

        clock.advance(Duration::from_secs(301));
        loader.get_or_load("IWM").unwrap();
        assert_eq!(loader.cache().len(), 1);
    }

    #[test]
    fn absent_results_are_not_cached() {
        let (mut loader, calls, _clock) = loader(true);
        assert!(loader.get_or_load("ZZZZ").unwrap().is_none());
        assert!(loader.get_or_load("ZZZZ").unwrap().is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(loader.cache().is_empty());
    }

    #[test]
    fn invalid_symbol_is_an_error() {
        let (mut loader, calls, _clock) = loader(false);
        assert_eq!(loader.get_or_load("  ").unwrap_err(), SymbolError::Empty);
        assert!(loader.get_or_load("../etc").is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn invalidate_forces_reload() {
        let (mut loader, calls, _clock) = loader(false);
        loader.get_or_load("SPY").unwrap();
        assert!(loader.invalidate("spy").unwrap());
        loader.get_or_load("SPY").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn load_outcome_bypasses_cache() {
        let (mut loader, calls, _clock) = loader(false);
        loader.get_or_load("SPY").unwrap();
        assert!(loader.load_outcome("SPY").unwrap().is_loaded());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn summary_uses_cached_table() {
        let (mut loader, calls, _clock) = loader(false);
        let summary = loader.summary("SPY").unwrap().unwrap();
        assert_eq!(summary.total_rows, 1);
        assert!(summary.files.is_empty());
        loader.summary("SPY").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
