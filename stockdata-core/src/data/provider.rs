//! Table sources and the typed load outcome.
//!
//! The `TableSource` trait abstracts over where normalized tables come from so
//! the loader can be pointed at a data directory in production and at a mock
//! in tests. The cache sits above this trait; sources don't know about it.

use crate::data::canonicalize::Canonicalizer;
use crate::data::ingest::FormatLoaders;
use crate::data::locator::{CandidateFile, SourceLocator};
use crate::domain::{Symbol, TimeSeriesTable};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Result of one uncached load attempt for a symbol.
#[derive(Debug, Clone)]
pub enum LoadOutcome {
    /// A non-empty normalized table, and the file it came from.
    Loaded {
        table: Arc<TimeSeriesTable>,
        path: PathBuf,
    },
    /// No candidate file, or none could be decoded.
    NotFound,
    /// A file decoded but produced no usable rows (no Close column, no dates).
    SchemaIncomplete { path: PathBuf },
}

impl LoadOutcome {
    pub fn table(&self) -> Option<&Arc<TimeSeriesTable>> {
        match self {
            LoadOutcome::Loaded { table, .. } => Some(table),
            _ => None,
        }
    }

    pub fn into_table(self) -> Option<Arc<TimeSeriesTable>> {
        match self {
            LoadOutcome::Loaded { table, .. } => Some(table),
            _ => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadOutcome::Loaded { .. })
    }
}

/// Source of normalized tables.
pub trait TableSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Load a symbol's table. Never fails: problems surface as outcomes.
    fn fetch(&self, symbol: &Symbol) -> LoadOutcome;

    /// Files backing a symbol, most recent first.
    fn files(&self, _symbol: &Symbol) -> Vec<CandidateFile> {
        Vec::new()
    }

    /// Symbols this source can serve.
    fn symbols(&self) -> Vec<Symbol> {
        Vec::new()
    }
}

/// Loads tables from files in a single data directory.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
    locator: SourceLocator,
    loaders: FormatLoaders,
    canonicalizer: Canonicalizer,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_parts(root, FormatLoaders::default(), Canonicalizer::default())
    }

    pub fn with_parts(
        root: impl Into<PathBuf>,
        loaders: FormatLoaders,
        canonicalizer: Canonicalizer,
    ) -> Self {
        Self {
            root: root.into(),
            locator: SourceLocator::new(),
            loaders,
            canonicalizer,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn canonicalizer(&self) -> &Canonicalizer {
        &self.canonicalizer
    }

    fn candidates(&self, symbol: &Symbol) -> Vec<CandidateFile> {
        match self.locator.locate(symbol, &self.root) {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!(symbol = %symbol, error = %e, "locator failed");
                Vec::new()
            }
        }
    }
}

impl TableSource for DirectorySource {
    fn name(&self) -> &str {
        "directory"
    }

    fn fetch(&self, symbol: &Symbol) -> LoadOutcome {
        let candidates = self.candidates(symbol);
        if candidates.is_empty() {
            tracing::info!(symbol = %symbol, root = %self.root.display(), "no data files");
            return LoadOutcome::NotFound;
        }

        let mut incomplete: Option<PathBuf> = None;
        for candidate in &candidates {
            let Some(raw) = self.loaders.load(candidate) else {
                continue;
            };
            let table = self.canonicalizer.canonicalize(&raw);
            if table.is_empty() {
                tracing::warn!(
                    symbol = %symbol,
                    path = %candidate.path.display(),
                    "file has no usable rows"
                );
                incomplete.get_or_insert_with(|| candidate.path.clone());
                continue;
            }
            tracing::info!(
                symbol = %symbol,
                path = %candidate.path.display(),
                rows = table.len(),
                "loaded table"
            );
            return LoadOutcome::Loaded {
                table: Arc::new(table),
                path: candidate.path.clone(),
            };
        }

        match incomplete {
            Some(path) => LoadOutcome::SchemaIncomplete { path },
            None => LoadOutcome::NotFound,
        }
    }

    fn files(&self, symbol: &Symbol) -> Vec<CandidateFile> {
        self.candidates(symbol)
    }

    fn symbols(&self) -> Vec<Symbol> {
        match self.locator.available_symbols(&self.root) {
            Ok(symbols) => symbols,
            Err(e) => {
                tracing::warn!(root = %self.root.display(), error = %e, "failed to list symbols");
                Vec::new()
            }
        }
    }
}
