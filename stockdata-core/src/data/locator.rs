//! Source locator: find the files under a data root that may hold a symbol.
//!
//! A file is a candidate when its extension is supported and its stem equals
//! the symbol or starts with it (`AAPL.csv`, `aapl_230101.csv`,
//! `AAPL_data.xlsx`), compared without regard to ASCII case. Candidates come
//! back freshest first so the pipeline can fall through to older files when
//! one fails to decode.

use crate::domain::Symbol;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

/// Serialization family of a data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileFormat {
    /// Delimited text (`csv`, `tsv`, `txt`).
    Delimited,
    /// Workbook, first sheet (`xlsx`, `xlsm`, `xls`, `ods`).
    Spreadsheet,
    /// JSON array of objects or a single object.
    Records,
    /// Parquet.
    Columnar,
}

impl FileFormat {
    pub const ALL: [FileFormat; 4] = [
        FileFormat::Delimited,
        FileFormat::Spreadsheet,
        FileFormat::Records,
        FileFormat::Columnar,
    ];

    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            FileFormat::Delimited => &["csv", "tsv", "txt"],
            FileFormat::Spreadsheet => &["xlsx", "xlsm", "xls", "ods"],
            FileFormat::Records => &["json"],
            FileFormat::Columnar => &["parquet"],
        }
    }

    /// Classify a path by its extension (ASCII case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        Self::ALL.into_iter().find(|format| {
            format
                .extensions()
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
    }
}

/// A file that plausibly contains data for a symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub path: PathBuf,
    pub format: FileFormat,
    pub modified: SystemTime,
    pub size: u64,
}

impl CandidateFile {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

#[derive(Debug, Error)]
pub enum LocateError {
    #[error("failed to create data root {path}: {source}")]
    CreateRoot {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read data root {path}: {source}")]
    ReadRoot {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Enumerates candidate files for a symbol under a root directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceLocator;

impl SourceLocator {
    pub fn new() -> Self {
        Self
    }

    /// List candidates for `symbol` in `root`, most recently modified first.
    ///
    /// A missing root is created empty and yields no candidates. An empty
    /// result means "no data found" and is not an error.
    pub fn locate(&self, symbol: &Symbol, root: &Path) -> Result<Vec<CandidateFile>, LocateError> {
        let mut candidates: Vec<CandidateFile> = Self::supported_files(root)?
            .into_iter()
            .filter(|c| {
                c.path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .is_some_and(|stem| symbol.is_prefix_of(stem))
            })
            .collect();

        candidates.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.path.cmp(&b.path)));
        candidates.dedup_by(|a, b| a.path == b.path);

        tracing::debug!(
            symbol = %symbol,
            root = %root.display(),
            found = candidates.len(),
            "located candidate files"
        );
        Ok(candidates)
    }

    /// Symbols that have at least one supported file under `root`.
    ///
    /// The symbol is the leading ASCII-alphanumeric run of the file stem
    /// (`TSLA_230914.csv`, `TSLA-data.csv` and `TSLA.2023.csv` all give
    /// `TSLA`), uppercased. Stems that are not valid symbols are skipped.
    pub fn available_symbols(&self, root: &Path) -> Result<Vec<Symbol>, LocateError> {
        let symbols: BTreeSet<Symbol> = Self::supported_files(root)?
            .iter()
            .filter_map(|c| {
                let stem = c.path.file_stem()?.to_str()?;
                let head = stem.split(|c: char| !c.is_ascii_alphanumeric()).next()?;
                Symbol::parse(head).ok()
            })
            .collect();
        Ok(symbols.into_iter().collect())
    }

    /// Every regular file directly under `root` with a supported extension.
    fn supported_files(root: &Path) -> Result<Vec<CandidateFile>, LocateError> {
        if !root.exists() {
            fs::create_dir_all(root).map_err(|source| LocateError::CreateRoot {
                path: root.to_path_buf(),
                source,
            })?;
            tracing::info!(root = %root.display(), "created missing data root");
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(root).map_err(|source| LocateError::ReadRoot {
            path: root.to_path_buf(),
            source,
        })?;

        let mut files = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(format) = FileFormat::from_path(&path) else {
                continue;
            };
            let Ok(meta) = entry.metadata() else {
                continue;
            };
            if !meta.is_file() {
                continue;
            }
            files.push(CandidateFile {
                path,
                format,
                modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                size: meta.len(),
            });
        }
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, "Date,Close\n2024-01-02,1\n").unwrap();
        path
    }

    fn set_mtime(path: &Path, secs_after_epoch: u64) {
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs_after_epoch))
            .unwrap();
    }

    #[test]
    fn format_from_extension_ignores_case() {
        assert_eq!(FileFormat::from_path(Path::new("a.CSV")), Some(FileFormat::Delimited));
        assert_eq!(FileFormat::from_path(Path::new("a.xlsx")), Some(FileFormat::Spreadsheet));
        assert_eq!(FileFormat::from_path(Path::new("a.json")), Some(FileFormat::Records));
        assert_eq!(FileFormat::from_path(Path::new("a.parquet")), Some(FileFormat::Columnar));
        assert_eq!(FileFormat::from_path(Path::new("a.pdf")), None);
        assert_eq!(FileFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn locate_matches_exact_and_prefixed_names() {
        let dir = tempfile::tempdir().unwrap();
        let exact = touch(dir.path(), "AAPL.csv");
        let dated = touch(dir.path(), "aapl_230101.csv");
        let book = touch(dir.path(), "AAPL_data.xlsx");
        touch(dir.path(), "MSFT.csv");
        touch(dir.path(), "AAPL.pdf");

        let sym = Symbol::parse("aapl").unwrap();
        let found = SourceLocator::new().locate(&sym, dir.path()).unwrap();
        let mut paths: Vec<PathBuf> = found.into_iter().map(|c| c.path).collect();
        paths.sort();

        let mut expected = vec![exact, dated, book];
        expected.sort();
        assert_eq!(paths, expected);
    }

    #[test]
    fn locate_orders_most_recent_first() {
        let dir = tempfile::tempdir().unwrap();
        let old = touch(dir.path(), "TSLA_230101.csv");
        let new = touch(dir.path(), "TSLA_230914.csv");
        set_mtime(&old, 1_000);
        set_mtime(&new, 2_000);

        let sym = Symbol::parse("TSLA").unwrap();
        let found = SourceLocator::new().locate(&sym, dir.path()).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].path, new);
        assert_eq!(found[1].path, old);
    }

    #[test]
    fn locate_creates_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nested").join("data");
        let sym = Symbol::parse("ZZZZ").unwrap();

        let found = SourceLocator::new().locate(&sym, &root).unwrap();
        assert!(found.is_empty());
        assert!(root.is_dir());
        assert_eq!(fs::read_dir(&root).unwrap().count(), 0);
    }

    #[test]
    fn locate_skips_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("AAPL.csv")).unwrap();
        let sym = Symbol::parse("AAPL").unwrap();
        assert!(SourceLocator::new().locate(&sym, dir.path()).unwrap().is_empty());
    }

    #[test]
    fn available_symbols_splits_on_underscore() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "TSLA_230914.csv");
        touch(dir.path(), "tsla.json");
        touch(dir.path(), "005930.xlsx");
        touch(dir.path(), "MSFT.csv");
        touch(dir.path(), "notes.pdf");

        let symbols = SourceLocator::new().available_symbols(dir.path()).unwrap();
        let names: Vec<&str> = symbols.iter().map(|s| s.as_str()).collect();
        assert_eq!(names, vec!["005930", "MSFT", "TSLA"]);
    }

    #[test]
    fn available_symbols_stop_at_any_separator() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "AAPL-data.csv");
        touch(dir.path(), "SPY.2024.parquet");
        touch(dir.path(), "nvda data.json");

        let symbols = SourceLocator::new().available_symbols(dir.path()).unwrap();
        let names: Vec<&str> = symbols.iter().map(|s| s.as_str()).collect();
        assert_eq!(names, vec!["AAPL", "NVDA", "SPY"]);
    }
}
