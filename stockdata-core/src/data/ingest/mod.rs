//! Format loaders: parse a located file into a generic [`RawTable`].
//!
//! Loaders never propagate parse errors. A file that cannot be read in any
//! supported way yields `None`, which lets the pipeline move on to the next
//! candidate.

pub mod columnar;
pub mod delimited;
pub mod records;
pub mod spreadsheet;

pub use delimited::{DelimitedLoader, DelimitedPolicy, TextEncoding};

use crate::data::locator::{CandidateFile, FileFormat};
use crate::data::raw::RawTable;
use std::path::Path;

/// Dispatches a file to the loader for its format.
#[derive(Debug, Clone, Default)]
pub struct FormatLoaders {
    delimited: DelimitedLoader,
}

impl FormatLoaders {
    pub fn new(policy: DelimitedPolicy) -> Self {
        Self {
            delimited: DelimitedLoader::new(policy),
        }
    }

    pub fn delimited_policy(&self) -> &DelimitedPolicy {
        self.delimited.policy()
    }

    /// Load a candidate file. `None` means "no data".
    pub fn load(&self, candidate: &CandidateFile) -> Option<RawTable> {
        self.load_as(&candidate.path, candidate.format)
    }

    /// Load any path whose extension is supported.
    pub fn load_path(&self, path: &Path) -> Option<RawTable> {
        let format = FileFormat::from_path(path)?;
        self.load_as(path, format)
    }

    fn load_as(&self, path: &Path, format: FileFormat) -> Option<RawTable> {
        let table = match format {
            FileFormat::Delimited => match std::fs::read(path) {
                Ok(bytes) => self.delimited.load_bytes(&bytes),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to read file");
                    None
                }
            },
            FileFormat::Spreadsheet => spreadsheet::load(path),
            FileFormat::Records => records::load(path),
            FileFormat::Columnar => columnar::load(path),
        };

        match &table {
            Some(t) => tracing::debug!(
                path = %path.display(),
                ?format,
                columns = t.column_count(),
                rows = t.row_count(),
                "decoded file"
            ),
            None => tracing::warn!(path = %path.display(), ?format, "no decodable table in file"),
        }
        table
    }
}
