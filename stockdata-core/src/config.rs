//! Loader configuration, read from TOML.
//!
//! ```toml
//! root = "data"
//! cache_ttl_secs = 300
//! default_volume = 1000000.0
//!
//! [delimited]
//! encodings = ["utf-8", "cp949", "euc-kr", "latin1"]
//! delimiters = [",", "\t", ";", "|"]
//! min_columns_exclusive = 3
//! ```
//!
//! Every key is optional; missing keys take the defaults shown above.

use crate::data::canonicalize::{NormalizePolicy, DEFAULT_VOLUME};
use crate::data::ingest::DelimitedPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Data directory scanned for symbol files.
    pub root: PathBuf,
    pub cache_ttl_secs: u64,
    /// Volume substituted when a source row has none.
    pub default_volume: f64,
    pub delimited: DelimitedPolicy,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("data"),
            cache_ttl_secs: 300,
            default_volume: DEFAULT_VOLUME,
            delimited: DelimitedPolicy::default(),
        }
    }
}

impl LoaderConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn normalize_policy(&self) -> NormalizePolicy {
        NormalizePolicy {
            default_volume: self.default_volume,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.default_volume.is_finite() || self.default_volume < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "default_volume must be a non-negative number, got {}",
                self.default_volume
            )));
        }
        if self.delimited.encodings.is_empty() {
            return Err(ConfigError::Invalid("delimited.encodings is empty".into()));
        }
        if self.delimited.delimiters.is_empty() {
            return Err(ConfigError::Invalid("delimited.delimiters is empty".into()));
        }
        if let Some(d) = self.delimited.delimiters.iter().find(|d| !d.is_ascii()) {
            return Err(ConfigError::Invalid(format!(
                "delimiter {d:?} is not an ASCII character"
            )));
        }
        Ok(())
    }
}
