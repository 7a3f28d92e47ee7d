//! Symbol: the ticker that keys file lookup and the result cache.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Uppercase ticker identifying one instrument (e.g. `AAPL`, `005930`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

/// Invalid symbol arguments. These are caller bugs, not data problems.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SymbolError {
    #[error("symbol is empty")]
    Empty,

    #[error("symbol '{0}' contains whitespace or a path separator")]
    InvalidCharacter(String),
}

impl Symbol {
    /// Trim and uppercase a ticker string.
    pub fn parse(raw: &str) -> Result<Self, SymbolError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(SymbolError::Empty);
        }
        if trimmed
            .chars()
            .any(|c| c.is_whitespace() || c == '/' || c == '\\')
        {
            return Err(SymbolError::InvalidCharacter(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when `stem` equals this symbol or starts with it, ignoring ASCII case.
    pub fn is_prefix_of(&self, stem: &str) -> bool {
        let n = self.0.len();
        stem.len() >= n
            && stem.is_char_boundary(n)
            && stem[..n].eq_ignore_ascii_case(&self.0)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Symbol {
    type Error = SymbolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}

impl std::str::FromStr for Symbol {
    type Err = SymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
