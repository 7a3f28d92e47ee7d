//! Delimited-text loader with a tolerant encoding/delimiter trial policy.
//!
//! Real-world exports disagree on encoding (UTF-8, CP949/EUC-KR, Latin-1)
//! and delimiter. Rather than failing fast, the loader walks a fixed trial
//! order and accepts the first table that "looks right", meaning it has more
//! than a minimal number of columns.

use crate::data::raw::{Cell, RawTable};
use serde::{Deserialize, Serialize};

/// Text encodings tried when decoding delimited files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextEncoding {
    #[serde(rename = "utf-8")]
    Utf8,
    #[serde(rename = "cp949")]
    Cp949,
    #[serde(rename = "euc-kr")]
    EucKr,
    #[serde(rename = "latin1")]
    Latin1,
}

impl TextEncoding {
    fn encoding(self) -> &'static encoding_rs::Encoding {
        match self {
            TextEncoding::Utf8 => encoding_rs::UTF_8,
            // encoding_rs's EUC-KR is the CP949 superset.
            TextEncoding::Cp949 | TextEncoding::EucKr => encoding_rs::EUC_KR,
            TextEncoding::Latin1 => encoding_rs::WINDOWS_1252,
        }
    }

    /// Strict decode: `None` on any malformed byte sequence.
    pub fn decode(self, bytes: &[u8]) -> Option<String> {
        let text = self
            .encoding()
            .decode_without_bom_handling_and_without_replacement(bytes)?;
        Some(text.trim_start_matches('\u{feff}').to_string())
    }
}

/// The trial order and acceptance heuristic for delimited text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelimitedPolicy {
    /// Encodings, tried in order.
    pub encodings: Vec<TextEncoding>,
    /// Delimiters, tried in order for each encoding. Must be ASCII.
    pub delimiters: Vec<char>,
    /// A trial is accepted once it yields strictly more columns than this.
    pub min_columns_exclusive: usize,
}

impl Default for DelimitedPolicy {
    fn default() -> Self {
        Self {
            encodings: vec![
                TextEncoding::Utf8,
                TextEncoding::Cp949,
                TextEncoding::EucKr,
                TextEncoding::Latin1,
            ],
            delimiters: vec![',', '\t', ';', '|'],
            min_columns_exclusive: 3,
        }
    }
}

impl DelimitedPolicy {
    /// Every (encoding, delimiter) pair in trial order.
    pub fn trials(&self) -> impl Iterator<Item = (TextEncoding, char)> + '_ {
        self.encodings
            .iter()
            .flat_map(move |&enc| self.delimiters.iter().map(move |&d| (enc, d)))
    }

    pub fn looks_right(&self, table: &RawTable) -> bool {
        table.column_count() > self.min_columns_exclusive
    }
}

/// Loads delimited text according to a [`DelimitedPolicy`].
#[derive(Debug, Clone, Default)]
pub struct DelimitedLoader {
    policy: DelimitedPolicy,
}

impl DelimitedLoader {
    pub fn new(policy: DelimitedPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &DelimitedPolicy {
        &self.policy
    }

    /// Run the trial order over raw file bytes.
    ///
    /// Returns the first trial that looks right. When none does, falls back
    /// to the parsed trial with the most columns (earliest wins ties), and
    /// `None` when no trial parsed at all.
    pub fn load_bytes(&self, bytes: &[u8]) -> Option<RawTable> {
        let mut fallback: Option<RawTable> = None;
        let mut decoded: Option<(TextEncoding, Option<String>)> = None;

        for (encoding, delimiter) in self.policy.trials() {
            if decoded.as_ref().map(|(e, _)| *e) != Some(encoding) {
                decoded = Some((encoding, encoding.decode(bytes)));
            }
            let Some((_, Some(text))) = decoded.as_ref() else {
                tracing::debug!(?encoding, "decode failed");
                continue;
            };

            let Some(table) = parse_delimited(text, delimiter) else {
                tracing::debug!(?encoding, ?delimiter, "parse failed");
                continue;
            };

            if self.policy.looks_right(&table) {
                tracing::debug!(
                    ?encoding,
                    ?delimiter,
                    columns = table.column_count(),
                    "delimited trial accepted"
                );
                return Some(table);
            }

            if fallback
                .as_ref()
                .map_or(true, |best| table.column_count() > best.column_count())
            {
                fallback = Some(table);
            }
        }

        fallback
    }
}

/// Parse decoded text with one delimiter. The first record is the header.
///
/// Rows wider than the header fail the parse; narrower rows are padded.
pub fn parse_delimited(text: &str, delimiter: char) -> Option<RawTable> {
    if !delimiter.is_ascii() {
        return None;
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .ok()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        return None;
    }

    let width = headers.len();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.ok()?;
        if record.len() > width {
            return None;
        }
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        rows.push(record.iter().map(Cell::text).collect());
    }

    Some(RawTable::new(headers, rows))
}
