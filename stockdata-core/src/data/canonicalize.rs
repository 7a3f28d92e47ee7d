//! Canonicalizer: map a raw record set onto the canonical OHLCV table.
//!
//! The missing-data policy is lossy on purpose so downstream consumers never
//! see a missing field:
//! - rows without a numeric Close are dropped
//! - a missing Open, High or Low takes that row's Close
//! - a missing Volume takes [`NormalizePolicy::default_volume`]
//!
//! Nothing here fails. Unusable input (no Close column, no date column)
//! produces an empty table.

use crate::data::raw::{Cell, RawTable};
use crate::data::schema::{CanonicalColumn, ColumnMapping};
use crate::domain::{OhlcvRow, TimeSeriesTable};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::sync::OnceLock;

/// Volume assumed for rows whose source has none.
pub const DEFAULT_VOLUME: f64 = 1_000_000.0;

const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%m/%d/%Y", "%Y년 %m월 %d일"];

/// Years accepted from numeric and compact date encodings.
const PLAUSIBLE_YEARS: RangeInclusive<i32> = 1900..=2200;

const DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y.%m.%d %H:%M:%S",
];

/// Substitution constants for the missing-data policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizePolicy {
    pub default_volume: f64,
}

impl Default for NormalizePolicy {
    fn default() -> Self {
        Self {
            default_volume: DEFAULT_VOLUME,
        }
    }
}

/// Canonicalizer for raw tabular data
#[derive(Debug, Clone, Default)]
pub struct Canonicalizer {
    policy: NormalizePolicy,
}

impl Canonicalizer {
    pub fn new(policy: NormalizePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &NormalizePolicy {
        &self.policy
    }

    /// Canonicalize: map headers, parse dates, coerce numbers, fill, sort, dedupe.
    pub fn canonicalize(&self, raw: &RawTable) -> TimeSeriesTable {
        let mapping = ColumnMapping::resolve(raw);

        let Some(close_idx) = mapping.close else {
            tracing::debug!(headers = ?raw.headers(), "no close column");
            return TimeSeriesTable::empty();
        };
        let Some(date_idx) = mapping.date.or_else(|| infer_date_column(raw)) else {
            tracing::debug!(headers = ?raw.headers(), "no date column");
            return TimeSeriesTable::empty();
        };

        let mut rows = Vec::with_capacity(raw.row_count());
        let mut missing_close = 0usize;
        let mut bad_date = 0usize;

        for cells in raw.rows() {
            let Some(close) = coerce_number(&cells[close_idx]) else {
                missing_close += 1;
                continue;
            };
            let Some(date) = parse_date(&cells[date_idx]) else {
                bad_date += 1;
                continue;
            };
            let field = |idx: Option<usize>| idx.and_then(|i| coerce_number(&cells[i]));

            rows.push(OhlcvRow {
                date,
                open: field(mapping.open).unwrap_or(close),
                high: field(mapping.high).unwrap_or(close),
                low: field(mapping.low).unwrap_or(close),
                close,
                volume: field(mapping.volume).unwrap_or(self.policy.default_volume),
                adj_close: field(mapping.adj_close),
            });
        }

        let table = TimeSeriesTable::new(rows, mapping.adj_close.is_some());
        tracing::debug!(
            rows_in = raw.row_count(),
            rows_out = table.len(),
            missing_close,
            bad_date,
            "canonicalized table"
        );
        table
    }

    /// Detect anomalies (zero volume, inverted ranges, substituted volume)
    pub fn detect_anomalies(&self, table: &TimeSeriesTable) -> Vec<AnomalyReport> {
        let mut anomalies = Vec::new();
        let rows = table.rows();

        let zero_volume = rows.iter().filter(|r| r.volume == 0.0).count();
        if zero_volume > 0 {
            anomalies.push(AnomalyReport {
                anomaly_type: AnomalyType::ZeroVolume,
                count: zero_volume,
                severity: Severity::Warning,
            });
        }

        let inverted = rows.iter().filter(|r| r.high < r.low).count();
        if inverted > 0 {
            anomalies.push(AnomalyReport {
                anomaly_type: AnomalyType::InvertedRange,
                count: inverted,
                severity: Severity::Error,
            });
        }

        let defaulted = rows
            .iter()
            .filter(|r| r.volume == self.policy.default_volume)
            .count();
        if defaulted > 0 {
            anomalies.push(AnomalyReport {
                anomaly_type: AnomalyType::DefaultVolume,
                count: defaulted,
                severity: Severity::Info,
            });
        }

        anomalies
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyReport {
    pub anomaly_type: AnomalyType,
    pub count: usize,
    pub severity: Severity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnomalyType {
    ZeroVolume,
    InvertedRange,
    /// Volume equals the substitution sentinel, so it was probably missing.
    DefaultVolume,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Coerce a cell to a finite number; anything else is missing.
///
/// Text may carry surrounding whitespace and `,` thousands grouping
/// (`1,234,567.5`). Any other comma (a decimal comma such as `1,5`) makes the
/// value missing rather than guessing at its scale.
pub fn coerce_number(cell: &Cell) -> Option<f64> {
    let value = match cell {
        Cell::Number(n) => *n,
        Cell::Text(s) => {
            let s = s.trim();
            if s.contains(',') {
                if !is_thousands_grouped(s) {
                    return None;
                }
                s.replace(',', "").parse::<f64>().ok()?
            } else {
                s.parse::<f64>().ok()?
            }
        }
        Cell::Empty | Cell::Bool(_) | Cell::DateTime(_) => return None,
    };
    value.is_finite().then_some(value)
}

fn is_thousands_grouped(s: &str) -> bool {
    static GROUPED: OnceLock<Option<Regex>> = OnceLock::new();
    GROUPED
        .get_or_init(|| Regex::new(r"^[+-]?\d{1,3}(,\d{3})+(\.\d+)?$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(s))
}

/// Parse a cell into a calendar date.
pub fn parse_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::DateTime(dt) => Some(dt.date()),
        Cell::Number(n) => date_from_number(*n),
        Cell::Text(s) => date_from_text(s),
        Cell::Empty | Cell::Bool(_) => None,
    }
}

/// `YYYYMMDD`, `YYYYMMDDHHMMSS`, epoch milliseconds (>= 1e11) or epoch
/// seconds (>= 1e9). Epoch results outside 1900..=2200 are rejected.
fn date_from_number(n: f64) -> Option<NaiveDate> {
    if !n.is_finite() || n < 0.0 {
        return None;
    }
    if n.fract() == 0.0 && n < 1e14 {
        let digits = format!("{}", n as u64);
        if digits.len() == 8 || digits.len() == 14 {
            return date_from_compact(&digits);
        }
    }
    let date = if n >= 1e11 {
        DateTime::from_timestamp_millis(n as i64)?.date_naive()
    } else if n >= 1e9 {
        DateTime::from_timestamp(n as i64, 0)?.date_naive()
    } else {
        return None;
    };
    PLAUSIBLE_YEARS.contains(&date.year()).then_some(date)
}

/// `YYYYMMDD` or `YYYYMMDDHHMMSS` as an all-digit string.
fn date_from_compact(digits: &str) -> Option<NaiveDate> {
    let field = |range: std::ops::Range<usize>| digits.get(range)?.parse::<u32>().ok();
    let date = NaiveDate::from_ymd_opt(field(0..4)? as i32, field(4..6)?, field(6..8)?)?;
    match digits.len() {
        8 => {}
        14 => {
            NaiveTime::from_hms_opt(field(8..10)?, field(10..12)?, field(12..14)?)?;
        }
        _ => return None,
    }
    PLAUSIBLE_YEARS.contains(&date.year()).then_some(date)
}

fn date_from_text(text: &str) -> Option<NaiveDate> {
    let s = text.trim();
    if s.is_empty() {
        return None;
    }
    if s.bytes().all(|b| b.is_ascii_digit()) {
        return match s.len() {
            8 | 14 => date_from_compact(s),
            _ => s.parse::<f64>().ok().and_then(date_from_number),
        };
    }
    if let Some(date) = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
    {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.date())
}

/// Fall back to the first column when it is unmapped and mostly dates
/// (an index column written by an earlier export).
fn infer_date_column(raw: &RawTable) -> Option<usize> {
    let header = raw.headers().first()?;
    if CanonicalColumn::from_header(header).is_some() {
        return None;
    }
    let (present, parsed) = raw
        .column(0)
        .filter(|c| !c.is_empty())
        .fold((0usize, 0usize), |(present, parsed), cell| {
            (present + 1, parsed + usize::from(parse_date(cell).is_some()))
        });
    (present > 0 && parsed * 2 >= present).then_some(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|v| Cell::text(v)).collect())
                .collect(),
        )
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn canonicalize_maps_korean_headers() {
        let raw = text_table(
            &["날짜", "시가", "고가", "저가", "종가", "거래량"],
            &[&["2023-09-14", "100", "110", "95", "105", "5000"]],
        );
        let table = Canonicalizer::default().canonicalize(&raw);
        assert_eq!(table.len(), 1);
        let row = &table.rows()[0];
        assert_eq!(row.date, ymd(2023, 9, 14));
        assert_eq!((row.open, row.high, row.low, row.close, row.volume), (100.0, 110.0, 95.0, 105.0, 5000.0));
        assert_eq!(row.adj_close, None);
        assert!(!table.has_adj_close());
    }

    #[test]
    fn canonicalize_sorts_data() {
        let raw = text_table(
            &["Date", "Close"],
            &[&["2024-01-03", "3"], &["2024-01-01", "1"], &["2024-01-02", "2"]],
        );
        let table = Canonicalizer::default().canonicalize(&raw);
        assert_eq!(table.closes(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn canonicalize_removes_duplicate_dates_keeping_first() {
        let raw = text_table(
            &["Date", "Close"],
            &[&["2024-01-01", "1"], &["2024-01-01", "9"], &["2024-01-02", "2"]],
        );
        let table = Canonicalizer::default().canonicalize(&raw);
        assert_eq!(table.closes(), vec![1.0, 2.0]);
    }

    #[test]
    fn rows_without_close_are_dropped() {
        let raw = text_table(
            &["Date", "Open", "Close"],
            &[&["2024-01-01", "1", ""], &["2024-01-02", "2", "n/a"], &["2024-01-03", "3", "3.5"]],
        );
        let table = Canonicalizer::default().canonicalize(&raw);
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].date, ymd(2024, 1, 3));
    }

    #[test]
    fn missing_fields_are_substituted() {
        // Known approximation: open/high/low borrow close, volume gets the sentinel.
        let raw = text_table(&["Date", "Close", "High"], &[&["2024-01-02", "10", ""]]);
        let table = Canonicalizer::default().canonicalize(&raw);
        let row = &table.rows()[0];
        assert_eq!(row.open, 10.0);
        assert_eq!(row.high, 10.0);
        assert_eq!(row.low, 10.0);
        assert_eq!(row.volume, DEFAULT_VOLUME);
    }

    #[test]
    fn custom_default_volume() {
        let raw = text_table(&["Date", "Close"], &[&["2024-01-02", "10"]]);
        let table = Canonicalizer::new(NormalizePolicy { default_volume: 0.0 }).canonicalize(&raw);
        assert_eq!(table.rows()[0].volume, 0.0);
    }

    #[test]
    fn no_close_column_is_empty() {
        let raw = text_table(&["Date", "Open"], &[&["2024-01-02", "10"]]);
        assert!(Canonicalizer::default().canonicalize(&raw).is_empty());
    }

    #[test]
    fn no_date_column_is_empty() {
        let raw = text_table(&["Ticker", "Close"], &[&["AAPL", "10"]]);
        assert!(Canonicalizer::default().canonicalize(&raw).is_empty());
    }

    #[test]
    fn unnamed_index_column_is_used_as_date() {
        let raw = text_table(&["", "Close"], &[&["2024-01-02", "10"], &["2024-01-03", "11"]]);
        let table = Canonicalizer::default().canonicalize(&raw);
        assert_eq!(table.len(), 2);
        assert_eq!(table.last_date(), Some(ymd(2024, 1, 3)));
    }

    #[test]
    fn adj_close_is_carried_when_present() {
        let raw = text_table(&["Date", "Close", "Adj Close"], &[&["2024-01-02", "10", "9.5"], &["2024-01-03", "11", ""]]);
        let table = Canonicalizer::default().canonicalize(&raw);
        assert!(table.has_adj_close());
        assert_eq!(table.rows()[0].adj_close, Some(9.5));
        assert_eq!(table.rows()[1].adj_close, None);
    }

    #[test]
    fn coerce_number_handles_grouping_and_garbage() {
        assert_eq!(coerce_number(&Cell::Text("1,234,567".into())), Some(1_234_567.0));
        assert_eq!(coerce_number(&Cell::Text(" 12.5 ".into())), Some(12.5));
        assert_eq!(coerce_number(&Cell::Text("abc".into())), None);
        assert_eq!(coerce_number(&Cell::Text("NaN".into())), None);
        assert_eq!(coerce_number(&Cell::Number(f64::INFINITY)), None);
        assert_eq!(coerce_number(&Cell::Bool(true)), None);
        assert_eq!(coerce_number(&Cell::Empty), None);
    }

    #[test]
    fn decimal_commas_are_missing_not_rescaled() {
        assert_eq!(coerce_number(&Cell::Text("1,5".into())), None);
        assert_eq!(coerce_number(&Cell::Text("1,23".into())), None);
        assert_eq!(coerce_number(&Cell::Text("12,3456".into())), None);
        assert_eq!(coerce_number(&Cell::Text("1,234.5".into())), Some(1234.5));
        assert_eq!(coerce_number(&Cell::Text("-12,345".into())), Some(-12345.0));
    }

    #[test]
    fn semicolon_export_with_decimal_commas_drops_rows() {
        let loader = crate::data::ingest::DelimitedLoader::default();
        let raw = loader
            .load_bytes("Date;Open;High;Low;Close\n2024-01-02;1,5;2,0;1,0;1,8\n2024-01-03;1;2;1;1.5\n".as_bytes())
            .unwrap();
        let table = Canonicalizer::default().canonicalize(&raw);

        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].date, ymd(2024, 1, 3));
        assert_eq!(table.rows()[0].close, 1.5);
    }

    #[test]
    fn parse_date_accepts_common_layouts() {
        let expected = Some(ymd(2023, 9, 14));
        for text in [
            "2023-09-14",
            "2023/09/14",
            "2023.09.14",
            "20230914",
            "09/14/2023",
            "2023년 09월 14일",
            "2023-09-14 15:30:00",
            "2023-09-14T15:30:00.123",
            "2023-09-14T00:00:00+00:00",
        ] {
            assert_eq!(parse_date(&Cell::Text(text.into())), expected, "layout {text}");
        }
    }

    #[test]
    fn parse_date_accepts_numbers() {
        assert_eq!(parse_date(&Cell::Number(20230914.0)), Some(ymd(2023, 9, 14)));
        assert_eq!(parse_date(&Cell::Number(1_694_649_600_000.0)), Some(ymd(2023, 9, 14)));
        assert_eq!(parse_date(&Cell::Number(1_694_649_600.0)), Some(ymd(2023, 9, 14)));
        assert_eq!(parse_date(&Cell::Number(42.0)), None);
        assert_eq!(parse_date(&Cell::Text("not a date".into())), None);
    }

    #[test]
    fn compact_timestamps_parse_and_implausible_epochs_are_rejected() {
        assert_eq!(parse_date(&Cell::Text("20230914153000".into())), Some(ymd(2023, 9, 14)));
        assert_eq!(parse_date(&Cell::Number(20230914153000.0)), Some(ymd(2023, 9, 14)));
        assert_eq!(parse_date(&Cell::Text("20231314153000".into())), None);
        assert_eq!(parse_date(&Cell::Text("20230914256000".into())), None);
        // 12 digits: epoch milliseconds in 1973, accepted
        assert_eq!(parse_date(&Cell::Text("100000000000".into())), Some(ymd(1973, 3, 3)));
        // 15 digits: epoch milliseconds far past 2200
        assert_eq!(parse_date(&Cell::Text("999999999999999".into())), None);
    }

    #[test]
    fn detect_anomalies_flags_zero_and_default_volume() {
        let raw = text_table(
            &["Date", "Close", "Volume", "High", "Low"],
            &[
                &["2024-01-01", "10", "0", "11", "9"],
                &["2024-01-02", "10", "", "11", "9"],
                &["2024-01-03", "10", "500", "8", "9"],
            ],
        );
        let canonicalizer = Canonicalizer::default();
        let table = canonicalizer.canonicalize(&raw);
        let anomalies = canonicalizer.detect_anomalies(&table);

        assert_eq!(anomalies.len(), 3);
        assert_eq!(anomalies[0].anomaly_type, AnomalyType::ZeroVolume);
        assert_eq!(anomalies[0].count, 1);
        assert_eq!(anomalies[1].anomaly_type, AnomalyType::InvertedRange);
        assert_eq!(anomalies[1].severity, Severity::Error);
        assert_eq!(anomalies[2].anomaly_type, AnomalyType::DefaultVolume);
    }
}
