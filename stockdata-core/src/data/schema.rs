//! Canonical OHLCV schema and the header-name mapping onto it.

use crate::data::raw::RawTable;

/// Canonical columns of a time-series table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalColumn {
    Date,
    Open,
    High,
    Low,
    Close,
    Volume,
    AdjClose,
}

impl CanonicalColumn {
    pub const ALL: [CanonicalColumn; 7] = [
        CanonicalColumn::Date,
        CanonicalColumn::Open,
        CanonicalColumn::High,
        CanonicalColumn::Low,
        CanonicalColumn::Close,
        CanonicalColumn::Volume,
        CanonicalColumn::AdjClose,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CanonicalColumn::Date => "Date",
            CanonicalColumn::Open => "Open",
            CanonicalColumn::High => "High",
            CanonicalColumn::Low => "Low",
            CanonicalColumn::Close => "Close",
            CanonicalColumn::Volume => "Volume",
            CanonicalColumn::AdjClose => "Adj_Close",
        }
    }

    /// Map a source header (English or Korean) onto a canonical column.
    ///
    /// Matching ignores case, whitespace, `_`, `.` and `-`, so `Adj Close`,
    /// `adj_close` and `adj.close` all land on `AdjClose`.
    pub fn from_header(header: &str) -> Option<Self> {
        let key = header_key(header);
        let column = match key.as_str() {
            "date" | "timestamp" | "time" | "dt" | "datetime" | "날짜" | "일자" => {
                CanonicalColumn::Date
            }
            "open" | "openingprice" | "시가" => CanonicalColumn::Open,
            "high" | "highestprice" | "고가" => CanonicalColumn::High,
            "low" | "lowestprice" | "저가" => CanonicalColumn::Low,
            "close" | "closingprice" | "price" | "종가" => CanonicalColumn::Close,
            "volume" | "vol" | "tradingvolume" | "거래량" => CanonicalColumn::Volume,
            "adjclose" | "adjustedclose" | "adjusted" | "수정종가" => CanonicalColumn::AdjClose,
            _ => return None,
        };
        Some(column)
    }
}

/// Normalize a header for lookup.
pub fn header_key(header: &str) -> String {
    header
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '_' | '.' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Column positions of each canonical field in a raw table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMapping {
    pub date: Option<usize>,
    pub open: Option<usize>,
    pub high: Option<usize>,
    pub low: Option<usize>,
    pub close: Option<usize>,
    pub volume: Option<usize>,
    pub adj_close: Option<usize>,
}

impl ColumnMapping {
    /// Resolve headers left to right; the first header mapping to a column wins.
    pub fn resolve(table: &RawTable) -> Self {
        let mut mapping = Self::default();
        for (index, header) in table.headers().iter().enumerate() {
            let Some(column) = CanonicalColumn::from_header(header) else {
                continue;
            };
            let slot = mapping.slot_mut(column);
            if slot.is_none() {
                *slot = Some(index);
            }
        }
        mapping
    }

    pub fn get(&self, column: CanonicalColumn) -> Option<usize> {
        match column {
            CanonicalColumn::Date => self.date,
            CanonicalColumn::Open => self.open,
            CanonicalColumn::High => self.high,
            CanonicalColumn::Low => self.low,
            CanonicalColumn::Close => self.close,
            CanonicalColumn::Volume => self.volume,
            CanonicalColumn::AdjClose => self.adj_close,
        }
    }

    fn slot_mut(&mut self, column: CanonicalColumn) -> &mut Option<usize> {
        match column {
            CanonicalColumn::Date => &mut self.date,
            CanonicalColumn::Open => &mut self.open,
            CanonicalColumn::High => &mut self.high,
            CanonicalColumn::Low => &mut self.low,
            CanonicalColumn::Close => &mut self.close,
            CanonicalColumn::Volume => &mut self.volume,
            CanonicalColumn::AdjClose => &mut self.adj_close,
        }
    }
}
