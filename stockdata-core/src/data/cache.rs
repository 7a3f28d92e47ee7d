//! In-memory result cache with a fixed time-to-live.
//!
//! Entries map a symbol to the last normalized table and the instant it was
//! loaded. Expiry is lazy: an entry older than the TTL is evicted the next
//! time it is looked up, there is no background sweeper.

use super::clock::{Clock, SystemClock};
use crate::domain::{Symbol, TimeSeriesTable};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// TTL used when none is configured.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
struct CacheEntry {
    table: Arc<TimeSeriesTable>,
    loaded_at: Instant,
}

/// The result cache.
pub struct ResultCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: HashMap<Symbol, CacheEntry>,
}

impl ResultCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: HashMap::new(),
        }
    }

    /// Cache on the system clock.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self::new(ttl, Arc::new(SystemClock))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cached table, if present and younger than the TTL.
    ///
    /// An expired entry is evicted and reported absent.
    pub fn get(&mut self, symbol: &Symbol) -> Option<Arc<TimeSeriesTable>> {
        let now = self.clock.now();
        let entry = self.entries.get(symbol)?;
        if self.is_expired(entry, now) {
            tracing::debug!(symbol = %symbol, "cache entry expired");
            self.entries.remove(symbol);
            return None;
        }
        Some(Arc::clone(&entry.table))
    }

    /// Store a table stamped with the current time, replacing any previous entry.
    pub fn insert(&mut self, symbol: Symbol, table: Arc<TimeSeriesTable>) {
        let loaded_at = self.clock.now();
        self.entries.insert(symbol, CacheEntry { table, loaded_at });
    }

    /// Drop one symbol. Returns whether it was cached.
    pub fn invalidate(&mut self, symbol: &Symbol) -> bool {
        self.entries.remove(symbol).is_some()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Evict every expired entry now. Returns how many were removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now();
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.loaded_at) < ttl);
        before - self.entries.len()
    }

    /// Number of stored entries, expired ones included until they are touched.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_expired(&self, entry: &CacheEntry, now: Instant) -> bool {
        now.saturating_duration_since(entry.loaded_at) >= self.ttl
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("ttl", &self.ttl)
            .field("entries", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::clock::ManualClock;
    use crate::domain::OhlcvRow;
    use chrono::NaiveDate;

    fn sample_table() -> Arc<TimeSeriesTable> {
        Arc::new(TimeSeriesTable::new(
            vec![OhlcvRow {
                date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                open: 100.0,
                high: 102.0,
                low: 99.0,
                close: 101.0,
                volume: 1000.0,
                adj_close: None,
            }],
            false,
        ))
    }

    fn cache_with_clock() -> (ResultCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        (ResultCache::new(DEFAULT_TTL, clock.clone()), clock)
    }

    #[test]
    fn get_returns_same_instance_within_ttl() {
        let (mut cache, clock) = cache_with_clock();
        let sym = Symbol::parse("SPY").unwrap();
        let table = sample_table();

        cache.insert(sym.clone(), Arc::clone(&table));
        clock.advance(Duration::from_secs(299));

        let hit = cache.get(&sym).unwrap();
        assert!(Arc::ptr_eq(&hit, &table));
    }

    #[test]
    fn entry_expires_at_ttl() {
        let (mut cache, clock) = cache_with_clock();
        let sym = Symbol::parse("SPY").unwrap();
        cache.insert(sym.clone(), sample_table());

        clock.advance(DEFAULT_TTL);
        assert!(cache.get(&sym).is_none());
        assert!(cache.is_empty(), "expired entry should be evicted on access");
    }

    #[test]
    fn insert_refreshes_timestamp() {
        let (mut cache, clock) = cache_with_clock();
        let sym = Symbol::parse("SPY").unwrap();
        cache.insert(sym.clone(), sample_table());
        clock.advance(Duration::from_secs(200));
        cache.insert(sym.clone(), sample_table());
        clock.advance(Duration::from_secs(200));
        assert!(cache.get(&sym).is_some());
    }

    #[test]
    fn invalidate_and_clear() {
        let (mut cache, _clock) = cache_with_clock();
        let spy = Symbol::parse("SPY").unwrap();
        let qqq = Symbol::parse("QQQ").unwrap();
        cache.insert(spy.clone(), sample_table());
        cache.insert(qqq.clone(), sample_table());

        assert!(cache.invalidate(&spy));
        assert!(!cache.invalidate(&spy));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get(&qqq).is_none());
    }

    #[test]
    fn purge_expired_removes_only_stale_entries() {
        let (mut cache, clock) = cache_with_clock();
        cache.insert(Symbol::parse("OLD").unwrap(), sample_table());
        clock.advance(Duration::from_secs(240));
        cache.insert(Symbol::parse("NEW").unwrap(), sample_table());
        clock.advance(Duration::from_secs(60));

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&Symbol::parse("NEW").unwrap()).is_some());
    }
}
