//! Bounded, time-expiring cache for slow lookups.
//!
//! Entries expire a fixed time after they were written and the cache never
//! holds more than `max_entries`. When full, the entry written longest ago
//! is evicted first; reads do not change that order. Expiry is lazy: expired
//! entries are dropped when touched by `get` or when `put` needs room, so no
//! background sweeper runs.
//!
//! ```
//! use csv_search::{BoundedCache, CacheConfig};
//! use std::time::Duration;
//!
//! let cache = BoundedCache::new(CacheConfig::default().with_ttl(Duration::from_secs(60)));
//! cache.put("44", "007", "{\"rate\": 85.1}").unwrap();
//! assert_eq!(cache.get("44", "007").unwrap().as_deref(), Some("{\"rate\": 85.1}"));
//! ```

use log::{debug, trace};
use lru::LruCache;
use parking_lot::Mutex;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("cache keys and values must be non-empty")]
    InvalidKey,
}

/// Time source used for expiry.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Monotonic wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. For tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Lifetime of an entry, measured from its last write.
    pub ttl: Duration,
    pub max_entries: NonZeroUsize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(10 * 60),
            max_entries: NonZeroUsize::new(10).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

impl CacheConfig {
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_max_entries(mut self, max_entries: NonZeroUsize) -> Self {
        self.max_entries = max_entries;
        self
    }
}

/// Two-part key. Displays as the composite `primary-secondary`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub primary: String,
    pub secondary: String,
}

impl CacheKey {
    fn checked(primary: &str, secondary: &str) -> Result<Self, CacheError> {
        if primary.is_empty() || secondary.is_empty() {
            return Err(CacheError::InvalidKey);
        }
        Ok(Self {
            primary: primary.to_string(),
            secondary: secondary.to_string(),
        })
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.primary, self.secondary)
    }
}

/// Cumulative counters since the cache was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Successful `put` calls, overwrites included.
    pub inserts: u64,
    /// Entries removed for capacity or expiry. Explicit invalidation is not counted.
    pub evictions: u64,
}

impl CacheStats {
    pub fn requests(&self) -> u64 {
        self.hits + self.misses
    }

    /// Fraction of lookups that hit; 1.0 before any lookup.
    pub fn hit_rate(&self) -> f64 {
        match self.requests() {
            0 => 1.0,
            n => self.hits as f64 / n as f64,
        }
    }
}

struct Entry {
    value: String,
    written_at: Instant,
}

struct Inner {
    /// Reads only `peek`, so the LRU end is always the oldest write.
    entries: LruCache<CacheKey, Entry>,
    stats: CacheStats,
}

impl Inner {
    fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: LruCache::new(capacity),
            stats: CacheStats::default(),
        }
    }

    /// Drop expired entries. `now` is read under the lock, so write times
    /// follow write order and every expired entry sits at the LRU end.
    fn purge_expired(&mut self, now: Instant, ttl: Duration) {
        while self
            .entries
            .peek_lru()
            .is_some_and(|(_, e)| is_expired(e, now, ttl))
        {
            if let Some((key, _)) = self.entries.pop_lru() {
                trace!("expired {key}");
                self.stats.evictions += 1;
            }
        }
    }

    /// Evict the oldest write if `key` is new and the cache is full.
    fn make_room_for(&mut self, key: &CacheKey) {
        if self.entries.contains(key) || self.entries.len() < self.entries.cap().get() {
            return;
        }
        if let Some((evicted, _)) = self.entries.pop_lru() {
            trace!("evicted {evicted} for capacity");
            self.stats.evictions += 1;
        }
    }
}

fn is_expired(entry: &Entry, now: Instant, ttl: Duration) -> bool {
    now.saturating_duration_since(entry.written_at) >= ttl
}

/// Thread-safe TTL and size bounded string cache. Share it with `Arc`.
pub struct BoundedCache {
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
}

impl fmt::Debug for BoundedCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedCache")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}

impl BoundedCache {
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            inner: Mutex::new(Inner::new(config.max_entries)),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Store `value`, replacing any previous entry and restarting its TTL.
    pub fn put(&self, primary: &str, secondary: &str, value: &str) -> Result<(), CacheError> {
        if value.is_empty() {
            return Err(CacheError::InvalidKey);
        }
        let key = CacheKey::checked(primary, secondary)?;

        let mut inner = self.inner.lock();
        let now = self.clock.now();
        inner.purge_expired(now, self.config.ttl);
        inner.make_room_for(&key);
        // an overwrite moves the key to the newest end
        inner.entries.put(
            key,
            Entry {
                value: value.to_string(),
                written_at: now,
            },
        );
        inner.stats.inserts += 1;
        Ok(())
    }

    /// Look up a live entry. Does not extend its lifetime or eviction priority.
    pub fn get(&self, primary: &str, secondary: &str) -> Result<Option<String>, CacheError> {
        let key = CacheKey::checked(primary, secondary)?;

        let mut inner = self.inner.lock();
        let now = self.clock.now();
        let found = inner
            .entries
            .peek(&key)
            .map(|e| (!is_expired(e, now, self.config.ttl)).then(|| e.value.clone()));
        let live = match found {
            Some(Some(value)) => Some(value),
            Some(None) => {
                trace!("expired {key}");
                inner.entries.pop(&key);
                inner.stats.evictions += 1;
                None
            }
            None => None,
        };

        if live.is_some() {
            inner.stats.hits += 1;
        } else {
            inner.stats.misses += 1;
        }
        Ok(live)
    }

    /// Remove one entry. Returns whether it was present.
    pub fn invalidate(&self, primary: &str, secondary: &str) -> Result<bool, CacheError> {
        let key = CacheKey::checked(primary, secondary)?;
        Ok(self.inner.lock().entries.pop(&key).is_some())
    }

    /// Remove every entry. Statistics are kept.
    pub fn invalidate_all(&self) {
        let mut inner = self.inner.lock();
        debug!("invalidating {} cache entries", inner.entries.len());
        inner.entries.clear();
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let mut inner = self.inner.lock();
        let now = self.clock.now();
        inner.purge_expired(now, self.config.ttl);
        inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.lock().stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
    use std::thread;

    fn cap(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn manual(ttl: Duration, max: usize) -> (BoundedCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let config = CacheConfig::default()
            .with_ttl(ttl)
            .with_max_entries(cap(max));
        (BoundedCache::with_clock(config, clock.clone()), clock)
    }

    #[test]
    fn put_then_get() {
        let (cache, _) = manual(Duration::from_secs(1), 2);
        cache.put("CA", "001", "x").unwrap();
        assert_eq!(cache.get("CA", "001").unwrap().as_deref(), Some("x"));
    }

    #[test]
    fn missing_key_is_none() {
        let (cache, _) = manual(Duration::from_secs(1), 2);
        assert_eq!(cache.get("ZZ", "999").unwrap(), None);
    }

    #[test]
    fn entries_expire_after_ttl() {
        let (cache, clock) = manual(Duration::from_secs(1), 2);
        cache.put("CA", "001", "x").unwrap();
        clock.advance(Duration::from_millis(999));
        assert!(cache.get("CA", "001").unwrap().is_some());
        clock.advance(Duration::from_millis(1));
        assert_eq!(cache.get("CA", "001").unwrap(), None);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn entries_expire_on_the_system_clock() {
        let cache = BoundedCache::new(
            CacheConfig::default()
                .with_ttl(Duration::from_millis(20))
                .with_max_entries(cap(2)),
        );
        cache.put("CA", "001", "x").unwrap();
        thread::sleep(Duration::from_millis(60));
        assert_eq!(cache.get("CA", "001").unwrap(), None);
    }

    #[test]
    fn capacity_evicts_oldest_write() {
        let (cache, _) = manual(Duration::from_secs(60), 2);
        cache.put("CA", "001", "a").unwrap();
        cache.put("NY", "001", "b").unwrap();
        cache.put("TX", "001", "c").unwrap();
        assert_eq!(cache.get("CA", "001").unwrap(), None);
        assert_eq!(cache.get("NY", "001").unwrap().as_deref(), Some("b"));
        assert_eq!(cache.get("TX", "001").unwrap().as_deref(), Some("c"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn reads_do_not_refresh_eviction_order() {
        let (cache, _) = manual(Duration::from_secs(60), 2);
        cache.put("A", "1", "a").unwrap();
        cache.put("B", "1", "b").unwrap();
        // an LRU would now keep A and drop B
        assert!(cache.get("A", "1").unwrap().is_some());
        cache.put("C", "1", "c").unwrap();
        assert_eq!(cache.get("A", "1").unwrap(), None);
        assert!(cache.get("B", "1").unwrap().is_some());
    }

    #[test]
    fn overwrite_replaces_value_and_write_order() {
        let (cache, clock) = manual(Duration::from_secs(10), 2);
        cache.put("A", "1", "old").unwrap();
        cache.put("B", "1", "b").unwrap();
        clock.advance(Duration::from_secs(6));
        cache.put("A", "1", "new").unwrap();
        assert_eq!(cache.len(), 2);

        cache.put("C", "1", "c").unwrap();
        assert_eq!(cache.get("B", "1").unwrap(), None);
        assert_eq!(cache.get("A", "1").unwrap().as_deref(), Some("new"));

        // the overwrite restarted A's lifetime
        clock.advance(Duration::from_secs(6));
        assert_eq!(cache.get("A", "1").unwrap().as_deref(), Some("new"));
    }

    #[test]
    fn expired_entries_do_not_take_capacity() {
        let (cache, clock) = manual(Duration::from_secs(1), 2);
        cache.put("A", "1", "a").unwrap();
        clock.advance(Duration::from_millis(500));
        cache.put("B", "1", "b").unwrap();
        clock.advance(Duration::from_millis(600));
        // A has expired; inserting C must not evict the live B
        cache.put("C", "1", "c").unwrap();
        assert!(cache.get("B", "1").unwrap().is_some());
        assert!(cache.get("C", "1").unwrap().is_some());
    }

    #[test]
    fn empty_arguments_are_rejected() {
        let (cache, _) = manual(Duration::from_secs(1), 2);
        assert_eq!(cache.put("", "001", "x"), Err(CacheError::InvalidKey));
        assert_eq!(cache.put("CA", "", "x"), Err(CacheError::InvalidKey));
        assert_eq!(cache.put("CA", "001", ""), Err(CacheError::InvalidKey));
        assert_eq!(cache.get("", "001"), Err(CacheError::InvalidKey));
        assert_eq!(cache.get("CA", ""), Err(CacheError::InvalidKey));
        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[test]
    fn invalidate_all_empties_cache() {
        let (cache, _) = manual(Duration::from_secs(1), 4);
        cache.put("CA", "001", "x").unwrap();
        cache.put("NY", "001", "y").unwrap();
        cache.invalidate_all();
        assert!(cache.is_empty());
        assert_eq!(cache.get("CA", "001").unwrap(), None);
        assert_eq!(cache.stats().inserts, 2);
    }

    #[test]
    fn invalidate_single_key() {
        let (cache, _) = manual(Duration::from_secs(1), 4);
        cache.put("CA", "001", "x").unwrap();
        assert!(cache.invalidate("CA", "001").unwrap());
        assert!(!cache.invalidate("CA", "001").unwrap());
        assert_eq!(cache.get("CA", "001").unwrap(), None);
    }

    #[test]
    fn stats_track_hits_misses_inserts() {
        let (cache, _) = manual(Duration::from_secs(1), 2);
        cache.put("CA", "001", "x").unwrap();
        cache.get("CA", "001").unwrap();
        cache.get("CA", "999").unwrap();
        let stats = cache.stats();
        assert_eq!(
            stats,
            CacheStats {
                hits: 1,
                misses: 1,
                inserts: 1,
                evictions: 0,
            }
        );
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn parts_do_not_collide_across_the_separator() {
        let (cache, _) = manual(Duration::from_secs(1), 4);
        cache.put("a-b", "c", "first").unwrap();
        cache.put("a", "b-c", "second").unwrap();
        assert_eq!(cache.get("a-b", "c").unwrap().as_deref(), Some("first"));
        assert_eq!(cache.get("a", "b-c").unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn composite_key_display() {
        let key = CacheKey::checked("CA", "001").unwrap();
        assert_eq!(key.to_string(), "CA-001");
    }

    #[test]
    fn concurrent_writers_respect_capacity() {
        let cache = Arc::new(BoundedCache::new(
            CacheConfig::default().with_max_entries(cap(16)),
        ));
        thread::scope(|s| {
            for t in 0..8 {
                let cache = Arc::clone(&cache);
                s.spawn(move || {
                    for i in 0..100 {
                        let county = format!("{i:03}");
                        cache.put(&format!("S{t}"), &county, "v").unwrap();
                        let _ = cache.get(&format!("S{t}"), &county).unwrap();
                        assert!(cache.len() <= 16);
                    }
                });
            }
        });
        let stats = cache.stats();
        assert_eq!(stats.inserts, 800);
        assert_eq!(stats.evictions, 800 - 16);
        assert_eq!(cache.len(), 16);
    }

    /// Hands out strictly increasing instants and yields mid-read, so a
    /// clock read taken outside the lock would race with other writers.
    struct TickingClock {
        base: Instant,
        ticks: AtomicU64,
    }

    impl Clock for TickingClock {
        fn now(&self) -> Instant {
            let tick = self.ticks.fetch_add(1, AtomicOrdering::SeqCst);
            thread::yield_now();
            self.base + Duration::from_millis(tick)
        }
    }

    #[test]
    fn write_times_follow_eviction_order_under_contention() {
        let clock = Arc::new(TickingClock {
            base: Instant::now(),
            ticks: AtomicU64::new(0),
        });
        let cache = BoundedCache::with_clock(
            CacheConfig::default()
                .with_ttl(Duration::from_secs(3600))
                .with_max_entries(cap(64)),
            clock,
        );
        thread::scope(|s| {
            for t in 0..8 {
                let cache = &cache;
                s.spawn(move || {
                    for i in 0..200 {
                        cache.put(&format!("S{t}"), &format!("{i:03}"), "v").unwrap();
                    }
                });
            }
        });

        let inner = cache.inner.lock();
        let written: Vec<Instant> = inner.entries.iter().rev().map(|(_, e)| e.written_at).collect();
        assert_eq!(written.len(), 64);
        assert!(written.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn expired_oldest_write_frees_its_slot_for_live_entries() {
        let (cache, clock) = manual(Duration::from_secs(11), 2);
        cache.put("Y", "1", "y").unwrap();
        clock.advance(Duration::from_secs(10));
        cache.put("X", "1", "x").unwrap();
        clock.advance(Duration::from_secs(2));
        // Y is 12s old and gone; X (2s) must survive inserting Z
        cache.put("Z", "1", "z").unwrap();
        assert_eq!(cache.get("Y", "1").unwrap(), None);
        assert_eq!(cache.get("X", "1").unwrap().as_deref(), Some("x"));
        assert_eq!(cache.get("Z", "1").unwrap().as_deref(), Some("z"));
        assert_eq!(cache.stats().evictions, 1);
    }
}
