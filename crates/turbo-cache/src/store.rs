//! In-memory map with per-entry TTL.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

/// Source of "now" for freshness checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock backed by `Instant::now`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
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

    /// Move the clock forward.
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

/// TTL class of a cached value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TtlClass {
    /// Seconds. Session-sensitive data such as the live cart.
    Short,
    /// Minutes. Catalog data.
    Long,
}

/// Durations for each TTL class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TtlConfig {
    pub short_ttl_secs: u64,
    pub long_ttl_secs: u64,
}

impl TtlConfig {
    pub fn duration(&self, class: TtlClass) -> Duration {
        match class {
            TtlClass::Short => Duration::from_secs(self.short_ttl_secs),
            TtlClass::Long => Duration::from_secs(self.long_ttl_secs),
        }
    }
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            short_ttl_secs: 5,
            long_ttl_secs: 300,
        }
    }
}

/// A cached value with its insertion time.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub cached_at: Instant,
    pub ttl: Duration,
}

impl<V> CacheEntry<V> {
    /// `now - cached_at < ttl`.
    pub fn is_fresh(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.cached_at) < self.ttl
    }
}

/// Generic TTL cache.
///
/// Reading a stale entry never deletes it: callers decide whether to serve
/// it while refreshing or to force a refresh. Only `prune_expired` and the
/// `invalidate*` methods remove entries. There is no size-based eviction.
///
/// # Example
///
/// ```rust
/// use turbo_cache::{CacheStore, TtlClass};
///
/// let cache: CacheStore<String, u32> = CacheStore::new();
/// cache.set_class("cart".to_string(), 3, TtlClass::Short);
/// assert!(cache.is_fresh(&"cart".to_string()));
/// assert_eq!(cache.get(&"cart".to_string()), Some(3));
/// ```
pub struct CacheStore<K, V> {
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    ttls: TtlConfig,
    clock: Arc<dyn Clock>,
}

impl<K, V> CacheStore<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Create a store with default TTLs and the system clock.
    pub fn new() -> Self {
        Self::with_config(TtlConfig::default())
    }

    /// Create a store with the given TTL classes.
    pub fn with_config(ttls: TtlConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttls,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Get a value, fresh or stale. No side effects.
    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.read().get(key).map(|e| e.value.clone())
    }

    /// Get a value only if it is still fresh.
    pub fn get_fresh(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        self.entries
            .read()
            .get(key)
            .filter(|e| e.is_fresh(now))
            .map(|e| e.value.clone())
    }

    /// Store a value with an explicit TTL.
    pub fn set(&self, key: K, value: V, ttl: Duration) {
        let entry = CacheEntry {
            value,
            cached_at: self.clock.now(),
            ttl,
        };
        self.entries.write().insert(key, entry);
    }

    /// Store a value with the TTL of a class.
    pub fn set_class(&self, key: K, value: V, class: TtlClass) {
        self.set(key, value, self.ttls.duration(class));
    }

    /// Whether the key is present and not expired.
    pub fn is_fresh(&self, key: &K) -> bool {
        let now = self.clock.now();
        self.entries
            .read()
            .get(key)
            .map(|e| e.is_fresh(now))
            .unwrap_or(false)
    }

    /// Remove one entry.
    pub fn invalidate(&self, key: &K) {
        self.entries.write().remove(key);
    }

    /// Remove every entry.
    pub fn invalidate_all(&self) {
        self.entries.write().clear();
    }

    /// Drop expired entries, returning how many were removed.
    pub fn prune_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, e| e.is_fresh(now));
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// The configured TTL classes.
    pub fn ttls(&self) -> TtlConfig {
        self.ttls
    }
}

impl<K, V> Default for CacheStore<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
