//! Capacity- and TTL-bounded in-memory cache.
//!
//! Eviction is by insertion order: when a new key arrives at capacity, the
//! entry that was inserted (or last re-inserted) earliest is dropped.
//! Expired entries are removed lazily when read.

use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

use crate::domain::models::CacheConfig;

/// A resident cache entry. Replaced wholesale on `set`, never mutated.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// Cached value
    pub value: V,
    /// When the entry was stored
    pub stored_at: Instant,
    /// `stored_at + ttl`
    pub expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

struct Slot<V> {
    seq: u64,
    entry: CacheEntry<V>,
}

struct Inner<V> {
    entries: HashMap<String, Slot<V>>,
    /// Insertion sequence -> key, oldest first.
    order: BTreeMap<u64, String>,
    next_seq: u64,
}

impl<V> Inner<V> {
    fn remove(&mut self, key: &str) -> Option<Slot<V>> {
        let slot = self.entries.remove(key)?;
        self.order.remove(&slot.seq);
        Some(slot)
    }

    fn evict_oldest(&mut self) -> Option<String> {
        let (_, key) = self.order.pop_first()?;
        self.entries.remove(&key);
        Some(key)
    }
}

/// Fixed-capacity, TTL-based key/value store.
///
/// Cheap to share behind an `Arc`; every operation takes a short lock that
/// is never held across an await point.
pub struct BoundedCache<V> {
    inner: Mutex<Inner<V>>,
    capacity: usize,
    ttl: Duration,
}

impl<V: Clone> BoundedCache<V> {
    /// Create a cache from configuration. A capacity of zero is raised to one.
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_limits(config.capacity, config.ttl())
    }

    /// Create a cache with explicit limits.
    pub fn with_limits(capacity: usize, ttl: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::with_capacity(capacity),
                order: BTreeMap::new(),
                next_seq: 0,
            }),
            capacity,
            ttl,
        }
    }

    /// Return a live value, removing the entry if its TTL has elapsed.
    pub fn get(&self, key: &str) -> Option<V> {
        self.get_entry(key).map(|entry| entry.value)
    }

    /// Like [`get`](Self::get) but returns the whole entry.
    pub fn get_entry(&self, key: &str) -> Option<CacheEntry<V>> {
        let now = Instant::now();
        let mut inner = self.inner.lock();

        let expired = inner.entries.get(key)?.entry.is_expired(now);
        if expired {
            inner.remove(key);
            trace!(key, "cache entry expired");
            return None;
        }

        inner.entries.get(key).map(|slot| slot.entry.clone())
    }

    /// Store a value, replacing any existing entry for `key`.
    ///
    /// A new key at capacity evicts the oldest-inserted entry first.
    /// Re-inserting an existing key moves it to the newest position and
    /// restarts its TTL without evicting anything.
    pub fn set(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        let now = Instant::now();
        let mut inner = self.inner.lock();

        if inner.remove(&key).is_none() && inner.entries.len() >= self.capacity {
            if let Some(evicted) = inner.evict_oldest() {
                trace!(key = %evicted, "cache evicted oldest entry");
            }
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.order.insert(seq, key.clone());
        inner.entries.insert(
            key,
            Slot {
                seq,
                entry: CacheEntry {
                    value,
                    stored_at: now,
                    expires_at: now + self.ttl,
                },
            },
        );
    }

    /// Number of resident entries, including expired ones not yet read.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// True when no entries are resident.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured capacity.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Configured time-to-live.
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }
}
