//! The timed key/value store behind response caching.

use std::sync::{Arc, Weak};
use std::time::Duration;

use bytes::Bytes;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace};

// One stored value. `expires_at` is `None` only when `now + ttl` overflows the clock.
#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn new(value: V, ttl: Duration, now: Instant) -> Self {
        Self {
            value,
            expires_at: now.checked_add(ttl),
        }
    }

    // An entry is dead from its expiry instant onwards, inclusive.
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// A concurrent in-memory map whose entries expire after a per-entry timeout.
///
/// Expiry is lazy: an expired entry is never returned, but it stays in memory
/// until it is overwritten, [`purge_expired`](Self::purge_expired) runs, or the
/// optional [sweeper](Self::spawn_sweeper) removes it. Time is read from
/// [`tokio::time::Instant`], so a paused test runtime controls expiry exactly.
///
/// The map is sharded ([`DashMap`]); a reader never observes a partially
/// written entry. Two concurrent `set`s for one key both succeed and the later
/// one wins.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use pulse::cache::TimedCache;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let cache: TimedCache<&str> = TimedCache::new(Duration::from_secs(60));
/// cache.set("greeting", "hello", Duration::from_secs(5));
///
/// assert_eq!(cache.get("greeting"), Some("hello"));
/// assert_eq!(cache.get("missing"), None);
///
/// cache.clear();
/// assert!(cache.is_empty());
/// # }
/// ```
#[derive(Debug)]
pub struct TimedCache<V = Bytes> {
    entries: DashMap<String, CacheEntry<V>>,
    default_ttl: Duration,
}

impl<V: Clone> TimedCache<V> {
    /// Creates an empty cache whose [`set_default`](Self::set_default) uses `default_ttl`.
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
        }
    }

    /// The timeout applied by [`set_default`](Self::set_default).
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Returns a clone of the live value stored under `key`.
    ///
    /// Returns `None` when the key is absent or its entry has expired. A
    /// lookup never mutates the map.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let entry = self.entries.get(key)?;
        entry.is_live(now).then(|| entry.value.clone())
    }

    /// Returns `true` if a live entry exists for `key`.
    pub fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries.get(key).is_some_and(|entry| entry.is_live(now))
    }

    /// Stores `value` under `key` until `now + ttl`, replacing any previous
    /// entry together with its expiry.
    ///
    /// A zero `ttl` stores an entry that is already expired.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let entry = CacheEntry::new(value, ttl, Instant::now());
        self.entries.insert(key.into(), entry);
    }

    /// [`set`](Self::set) with the cache's default timeout.
    pub fn set_default(&self, key: impl Into<String>, value: V) {
        self.set(key, value, self.default_ttl);
    }

    /// Stores `value` only if no live entry exists for `key`.
    ///
    /// Returns `true` when the value was stored. The check and the insert are
    /// atomic with respect to other writers of the same key.
    pub fn add(&self, key: impl Into<String>, value: V, ttl: Duration) -> bool {
        let now = Instant::now();
        match self.entries.entry(key.into()) {
            Entry::Occupied(mut slot) if !slot.get().is_live(now) => {
                slot.insert(CacheEntry::new(value, ttl, now));
                true
            }
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(CacheEntry::new(value, ttl, now));
                true
            }
        }
    }

    /// Removes the entry for `key`. Returns `true` if a live entry was removed.
    pub fn delete(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries
            .remove(key)
            .is_some_and(|(_, entry)| entry.is_live(now))
    }

    /// Removes every entry, live or expired.
    pub fn clear(&self) {
        self.entries.clear();
        debug!("cache cleared");
    }

    /// Physically drops expired entries and returns how many were removed.
    ///
    /// Has no effect observable through [`get`](Self::get).
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut purged = 0;
        self.entries.retain(|_, entry| {
            let live = entry.is_live(now);
            if !live {
                purged += 1;
            }
            live
        });
        purged
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> TimedCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Starts a background task that calls [`purge_expired`](Self::purge_expired)
    /// every `period`.
    ///
    /// The task holds only a weak reference and exits once the cache is dropped.
    /// Abort the returned handle to stop it earlier.
    pub fn spawn_sweeper(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let cache: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick completes immediately.
            interval.tick().await;

            loop {
                interval.tick().await;
                let Some(cache) = cache.upgrade() else {
                    debug!("cache dropped, sweeper exiting");
                    break;
                };
                let purged = cache.purge_expired();
                if purged > 0 {
                    trace!(purged, remaining = cache.len(), "swept expired cache entries");
                }
            }
        })
    }
}
