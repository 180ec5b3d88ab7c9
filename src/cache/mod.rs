//! Response caching — a timed in-memory store and the lookup-or-compute wrapper.
//!
//! - [`TimedCache`] — concurrent key/value map with per-entry expiry.
//! - [`cached`] — the explicit form of a caching decorator: look the key up,
//!   and on a miss compute the value, store it, and return it.
//! - [`cache_key`] — builds the key for a route and its path parameter.

use std::future::Future;
use std::time::Duration;

use tracing::trace;

mod store;

pub use store::TimedCache;

/// Builds the cache key for `route` called with `param`.
///
/// The parameter is used literally, so distinct values always yield distinct
/// keys for the same route.
///
/// ```
/// assert_eq!(pulse::cache::cache_key("cacheme", "a b"), "cacheme:a b");
/// ```
pub fn cache_key(route: &str, param: &str) -> String {
    format!("{route}:{param}")
}

/// Returns the live value for `key`, or computes, stores and returns a fresh one.
///
/// `compute` only runs on a miss. Its error is returned as-is and nothing is
/// stored. There is no single-flight guard: concurrent misses for one key each
/// compute, and the last `set` wins.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use pulse::cache::{TimedCache, cached};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let cache: TimedCache<u32> = TimedCache::new(Duration::from_secs(30));
/// let ttl = cache.default_ttl();
///
/// let first = cached(&cache, "k", ttl, || async { Ok::<_, ()>(1) }).await;
/// let second = cached(&cache, "k", ttl, || async { Ok::<_, ()>(2) }).await;
/// assert_eq!(first, Ok(1));
/// assert_eq!(second, Ok(1));
/// # }
/// ```
pub async fn cached<V, E, F, Fut>(
    cache: &TimedCache<V>,
    key: &str,
    ttl: Duration,
    compute: F,
) -> Result<V, E>
where
    V: Clone,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<V, E>>,
{
    if let Some(hit) = cache.get(key) {
        trace!(key, "cache hit");
        return Ok(hit);
    }

    trace!(key, "cache miss");
    let value = compute().await?;
    cache.set(key, value.clone(), ttl);
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::advance;

    const TTL: Duration = Duration::from_secs(1);

    #[test]
    fn keys_differ_per_param() {
        assert_ne!(cache_key("cacheme", "a"), cache_key("cacheme", "b"));
        assert_ne!(cache_key("cacheme", "A"), cache_key("cacheme", "a"));
    }

    #[tokio::test(start_paused = true)]
    async fn computes_once_within_ttl() {
        let cache: TimedCache<usize> = TimedCache::new(TTL);
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let compute = || async move { Ok::<_, ()>(calls.fetch_add(1, Ordering::SeqCst)) };

        assert_eq!(cached(&cache, "k", TTL, compute).await, Ok(0));
        assert_eq!(cached(&cache, "k", TTL, compute).await, Ok(0));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        advance(TTL).await;
        assert_eq!(cached(&cache, "k", TTL, compute).await, Ok(1));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn errors_are_not_cached() {
        let cache: TimedCache<u32> = TimedCache::new(TTL);

        let failed = cached(&cache, "k", TTL, || async { Err::<u32, _>("nope") }).await;
        assert_eq!(failed, Err("nope"));
        assert!(cache.is_empty());

        let ok = cached(&cache, "k", TTL, || async { Ok::<_, &str>(5) }).await;
        assert_eq!(ok, Ok(5));
    }

    #[tokio::test(start_paused = true)]
    async fn clear_forces_recompute() {
        let cache: TimedCache<u32> = TimedCache::new(TTL);
        cached(&cache, "k", TTL, || async { Ok::<_, ()>(1) }).await.unwrap();
        cache.clear();

        let after = cached(&cache, "k", TTL, || async { Ok::<_, ()>(2) }).await;
        assert_eq!(after, Ok(2));
    }
}
