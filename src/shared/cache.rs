use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::shared::http::VendorError;

const DEFAULT_CAPACITY: usize = 100;

struct CacheEntry {
    value: String,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Capacity-bounded TTL cache for read-mostly vendor lookups.
///
/// Concurrent fetches of a cold key may each invoke the supplier; the
/// underlying lookups are idempotent so the duplicate call is only wasted
/// work, not a correctness problem.
pub struct MetadataCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    capacity: usize,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    /// Return the cached value for `key` if unexpired, otherwise run
    /// `fetch`, store its result for `ttl`, and return it. Fetch errors are
    /// not cached.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        fetch: F,
    ) -> Result<String, VendorError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, VendorError>>,
    {
        let now = Instant::now();
        {
            let entries = self.entries.lock().expect("cache lock poisoned");
            if let Some(entry) = entries.get(key) {
                if !entry.is_expired(now) {
                    debug!("Cache HIT for key: {}", key);
                    return Ok(entry.value.clone());
                }
            }
        }

        debug!("Cache MISS for key: {}", key);
        let fresh = fetch().await?;

        let mut entries = self.entries.lock().expect("cache lock poisoned");
        entries.insert(
            key.to_string(),
            CacheEntry {
                value: fresh.clone(),
                expires_at: Instant::now() + ttl,
            },
        );
        if entries.len() > self.capacity {
            evict(&mut entries, self.capacity);
        }

        Ok(fresh)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.lock().expect("cache lock poisoned").len()
    }
}

impl Default for MetadataCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Drop expired entries, then earliest-expiring entries until the map fits
/// the capacity again.
fn evict(entries: &mut HashMap<String, CacheEntry>, capacity: usize) {
    let now = Instant::now();
    entries.retain(|_, entry| !entry.is_expired(now));

    while entries.len() > capacity {
        let Some(oldest) = entries
            .iter()
            .min_by_key(|(_, entry)| entry.expires_at)
            .map(|(key, _)| key.clone())
        else {
            break;
        };
        entries.remove(&oldest);
    }
    debug!("Cache cleanup done, {} entries remain", entries.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn counting_fetch(
        counter: &Arc<AtomicU32>,
        value: &str,
    ) -> impl Future<Output = Result<String, VendorError>> {
        let counter = counter.clone();
        let value = value.to_string();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(value)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn second_get_within_ttl_skips_the_supplier() {
        let cache = MetadataCache::new();
        let calls = Arc::new(AtomicU32::new(0));
        let ttl = Duration::from_secs(60);

        let first = cache
            .get_or_fetch("k", ttl, || counting_fetch(&calls, "v1"))
            .await
            .unwrap();
        let second = cache
            .get_or_fetch("k", ttl, || counting_fetch(&calls, "v2"))
            .await
            .unwrap();

        assert_eq!(first, "v1");
        assert_eq!(second, "v1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_is_refetched() {
        let cache = MetadataCache::new();
        let calls = Arc::new(AtomicU32::new(0));
        let ttl = Duration::from_secs(60);

        cache
            .get_or_fetch("k", ttl, || counting_fetch(&calls, "v1"))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(61)).await;
        let refreshed = cache
            .get_or_fetch("k", ttl, || counting_fetch(&calls, "v2"))
            .await
            .unwrap();

        assert_eq!(refreshed, "v2");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_errors_are_not_cached() {
        let cache = MetadataCache::new();
        let calls = Arc::new(AtomicU32::new(0));
        let ttl = Duration::from_secs(60);

        let failing = cache
            .get_or_fetch("k", ttl, || async {
                Err::<String, _>(VendorError::new(
                    crate::shared::http::VendorErrorKind::ServerError(500),
                    "nope",
                ))
            })
            .await;
        assert!(failing.is_err());

        let ok = cache
            .get_or_fetch("k", ttl, || counting_fetch(&calls, "v1"))
            .await
            .unwrap();
        assert_eq!(ok, "v1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn overflow_evicts_down_to_capacity() {
        let cache = MetadataCache::with_capacity(3);
        let calls = Arc::new(AtomicU32::new(0));
        let ttl = Duration::from_secs(60);

        for i in 0..5 {
            let key = format!("k{i}");
            cache
                .get_or_fetch(&key, ttl, || counting_fetch(&calls, "v"))
                .await
                .unwrap();
            // Stagger expiries so eviction order is deterministic
            tokio::time::advance(Duration::from_secs(1)).await;
        }

        assert!(cache.len() <= 3);
        // The most recent key survives
        cache
            .get_or_fetch("k4", ttl, || counting_fetch(&calls, "v-refetched"))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }
}
