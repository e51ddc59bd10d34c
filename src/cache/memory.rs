//! In-process cache engine.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures_util::future::{self, BoxFuture, FutureExt};
use lru::LruCache;
use parking_lot::Mutex;

use crate::cache::{CacheEntry, CacheLookup, CacheStore};
use crate::error::CacheError;
use crate::resilience::clock::{Clock, SystemClock};

/// Key bound used when none is configured.
pub const DEFAULT_CAPACITY: usize = 10_000;

#[derive(Debug, Clone)]
struct Slot {
    entry: CacheEntry,
    expires_at: Instant,
}

/// A bounded, thread-safe cache that keeps expired entries as stale fallbacks.
///
/// An expired entry stays retrievable as `stale` until it is overwritten or
/// the least-recently-used key is evicted to make room for a new one.
#[derive(Clone)]
pub struct MemoryCache {
    inner: Arc<Mutex<LruCache<String, Slot>>>,
    clock: Arc<dyn Clock>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a cache of [`DEFAULT_CAPACITY`] that reads time from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::bounded(DEFAULT_CAPACITY, clock)
    }

    /// Create a cache holding at most `capacity` keys. Zero is treated as one.
    pub fn bounded(capacity: usize, clock: Arc<dyn Clock>) -> Self {
        let capacity = NonZeroUsize::MIN.saturating_add(capacity.saturating_sub(1));
        Self {
            inner: Arc::new(Mutex::new(LruCache::new(capacity))),
            clock,
        }
    }

    /// Number of keys held, fresh or stale.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Maximum number of keys held.
    pub fn capacity(&self) -> usize {
        self.inner.lock().cap().get()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    fn engine(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<CacheLookup, CacheError> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        let lookup = match inner.get(key) {
            Some(slot) if now < slot.expires_at => CacheLookup {
                fresh: Some(slot.entry.clone()),
                stale: Some(slot.entry.clone()),
            },
            Some(slot) => CacheLookup {
                fresh: None,
                stale: Some(slot.entry.clone()),
            },
            None => CacheLookup::miss(),
        };
        Ok(lookup)
    }

    fn set(&self, key: &str, entry: CacheEntry, ttl: Duration) -> BoxFuture<'static, Result<(), CacheError>> {
        let expires_at = self.clock.now() + ttl;
        let mut inner = self.inner.lock();
        if let Some((evicted, _)) = inner.push(key.to_string(), Slot { entry, expires_at }) {
            if evicted != key {
                tracing::debug!(key = %evicted, "Memory cache evicted least recently used key");
            }
        }
        tracing::trace!(key, entries = inner.len(), "Memory cache write");
        future::ready(Ok(())).boxed()
    }

    async fn disconnect(&self) {
        let mut inner = self.inner.lock();
        tracing::debug!(entries = inner.len(), "Memory cache released");
        inner.clear();
    }
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("MemoryCache")
            .field("entries", &inner.len())
            .field("capacity", &inner.cap())
            .finish()
    }
}
