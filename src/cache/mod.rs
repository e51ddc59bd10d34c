//! Cache subsystem.
//!
//! # Responsibilities
//! - Define the `CacheStore` port consumed by the fetch pipeline
//! - Provide the in-memory engine with stale retention and the no-op engine
//! - Parse `cache-control` directives that steer cache writes
//! - Derive default cache keys from URLs
//!
//! # Design Decisions
//! - One lookup returns both the live value and the last-known stale value
//! - `set` records the entry before returning, then hands back a completion
//!   future so write outcome can be reported after the caller has its result
//! - Engines are swappable behind `Arc<dyn CacheStore>`

pub mod control;
pub mod memory;
pub mod nocache;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::config::{CacheConfig, CacheEngine};
use crate::error::CacheError;
use crate::http::Headers;
use crate::resilience::clock::Clock;

pub use control::CacheControl;
pub use memory::MemoryCache;
pub use nocache::NoCache;

/// Content and headers captured from a successful upstream response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub content: String,
    pub headers: Headers,
}

impl CacheEntry {
    pub fn new(content: impl Into<String>, headers: Headers) -> Self {
        Self {
            content: content.into(),
            headers,
        }
    }
}

/// Result of a single cache lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheLookup {
    /// Entry still within its TTL.
    pub fresh: Option<CacheEntry>,
    /// Last entry written under the key, kept after its TTL expired.
    pub stale: Option<CacheEntry>,
}

impl CacheLookup {
    pub fn miss() -> Self {
        Self::default()
    }

    /// Fresh entry with non-empty content, if any.
    pub fn hit(&self) -> Option<&CacheEntry> {
        self.fresh.as_ref().filter(|e| !e.content.is_empty())
    }
}

/// Pluggable key/value store with TTL.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Engine name, e.g. `memory` or `nocache`.
    fn engine(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<CacheLookup, CacheError>;

    /// Store `entry` under `key` for `ttl`.
    ///
    /// The entry is visible to lookups as soon as this returns. The returned
    /// future resolves with the write's final outcome.
    fn set(&self, key: &str, entry: CacheEntry, ttl: Duration) -> BoxFuture<'static, Result<(), CacheError>>;

    /// Release engine resources. The default does nothing.
    async fn disconnect(&self) {}
}

/// Build the engine selected by configuration.
pub fn from_config(config: &CacheConfig, clock: Arc<dyn Clock>) -> Arc<dyn CacheStore> {
    match config.engine {
        CacheEngine::Memory => Arc::new(MemoryCache::bounded(config.capacity, clock)),
        CacheEngine::NoCache => Arc::new(NoCache::new()),
    }
}

/// Default cache key for a URL: every non-alphanumeric character becomes `_`.
pub fn cache_key_for(url: &str) -> String {
    url.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
