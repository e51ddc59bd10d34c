//! Cache engine that never stores anything.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::{self, BoxFuture, FutureExt};

use crate::cache::{CacheEntry, CacheLookup, CacheStore};
use crate::error::CacheError;

/// Key that makes every lookup fail, for exercising the degrade path.
pub const ERROR_KEY: &str = "__error__";

/// Always misses; writes are accepted and dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCache;

impl NoCache {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CacheStore for NoCache {
    fn engine(&self) -> &'static str {
        "nocache"
    }

    async fn get(&self, key: &str) -> Result<CacheLookup, CacheError> {
        if key == ERROR_KEY {
            return Err(CacheError::Read("Error test".to_string()));
        }
        Ok(CacheLookup::miss())
    }

    fn set(&self, _key: &str, _entry: CacheEntry, _ttl: Duration) -> BoxFuture<'static, Result<(), CacheError>> {
        future::ready(Ok(())).boxed()
    }
}
