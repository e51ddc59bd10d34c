//! Request descriptor handling.
//!
//! # Responsibilities
//! - Collect per-call options through a builder
//! - Merge configured defaults (headers, TTL, timeout, stat prefix)
//! - Derive the cache key from the URL when none is given
//! - Generate a tracer id when the caller supplies none
//!
//! # Design Decisions
//! - The descriptor is immutable once prepared; the pipeline keeps a separate
//!   write TTL when a `max-age` directive overrides the configured one
//! - Caller headers replace configured extra headers wholesale; `accept` and
//!   `user-agent` defaults are then filled in when absent

use std::time::Duration;

use uuid::Uuid;

use crate::cache::cache_key_for;
use crate::config::RequestDefaults;
use crate::http::{header_name, Headers};
use crate::observability::LogContext;

/// URL value that performs a cache-only read with no network fallback.
pub const CACHE_ONLY_URL: &str = "cache";

/// Options for one fetch call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchRequest {
    url: String,
    headers: Headers,
    cache_key: Option<String>,
    cache_ttl_ms: Option<i64>,
    timeout_ms: Option<u64>,
    explicit_no_cache: bool,
    tracer: Option<String>,
    request_type: Option<String>,
    stats_key_prefix: Option<String>,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Descriptor for a cache-only read of `cache_key`.
    pub fn cache_only(cache_key: impl Into<String>) -> Self {
        Self::new(CACHE_ONLY_URL).cache_key(cache_key)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(header_name(name), value.into());
        self
    }

    pub fn cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    /// Cache TTL in milliseconds. Zero or negative skips the cache.
    pub fn cache_ttl_ms(mut self, ttl_ms: i64) -> Self {
        self.cache_ttl_ms = Some(ttl_ms);
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Bypass the cache for this call.
    pub fn no_cache(mut self) -> Self {
        self.explicit_no_cache = true;
        self
    }

    pub fn tracer(mut self, tracer: impl Into<String>) -> Self {
        self.tracer = Some(tracer.into());
        self
    }

    pub fn request_type(mut self, request_type: impl Into<String>) -> Self {
        self.request_type = Some(request_type.into());
        self
    }

    pub fn stats_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.stats_key_prefix = Some(prefix.into());
        self
    }

    /// Resolve every option against `defaults`.
    pub fn prepare(self, defaults: &RequestDefaults) -> PreparedRequest {
        let mut headers: Headers = if self.headers.is_empty() {
            defaults
                .headers
                .iter()
                .map(|(name, value)| (header_name(name), value.clone()))
                .collect()
        } else {
            self.headers
        };
        headers
            .entry("accept".to_string())
            .or_insert_with(|| defaults.accept.clone());
        headers
            .entry("user-agent".to_string())
            .or_insert_with(|| defaults.user_agent.clone());

        let cache_key = self.cache_key.unwrap_or_else(|| cache_key_for(&self.url));

        PreparedRequest {
            cache_key,
            headers,
            cache_ttl_ms: self.cache_ttl_ms.unwrap_or(defaults.cache_ttl_ms),
            timeout: Duration::from_millis(self.timeout_ms.unwrap_or(defaults.timeout_ms)),
            explicit_no_cache: self.explicit_no_cache,
            tracer: self.tracer.unwrap_or_else(|| Uuid::new_v4().to_string()),
            request_type: self.request_type,
            stats_key_prefix: self.stats_key_prefix.or_else(|| defaults.stats_key_prefix.clone()),
            url: self.url,
        }
    }
}

/// A descriptor with all defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub url: String,
    pub headers: Headers,
    pub cache_key: String,
    pub cache_ttl_ms: i64,
    pub timeout: Duration,
    pub explicit_no_cache: bool,
    pub tracer: String,
    pub request_type: Option<String>,
    pub stats_key_prefix: Option<String>,
}

impl PreparedRequest {
    /// True when the call must skip cache lookup and write.
    pub fn bypasses_cache(&self) -> bool {
        self.explicit_no_cache || self.cache_ttl_ms <= 0
    }

    pub fn is_cache_only(&self) -> bool {
        self.url == CACHE_ONLY_URL
    }

    /// Correlation context for events emitted on behalf of this call.
    pub fn log_context(&self) -> LogContext {
        LogContext::new(Some(self.tracer.clone()), self.request_type.clone())
            .with_stats_prefix(self.stats_key_prefix.clone())
    }
}
