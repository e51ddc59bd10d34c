//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the fetcher.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root configuration for the resilient fetcher.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FetchConfig {
    /// Per-request defaults applied to every descriptor.
    pub request: RequestDefaults,

    /// Cache engine selection.
    pub cache: CacheConfig,

    /// Circuit breaker policy. Absent means the gate is a pass-through.
    pub circuit_breaker: Option<CircuitBreakerConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Defaults applied to a request descriptor before it is fetched.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RequestDefaults {
    /// Hard timeout for one network attempt, in milliseconds.
    pub timeout_ms: u64,

    /// Cache TTL in milliseconds. Zero or negative disables caching.
    pub cache_ttl_ms: i64,

    /// Follow HTTP redirects.
    pub follow_redirect: bool,

    /// Value of the `accept` header when the caller sets none.
    pub accept: String,

    /// Value of the `user-agent` header when the caller sets none.
    pub user_agent: String,

    /// Extra headers sent when the descriptor carries no headers of its own.
    pub headers: BTreeMap<String, String>,

    /// Prefix for stat keys when the descriptor carries none.
    pub stats_key_prefix: Option<String>,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            cache_ttl_ms: 60_000,
            follow_redirect: true,
            accept: "text/html,application/xhtml+xml,application/xml,application/json".to_string(),
            user_agent: "Reliable-Get-Request-Agent".to_string(),
            headers: BTreeMap::new(),
            stats_key_prefix: None,
        }
    }
}

/// Available cache engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheEngine {
    /// In-process store with stale retention.
    #[default]
    Memory,
    /// Always misses; never stores.
    NoCache,
}

/// Cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Which engine backs the cache port.
    pub engine: CacheEngine,

    /// Maximum keys held by the memory engine, fresh and stale together.
    /// The least recently used key is evicted past this bound.
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            engine: CacheEngine::Memory,
            capacity: 10_000,
        }
    }
}

/// Circuit breaker policy applied per endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Length of the rolling statistics window in milliseconds.
    pub window_duration_ms: u64,

    /// Number of buckets the window is sliced into.
    pub num_buckets: u32,

    /// Error percentage at which the circuit opens.
    pub error_threshold_percent: u32,

    /// Minimum attempts inside the window before the error rate is evaluated.
    pub volume_threshold: u64,

    /// Key breakers by host and path instead of host alone.
    pub include_path: bool,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            window_duration_ms: 10_000,
            num_buckets: 10,
            error_threshold_percent: 50,
            volume_threshold: 10,
            include_path: false,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable, for development.
    #[default]
    Pretty,
    /// One JSON object per line, for production.
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log line format.
    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
