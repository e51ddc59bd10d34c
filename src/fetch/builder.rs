//! Builder for composing a `ResilientFetcher`.

use std::sync::Arc;

use crate::cache::{self, CacheStore, MemoryCache};
use crate::config::{CacheConfig, CircuitBreakerConfig, FetchConfig, RequestDefaults};
use crate::error::TransportError;
use crate::fetch::fetcher::ResilientFetcher;
use crate::http::{ReqwestTransport, Transport};
use crate::observability::{EventSink, NoOpSink};
use crate::resilience::{CircuitBreakerGate, Clock, SystemClock};

/// Fluent construction of a fetcher from its ports.
///
/// ```ignore
/// let fetcher = ResilientFetcher::builder()
///     .with_sink(Arc::new(TracingSink::new()))
///     .with_circuit_breaker(CircuitBreakerConfig::default())
///     .build()?;
/// ```
///
/// Unset ports default to an in-memory cache, a `reqwest` transport, a
/// silent sink and the system clock. No circuit breaker means pass-through.
#[derive(Default)]
pub struct ResilientFetcherBuilder {
    cache: Option<Arc<dyn CacheStore>>,
    transport: Option<Arc<dyn Transport>>,
    sink: Option<Arc<dyn EventSink>>,
    clock: Option<Arc<dyn Clock>>,
    engine: Option<CacheConfig>,
    circuit_breaker: Option<CircuitBreakerConfig>,
    defaults: RequestDefaults,
}

impl ResilientFetcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a loaded configuration file.
    ///
    /// The cache engine named by `config.cache` is built with the final clock
    /// unless a cache is injected explicitly.
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            engine: Some(config.cache.clone()),
            circuit_breaker: config.circuit_breaker.clone(),
            defaults: config.request.clone(),
            ..Self::default()
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Clock used by the breaker window, latency timings and the default
    /// in-memory cache.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_circuit_breaker(mut self, config: CircuitBreakerConfig) -> Self {
        self.circuit_breaker = Some(config);
        self
    }

    pub fn with_default_circuit_breaker(self) -> Self {
        self.with_circuit_breaker(CircuitBreakerConfig::default())
    }

    pub fn with_defaults(mut self, defaults: RequestDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Assemble the fetcher.
    ///
    /// Fails only when the default transport cannot be constructed.
    pub fn build(self) -> Result<ResilientFetcher, TransportError> {
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let sink = self.sink.unwrap_or_else(|| Arc::new(NoOpSink));
        let cache: Arc<dyn CacheStore> = match (self.cache, self.engine) {
            (Some(cache), _) => cache,
            (None, Some(engine)) => cache::from_config(&engine, clock.clone()),
            (None, None) => Arc::new(MemoryCache::with_clock(clock.clone())),
        };
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(self.defaults.follow_redirect)?),
        };
        let gate = CircuitBreakerGate::new(self.circuit_breaker, clock.clone(), sink.clone());

        tracing::debug!(
            engine = cache.engine(),
            circuit_breaker = gate.is_enabled(),
            "Resilient fetcher assembled"
        );

        Ok(ResilientFetcher::from_parts(
            cache,
            transport,
            sink,
            clock,
            gate,
            self.defaults,
        ))
    }
}
