//! The cache-aside fetch pipeline.

use std::sync::Arc;
use std::time::{Duration, Instant};

use url::Url;

use crate::cache::{CacheControl, CacheEntry, CacheLookup, CacheStore};
use crate::config::{FetchConfig, RequestDefaults};
use crate::error::{FetchError, FetchFailure, StaleContent, TransportError};
use crate::fetch::builder::ResilientFetcherBuilder;
use crate::http::{FetchRequest, FetchResponse, Headers, PreparedRequest, Transport, TransportResponse, CACHE_CONTROL};
use crate::observability::{EventSink, LogContext, LogLevel, Stat};
use crate::resilience::{CircuitBreakerGate, Clock, EndpointKey};

/// Directives forced onto responses served without the cache.
pub const NO_CACHE_DIRECTIVES: &str = "no-cache, no-store, must-revalidate";

/// Resilient content retrieval: cache-aside reads, stale fallback on
/// upstream failure and a per-endpoint circuit breaker around every attempt.
pub struct ResilientFetcher {
    cache: Arc<dyn CacheStore>,
    transport: Arc<dyn Transport>,
    sink: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    gate: CircuitBreakerGate,
    defaults: RequestDefaults,
}

/// An upstream response that passed status classification.
struct Upstream {
    status: u16,
    headers: Headers,
    content: String,
    timing_ms: u64,
}

impl ResilientFetcher {
    pub fn builder() -> ResilientFetcherBuilder {
        ResilientFetcherBuilder::new()
    }

    /// Build a fetcher from configuration, reporting into `sink`.
    pub fn from_config(config: &FetchConfig, sink: Arc<dyn EventSink>) -> Result<Self, TransportError> {
        ResilientFetcherBuilder::from_config(config).with_sink(sink).build()
    }

    pub(crate) fn from_parts(
        cache: Arc<dyn CacheStore>,
        transport: Arc<dyn Transport>,
        sink: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
        gate: CircuitBreakerGate,
        defaults: RequestDefaults,
    ) -> Self {
        Self {
            cache,
            transport,
            sink,
            clock,
            gate,
            defaults,
        }
    }

    /// Breaker gate, for diagnostics.
    pub fn gate(&self) -> &CircuitBreakerGate {
        &self.gate
    }

    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    pub fn defaults(&self) -> &RequestDefaults {
        &self.defaults
    }

    /// Fetch content for `request`.
    ///
    /// On failure the error is reported once to the sink and returned, paired
    /// with the last cached content for the key when there is any.
    pub async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, FetchFailure> {
        let started = self.clock.now();
        let request = request.prepare(&self.defaults);
        let ctx = request.log_context();

        if request.bypasses_cache() {
            return self.fetch_uncached(&request, &ctx, started).await;
        }

        let lookup = match self.cache.get(&request.cache_key).await {
            Ok(lookup) => lookup,
            Err(err) => {
                self.sink.log(
                    LogLevel::Warn,
                    &format!("CACHE ERROR for key: {} ({})", request.cache_key, err),
                    &ctx,
                );
                self.sink.stat(Stat::increment(ctx.stat_key("cacheError")));
                return self.fetch_uncached(&request, &ctx, started).await;
            }
        };

        if let Some(entry) = lookup.hit() {
            let timing_ms = self.elapsed_ms(started);
            self.sink.log(
                LogLevel::Debug,
                &format!("CACHE HIT for key: {}", request.cache_key),
                &ctx.with_response_time(timing_ms),
            );
            self.sink.stat(Stat::increment(ctx.stat_key("cacheHit")));
            return Ok(FetchResponse {
                status_code: 200,
                content: entry.content.clone(),
                headers: entry.headers.clone(),
                timing_ms,
            });
        }

        self.sink.log(
            LogLevel::Debug,
            &format!("CACHE MISS for key: {}", request.cache_key),
            &ctx,
        );
        self.sink.stat(Stat::increment(ctx.stat_key("cacheMiss")));

        if request.is_cache_only() {
            return Ok(self.not_in_cache(&request, started));
        }

        let outcome = match target_url(&request) {
            Ok(url) => self.attempt(&request, &url, &ctx).await,
            Err(error) => Err(error),
        };
        match outcome {
            Ok(upstream) => Ok(self.store(&request, &ctx, upstream).await),
            Err(error) => Err(self.fall_back(&request, &ctx, error, lookup)),
        }
    }

    /// Release the cache engine.
    pub async fn disconnect(&self) {
        self.cache.disconnect().await;
    }

    async fn fetch_uncached(
        &self,
        request: &PreparedRequest,
        ctx: &LogContext,
        started: Instant,
    ) -> Result<FetchResponse, FetchFailure> {
        if request.is_cache_only() {
            return Ok(self.not_in_cache(request, started));
        }

        let outcome = match target_url(request) {
            Ok(url) => self.attempt(request, &url, ctx).await,
            Err(error) => Err(error),
        };
        let mut upstream = outcome.map_err(|error| {
            self.report_failure(ctx, &error);
            FetchFailure::from(error)
        })?;

        let control = CacheControl::parse(upstream.headers.get(CACHE_CONTROL).map(String::as_str));
        if !control.forbids_storing() {
            upstream
                .headers
                .insert(CACHE_CONTROL.to_string(), NO_CACHE_DIRECTIVES.to_string());
        }

        Ok(FetchResponse {
            status_code: upstream.status,
            content: upstream.content,
            headers: upstream.headers,
            timing_ms: upstream.timing_ms,
        })
    }

    /// One gated network attempt. Any status other than 200 is a failure.
    async fn attempt(&self, request: &PreparedRequest, url: &Url, ctx: &LogContext) -> Result<Upstream, FetchError> {
        let endpoint = EndpointKey::from_url(url, self.gate.includes_path());

        self.gate
            .guard(&endpoint, ctx, || self.exchange(request, url, ctx))
            .await
    }

    async fn exchange(&self, request: &PreparedRequest, url: &Url, ctx: &LogContext) -> Result<Upstream, FetchError> {
        let started = self.clock.now();
        let TransportResponse { status, headers, body } = self
            .transport
            .get(url, &request.headers, request.timeout)
            .await
            .map_err(|source| FetchError::Transport {
                url: request.url.clone(),
                source,
            })?;

        if status != 200 {
            return Err(FetchError::UpstreamStatus {
                url: request.url.clone(),
                status,
                headers,
            });
        }

        let timing_ms = self.elapsed_ms(started);
        self.sink.log(
            LogLevel::Debug,
            &format!("OK {}", request.url),
            &ctx.with_response_time(timing_ms),
        );
        self.sink.stat(Stat::timing(ctx.stat_key("responseTime"), timing_ms));

        Ok(Upstream {
            status,
            headers,
            content: body,
            timing_ms,
        })
    }

    /// Write a successful response to the cache unless it forbids storing.
    async fn store(&self, request: &PreparedRequest, ctx: &LogContext, upstream: Upstream) -> FetchResponse {
        let control = CacheControl::parse(upstream.headers.get(CACHE_CONTROL).map(String::as_str));
        let response = FetchResponse {
            status_code: 200,
            content: upstream.content,
            headers: upstream.headers,
            timing_ms: upstream.timing_ms,
        };
        if control.forbids_storing() {
            return response;
        }

        let ttl = control
            .max_age_ttl()
            .unwrap_or_else(|| Duration::from_millis(u64::try_from(request.cache_ttl_ms).unwrap_or(0)));
        let ttl_ms = ttl.as_millis();
        let completion = self.cache.set(
            &request.cache_key,
            CacheEntry::new(response.content.clone(), response.headers.clone()),
            ttl,
        );

        let sink = self.sink.clone();
        let ctx = ctx.clone();
        let key = request.cache_key.clone();
        let report = async move {
            match completion.await {
                Ok(()) => sink.log(
                    LogLevel::Debug,
                    &format!("CACHE SET for key: {} @ TTL: {}", key, ttl_ms),
                    &ctx,
                ),
                Err(err) => {
                    sink.log(
                        LogLevel::Warn,
                        &format!("CACHE WRITE ERROR for key: {} ({})", key, err),
                        &ctx,
                    );
                    sink.stat(Stat::increment(ctx.stat_key("cacheWriteError")));
                }
            }
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(report);
            }
            Err(_) => report.await,
        }

        response
    }

    /// Report a failed attempt and attach stale content when the cache has it.
    fn fall_back(&self, request: &PreparedRequest, ctx: &LogContext, error: FetchError, lookup: CacheLookup) -> FetchFailure {
        self.report_failure(ctx, &error);

        let stale = lookup.stale.map(|entry| StaleContent {
            content: entry.content,
            headers: entry.headers,
        });
        if stale.is_some() {
            self.sink.log(
                LogLevel::Debug,
                &format!("Serving stale cache for key: {}", request.cache_key),
                ctx,
            );
            self.sink.stat(Stat::increment(ctx.stat_key("cacheStale")));
        } else if self.cache.engine() != "nocache" {
            self.sink.log(
                LogLevel::Warn,
                &format!("Error and no stale cache available for key: {}", request.cache_key),
                ctx,
            );
            self.sink.stat(Stat::increment(ctx.stat_key("cacheNoStale")));
        }

        FetchFailure::new(error, stale)
    }

    /// Log a failure once at its severity and count it once.
    fn report_failure(&self, ctx: &LogContext, error: &FetchError) {
        let level = error.severity();
        let message = match level {
            LogLevel::Error => format!("FAIL {}", error),
            _ => error.to_string(),
        };
        self.sink.log(level, &message, &ctx.with_status(error.upstream_status()));

        let category = if error.is_circuit_open() {
            "circuitOpen"
        } else {
            "requestError"
        };
        self.sink.stat(Stat::increment(ctx.stat_key(category)));
    }

    fn not_in_cache(&self, request: &PreparedRequest, started: Instant) -> FetchResponse {
        FetchResponse {
            status_code: 404,
            content: format!("No content in cache at key: {}", request.cache_key),
            headers: Headers::new(),
            timing_ms: self.elapsed_ms(started),
        }
    }

    fn elapsed_ms(&self, since: Instant) -> u64 {
        u64::try_from(self.clock.now().duration_since(since).as_millis()).unwrap_or(u64::MAX)
    }
}

/// Parse the upstream URL of a network-bound request.
fn target_url(request: &PreparedRequest) -> Result<Url, FetchError> {
    Url::parse(&request.url).map_err(|_| FetchError::InvalidUrl {
        url: request.url.clone(),
    })
}

impl std::fmt::Debug for ResilientFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientFetcher")
            .field("engine", &self.cache.engine())
            .field("gate", &self.gate)
            .field("defaults", &self.defaults)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryCache, NoCache};
    use crate::observability::RecordingSink;
    use crate::resilience::MockClock;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Transport that replays a fixed sequence of outcomes.
    struct Scripted {
        outcomes: Mutex<Vec<Result<TransportResponse, TransportError>>>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(outcomes: Vec<Result<TransportResponse, TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes.into_iter().rev().collect()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for Scripted {
        async fn get(&self, _url: &Url, _headers: &Headers, _timeout: Duration) -> Result<TransportResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcomes
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(TransportError::Connect("script exhausted".into())))
        }
    }

    fn ok(body: &str, cache_control: Option<&str>) -> Result<TransportResponse, TransportError> {
        let mut headers = Headers::new();
        if let Some(value) = cache_control {
            headers.insert(CACHE_CONTROL.into(), value.into());
        }
        Ok(TransportResponse {
            status: 200,
            headers,
            body: body.into(),
        })
    }

    fn status(code: u16) -> Result<TransportResponse, TransportError> {
        Ok(TransportResponse {
            status: code,
            headers: Headers::new(),
            body: String::new(),
        })
    }

    fn fetcher(transport: Arc<Scripted>, cache: Arc<dyn CacheStore>) -> (ResilientFetcher, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::new());
        let fetcher = ResilientFetcher::builder()
            .with_transport(transport)
            .with_cache(cache)
            .with_sink(sink.clone())
            .with_clock(Arc::new(MockClock::new()))
            .build()
            .unwrap();
        (fetcher, sink)
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let transport = Scripted::new(vec![ok("hello", None)]);
        let (fetcher, sink) = fetcher(transport.clone(), Arc::new(MemoryCache::new()));

        let first = fetcher.fetch(FetchRequest::new("https://svc/a")).await.unwrap();
        assert_eq!(first.status_code, 200);
        assert_eq!(first.content, "hello");

        let second = fetcher.fetch(FetchRequest::new("https://svc/a")).await.unwrap();
        assert_eq!(second.content, "hello");
        assert_eq!(transport.calls(), 1);
        assert_eq!(sink.stat_count("cacheMiss"), 1);
        assert_eq!(sink.stat_count("cacheHit"), 1);
    }

    #[tokio::test]
    async fn test_failure_without_stale() {
        let transport = Scripted::new(vec![status(500)]);
        let (fetcher, sink) = fetcher(transport, Arc::new(MemoryCache::new()));

        let failure = fetcher
            .fetch(FetchRequest::new("https://svc/b").cache_ttl_ms(1))
            .await
            .unwrap_err();
        assert_eq!(failure.status_code(), 500);
        assert!(failure.stale().is_none());
        assert_eq!(
            sink.messages_at(LogLevel::Error),
            vec!["FAIL Service https://svc/b responded with status code 500".to_string()]
        );
        assert_eq!(sink.stat_count("requestError"), 1);
        assert_eq!(sink.stat_count("cacheNoStale"), 1);
    }

    #[tokio::test]
    async fn test_not_found_logged_at_warn() {
        let transport = Scripted::new(vec![status(404)]);
        let (fetcher, sink) = fetcher(transport, Arc::new(NoCache::new()));

        let failure = fetcher.fetch(FetchRequest::new("https://svc/b")).await.unwrap_err();
        assert_eq!(failure.status_code(), 404);
        assert_eq!(
            sink.messages_at(LogLevel::Warn),
            vec!["Service https://svc/b responded with status code 404".to_string()]
        );
        assert_eq!(sink.stat_count("cacheNoStale"), 0);
    }

    #[tokio::test]
    async fn test_invalid_url_never_reaches_transport() {
        let transport = Scripted::new(vec![]);
        let (fetcher, sink) = fetcher(transport.clone(), Arc::new(MemoryCache::new()));

        let failure = fetcher.fetch(FetchRequest::new("not a url")).await.unwrap_err();
        assert!(matches!(failure.error(), FetchError::InvalidUrl { .. }));
        assert_eq!(failure.status_code(), 500);
        assert_eq!(failure.message(), "Service not a url responded with Invalid URL not a url");
        assert!(failure.stale().is_none());
        assert_eq!(transport.calls(), 0);
        assert_eq!(fetcher.gate().tracked_endpoints(), 0);
        assert_eq!(sink.stat_count("requestError"), 1);
        assert_eq!(sink.stat_count("cacheNoStale"), 1);
    }

    #[tokio::test]
    async fn test_invalid_url_serves_stale_for_its_key() {
        let transport = Scripted::new(vec![]);
        let cache = Arc::new(MemoryCache::new());
        let _ = cache.set("k", CacheEntry::new("old", Headers::new()), Duration::ZERO);
        let (fetcher, sink) = fetcher(transport.clone(), cache);

        let failure = fetcher
            .fetch(FetchRequest::new("not a url").cache_key("k"))
            .await
            .unwrap_err();
        assert!(matches!(failure.error(), FetchError::InvalidUrl { .. }));
        assert_eq!(failure.stale().map(|s| s.content.as_str()), Some("old"));
        assert_eq!(transport.calls(), 0);
        assert_eq!(sink.stat_count("cacheStale"), 1);
    }

    #[tokio::test]
    async fn test_invalid_url_with_fresh_entry_hits() {
        let transport = Scripted::new(vec![]);
        let cache = Arc::new(MemoryCache::new());
        let _ = cache.set("k", CacheEntry::new("cached", Headers::new()), Duration::from_secs(60));
        let (fetcher, _) = fetcher(transport.clone(), cache);

        let response = fetcher
            .fetch(FetchRequest::new("not a url").cache_key("k"))
            .await
            .unwrap();
        assert_eq!(response.content, "cached");
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_url_on_bypass_has_no_stale() {
        let transport = Scripted::new(vec![]);
        let (fetcher, sink) = fetcher(transport.clone(), Arc::new(MemoryCache::new()));

        let failure = fetcher
            .fetch(FetchRequest::new("not a url").no_cache())
            .await
            .unwrap_err();
        assert!(matches!(failure.error(), FetchError::InvalidUrl { .. }));
        assert!(failure.stale().is_none());
        assert_eq!(sink.stat_count("requestError"), 1);
        assert_eq!(sink.stat_count("cacheMiss"), 0);
    }

    #[tokio::test]
    async fn test_bypass_forces_no_cache_header() {
        let transport = Scripted::new(vec![ok("fresh", Some("max-age=60")), ok("again", None)]);
        let cache = Arc::new(MemoryCache::new());
        let (fetcher, _) = fetcher(transport.clone(), cache.clone());

        let response = fetcher.fetch(FetchRequest::new("https://svc/a").no_cache()).await.unwrap();
        assert_eq!(response.cache_control(), Some(NO_CACHE_DIRECTIVES));

        let response = fetcher.fetch(FetchRequest::new("https://svc/a").cache_ttl_ms(0)).await.unwrap();
        assert_eq!(response.content, "again");
        assert_eq!(transport.calls(), 2);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_bypass_keeps_upstream_no_store() {
        let transport = Scripted::new(vec![ok("x", Some("no-store"))]);
        let (fetcher, _) = fetcher(transport, Arc::new(MemoryCache::new()));

        let response = fetcher.fetch(FetchRequest::new("https://svc/a").no_cache()).await.unwrap();
        assert_eq!(response.cache_control(), Some("no-store"));
    }

    #[tokio::test]
    async fn test_cache_error_degrades_to_direct_fetch() {
        let transport = Scripted::new(vec![ok("direct", None)]);
        let (fetcher, sink) = fetcher(transport.clone(), Arc::new(NoCache::new()));

        let response = fetcher
            .fetch(FetchRequest::new("https://svc/a").cache_key("__error__"))
            .await
            .unwrap();
        assert_eq!(response.content, "direct");
        assert_eq!(response.cache_control(), Some(NO_CACHE_DIRECTIVES));
        assert_eq!(transport.calls(), 1);
        assert_eq!(sink.stat_count("cacheError"), 1);
    }

    #[tokio::test]
    async fn test_cache_only_miss_is_404_without_network() {
        let transport = Scripted::new(vec![]);
        let (fetcher, _) = fetcher(transport.clone(), Arc::new(MemoryCache::new()));

        let response = fetcher.fetch(FetchRequest::cache_only("absent")).await.unwrap();
        assert_eq!(response.status_code, 404);
        assert_eq!(response.content, "No content in cache at key: absent");
        assert_eq!(transport.calls(), 0);
        assert_eq!(fetcher.gate().tracked_endpoints(), 0);
    }

    #[tokio::test]
    async fn test_circuit_open_counted_separately() {
        let transport = Scripted::new((0..10).map(|_| status(503)).collect());
        let sink = Arc::new(RecordingSink::new());
        let fetcher = ResilientFetcher::builder()
            .with_transport(transport.clone())
            .with_cache(Arc::new(NoCache::new()))
            .with_sink(sink.clone())
            .with_clock(Arc::new(MockClock::new()))
            .with_default_circuit_breaker()
            .build()
            .unwrap();

        for _ in 0..10 {
            let _ = fetcher.fetch(FetchRequest::new("https://svc/a")).await;
        }
        let failure = fetcher.fetch(FetchRequest::new("https://svc/a")).await.unwrap_err();
        assert!(failure.error().is_circuit_open());
        assert_eq!(failure.message(), "Service at svc has circuit breaker engaged.");
        assert_eq!(transport.calls(), 10);
        assert_eq!(sink.stat_count("requestError"), 10);
        assert_eq!(sink.stat_count("circuitOpen"), 1);
    }
}
