//! Per-endpoint circuit breaker gate.
//!
//! # States
//! - Closed: attempts pass through and feed the rolling window
//! - Open: attempts are short-circuited without touching the upstream
//!
//! # State Transitions
//! ```text
//! Closed → Open:   window volume >= volume_threshold
//!                  AND error percentage >= error_threshold_percent
//! Open → Closed:   window_duration elapsed since opening (window is reset)
//! ```
//!
//! # Design Decisions
//! - Per-endpoint breaker (host, or host + path), created lazily
//! - Breaker state lives in one owned map per gate, not a global
//! - Every check-and-update runs under the map's shard lock; the upstream
//!   call itself runs outside any lock
//! - A short-circuit surfaces as `FetchError::CircuitOpen`, so callers treat
//!   it exactly like a transport failure
//! - No policy configured means pass-through: no statistics, no short-circuit

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::config::CircuitBreakerConfig;
use crate::error::FetchError;
use crate::observability::{EventSink, LogContext, LogLevel, Stat};
use crate::resilience::clock::Clock;
use crate::resilience::endpoint::EndpointKey;
use crate::resilience::window::{CircuitMetrics, RollingWindow};

/// Breaker state for one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    window: RollingWindow,
    opened_at: Option<Instant>,
}

impl BreakerState {
    fn new(policy: &CircuitBreakerConfig) -> Self {
        Self {
            state: CircuitState::Closed,
            window: RollingWindow::new(
                Duration::from_millis(policy.window_duration_ms),
                policy.num_buckets,
            ),
            opened_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    Opened(CircuitMetrics),
    Closed(CircuitMetrics),
}

/// Gate wrapping every live fetch attempt.
pub struct CircuitBreakerGate {
    policy: Option<CircuitBreakerConfig>,
    breakers: DashMap<EndpointKey, BreakerState>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn EventSink>,
}

impl CircuitBreakerGate {
    /// Create a gate. `None` builds a pass-through gate.
    pub fn new(
        policy: Option<CircuitBreakerConfig>,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            policy,
            breakers: DashMap::new(),
            clock,
            sink,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.policy.is_some()
    }

    /// Whether endpoint keys include the URL path.
    pub fn includes_path(&self) -> bool {
        self.policy.as_ref().is_some_and(|p| p.include_path)
    }

    /// Run `attempt` unless the endpoint's breaker is open.
    ///
    /// Any `Err` from the attempt counts as a failure in the rolling window.
    pub async fn guard<T, F, Fut>(
        &self,
        endpoint: &EndpointKey,
        context: &LogContext,
        attempt: F,
    ) -> Result<T, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let Some(policy) = &self.policy else {
            return attempt().await;
        };

        let (admitted, transition) = self.admit(endpoint, policy);
        if let Some(transition) = transition {
            self.announce(endpoint, context, transition);
        }
        if !admitted {
            tracing::trace!(endpoint = %endpoint, "Attempt short-circuited");
            return Err(FetchError::CircuitOpen {
                endpoint: endpoint.clone(),
            });
        }

        let outcome = attempt().await;

        if let Some(transition) = self.record(endpoint, policy, outcome.is_ok()) {
            self.announce(endpoint, context, transition);
        }
        outcome
    }

    /// Current state of an endpoint's breaker, if one exists.
    pub fn state_of(&self, endpoint: &EndpointKey) -> Option<CircuitState> {
        self.breakers.get(endpoint).map(|b| b.state)
    }

    /// Rolling metrics of an endpoint's breaker, if one exists.
    pub fn metrics_of(&self, endpoint: &EndpointKey) -> Option<CircuitMetrics> {
        let now = self.clock.now();
        self.breakers.get_mut(endpoint).map(|mut b| b.window.metrics(now))
    }

    /// Number of endpoints with breaker state.
    pub fn tracked_endpoints(&self) -> usize {
        self.breakers.len()
    }

    fn admit(
        &self,
        endpoint: &EndpointKey,
        policy: &CircuitBreakerConfig,
    ) -> (bool, Option<Transition>) {
        let now = self.clock.now();
        let mut breaker = self
            .breakers
            .entry(endpoint.clone())
            .or_insert_with(|| BreakerState::new(policy));

        match (breaker.state, breaker.opened_at) {
            (CircuitState::Closed, _) => (true, None),
            (CircuitState::Open, Some(opened_at))
                if now.duration_since(opened_at) >= breaker.window.duration() =>
            {
                let metrics = breaker.window.metrics(now);
                breaker.state = CircuitState::Closed;
                breaker.opened_at = None;
                breaker.window.reset();
                (true, Some(Transition::Closed(metrics)))
            }
            (CircuitState::Open, _) => (false, None),
        }
    }

    fn record(
        &self,
        endpoint: &EndpointKey,
        policy: &CircuitBreakerConfig,
        success: bool,
    ) -> Option<Transition> {
        let now = self.clock.now();
        let mut breaker = self
            .breakers
            .entry(endpoint.clone())
            .or_insert_with(|| BreakerState::new(policy));

        breaker.window.record(now, success);
        if breaker.state == CircuitState::Open {
            return None;
        }

        let metrics = breaker.window.metrics(now);
        let over_volume = metrics.total_count >= policy.volume_threshold;
        let over_errors =
            metrics.error_count > 0 && metrics.error_percentage >= policy.error_threshold_percent;
        if over_volume && over_errors {
            breaker.state = CircuitState::Open;
            breaker.opened_at = Some(now);
            Some(Transition::Opened(metrics))
        } else {
            None
        }
    }

    fn announce(&self, endpoint: &EndpointKey, context: &LogContext, transition: Transition) {
        match transition {
            Transition::Opened(metrics) => {
                self.sink.log(
                    LogLevel::Error,
                    &format!("CIRCUIT BREAKER OPEN for host {}", endpoint),
                    &context.with_circuit(metrics),
                );
                self.sink.stat(Stat::increment(context.stat_key("circuitBreaker.open")));
            }
            Transition::Closed(metrics) => {
                self.sink.log(
                    LogLevel::Info,
                    &format!("CIRCUIT BREAKER CLOSED for host {}", endpoint),
                    &context.with_circuit(metrics),
                );
                self.sink.stat(Stat::increment(context.stat_key("circuitBreaker.close")));
            }
        }
    }
}

impl std::fmt::Debug for CircuitBreakerGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreakerGate")
            .field("policy", &self.policy)
            .field("tracked_endpoints", &self.breakers.len())
            .finish()
    }
}
