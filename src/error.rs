//! Error taxonomy for the fetch pipeline.
//!
//! - [`FetchError`]: surfaced to the caller, optionally paired with stale
//!   content inside a [`FetchFailure`]
//! - [`TransportError`]: one failed network exchange, wrapped by
//!   `FetchError::Transport`
//! - [`CacheError`]: recovered locally by the pipeline, never surfaced

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::http::Headers;
use crate::observability::LogLevel;
use crate::resilience::endpoint::EndpointKey;

/// Status reported to callers when a failure carries no HTTP status.
pub const DEFAULT_FAILURE_STATUS: u16 = 500;

/// Failure of a single network exchange.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The exchange did not complete before its deadline.
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// DNS, connect or TLS failure.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The body stream broke after headers arrived.
    #[error("body stream failed: {0}")]
    Body(String),

    /// Any other client-side request failure.
    #[error("request failed: {0}")]
    Request(String),
}

/// Failures surfaced to the caller of `ResilientFetcher::fetch`.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The URL is neither absolute nor the cache-only sentinel.
    #[error("Service {url} responded with Invalid URL {url}")]
    InvalidUrl { url: String },

    /// The network exchange itself failed.
    #[error("Service {url} responded with {source}")]
    Transport {
        url: String,
        #[source]
        source: TransportError,
    },

    /// The upstream answered with something other than 200.
    #[error("Service {url} responded with status code {status}")]
    UpstreamStatus {
        url: String,
        status: u16,
        headers: Headers,
    },

    /// The endpoint's breaker is open; the upstream was not called.
    #[error("Service at {endpoint} has circuit breaker engaged.")]
    CircuitOpen { endpoint: EndpointKey },
}

impl FetchError {
    /// HTTP status of the failure, if the upstream produced one.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            FetchError::UpstreamStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Status reported to the caller, defaulting to 500.
    pub fn status_code(&self) -> u16 {
        self.upstream_status().unwrap_or(DEFAULT_FAILURE_STATUS)
    }

    /// Severity derived from the status code family.
    pub fn severity(&self) -> LogLevel {
        LogLevel::for_status(self.upstream_status())
    }

    /// Upstream response headers, when a response arrived.
    pub fn headers(&self) -> Option<&Headers> {
        match self {
            FetchError::UpstreamStatus { headers, .. } => Some(headers),
            _ => None,
        }
    }

    /// True when the failure was produced by the breaker.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, FetchError::CircuitOpen { .. })
    }
}

/// Cache content served in place of a failed fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaleContent {
    pub content: String,
    pub headers: Headers,
}

/// A failed fetch, with the last known content when the cache had one.
#[derive(Debug, Clone)]
pub struct FetchFailure {
    error: FetchError,
    stale: Option<StaleContent>,
}

impl FetchFailure {
    pub fn new(error: FetchError, stale: Option<StaleContent>) -> Self {
        Self { error, stale }
    }

    pub fn error(&self) -> &FetchError {
        &self.error
    }

    pub fn status_code(&self) -> u16 {
        self.error.status_code()
    }

    pub fn message(&self) -> String {
        self.error.to_string()
    }

    pub fn headers(&self) -> Option<&Headers> {
        self.error.headers()
    }

    /// Stale content the caller may choose to serve.
    pub fn stale(&self) -> Option<&StaleContent> {
        self.stale.as_ref()
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.error, self.status_code())?;
        if self.stale.is_some() {
            write!(f, " [stale content available]")?;
        }
        Ok(())
    }
}

impl std::error::Error for FetchFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl From<FetchError> for FetchFailure {
    fn from(error: FetchError) -> Self {
        Self::new(error, None)
    }
}

/// Cache engine failures. The pipeline degrades around these.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache read failed: {0}")]
    Read(String),

    #[error("cache write failed: {0}")]
    Write(String),
}
