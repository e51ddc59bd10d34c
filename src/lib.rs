//! Resilient HTTP content retrieval.
//!
//! A read-through cache with stale-on-error fallback, sitting in front of a
//! per-endpoint circuit breaker that guards every live fetch attempt.

pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::FetchConfig;
pub use error::{FetchError, FetchFailure};
pub use fetch::{ResilientFetcher, ResilientFetcherBuilder};
pub use http::request::FetchRequest;
pub use http::response::FetchResponse;
pub use lifecycle::Shutdown;
