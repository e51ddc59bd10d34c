//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Live fetch attempt:
//!     → circuit_breaker.rs (admit or short-circuit, keyed by endpoint.rs)
//!     → timeouts.rs (enforce the attempt's hard deadline)
//!     → outcome recorded into window.rs, possibly flipping the breaker
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every network attempt has a deadline
//! - No retries: a failed attempt falls back to stale cache content instead
//! - Time is read through clock.rs so breaker windows are testable

pub mod circuit_breaker;
pub mod clock;
pub mod endpoint;
pub mod timeouts;
pub mod window;

pub use circuit_breaker::{CircuitBreakerGate, CircuitState};
pub use clock::{Clock, MockClock, SystemClock};
pub use endpoint::EndpointKey;
pub use window::CircuitMetrics;
