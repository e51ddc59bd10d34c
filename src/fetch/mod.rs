//! Resilient fetch orchestration.
//!
//! # Data Flow
//! ```text
//! FetchRequest
//!     → prepare (defaults, cache key, tracer)
//!     → validate URL (or cache-only sentinel)
//!     → bypass?  ──yes──→ gated attempt → force no-cache headers → caller
//!     → cache lookup (error ⇒ bypass path)
//!     → hit      ──yes──→ caller (no network)
//!     → miss     → gated attempt
//!                    ├─ failure → report once → stale attached if cached → caller
//!                    └─ success → cache-control → set (completion logged later) → caller
//! ```
//!
//! # Design Decisions
//! - Concurrent misses for one key are not coalesced; each reaches the upstream
//! - Cache failures never reach the caller; the pipeline degrades around them
//! - Every failure is logged once at its severity and counted once

mod builder;
mod fetcher;

pub use builder::ResilientFetcherBuilder;
pub use fetcher::{ResilientFetcher, NO_CACHE_DIRECTIVES};
