//! HTTP request, response and transport handling.
//!
//! # Data Flow
//! ```text
//! Caller
//!     → request.rs (descriptor, defaults merged, cache key derived)
//!     → [fetch pipeline: cache lookup, breaker gate]
//!     → transport.rs (Transport port) → client.rs (reqwest implementation)
//!     → response.rs (result handed back to the caller)
//! ```

pub mod client;
pub mod request;
pub mod response;
pub mod transport;

use std::collections::BTreeMap;

/// Header map with lower-cased names. Repeated upstream headers are joined
/// with `", "`.
pub type Headers = BTreeMap<String, String>;

/// Name of the header that steers cache writes.
pub const CACHE_CONTROL: &str = "cache-control";

/// Lower-case a header name for storage in [`Headers`].
pub fn header_name(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

pub use client::ReqwestTransport;
pub use request::{FetchRequest, PreparedRequest, CACHE_ONLY_URL};
pub use response::FetchResponse;
pub use transport::{Transport, TransportResponse};
