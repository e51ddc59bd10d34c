//! Successful fetch result.

use serde::Serialize;

use crate::http::{Headers, CACHE_CONTROL};

/// Content returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchResponse {
    pub status_code: u16,
    pub content: String,
    pub headers: Headers,
    /// Milliseconds spent serving the call.
    pub timing_ms: u64,
}

impl FetchResponse {
    pub fn cache_control(&self) -> Option<&str> {
        self.headers.get(CACHE_CONTROL).map(String::as_str)
    }
}
