//! Transport port.

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::error::TransportError;
use crate::http::Headers;

/// One complete upstream exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: String,
}

/// Performs one HTTP GET.
///
/// Implementations must bound the whole exchange, body included, by
/// `timeout` and report exactly one outcome. A non-200 status is that
/// outcome as soon as the head arrives; the body is left empty.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &Url, headers: &Headers, timeout: Duration) -> Result<TransportResponse, TransportError>;
}
