//! `reqwest`-backed transport.
//!
//! # Responsibilities
//! - Issue GET requests over a pooled client
//! - Collect status, headers and the streamed body
//! - Bound the whole exchange by the caller's timeout
//!
//! # Design Decisions
//! - Redirect policy is fixed per client (`follow_redirect` config)
//! - The body is read chunk by chunk; the first chunk error ends the exchange
//! - A non-200 head ends the exchange at once; its body is never read
//! - Repeated header values are joined with `", "`

use std::collections::btree_map::Entry;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::HeaderMap;
use reqwest::redirect::Policy;
use url::Url;

use crate::error::TransportError;
use crate::http::transport::{Transport, TransportResponse};
use crate::http::{header_name, Headers};
use crate::resilience::timeouts;

const MAX_REDIRECTS: usize = 10;

/// Production transport.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(follow_redirect: bool) -> Result<Self, TransportError> {
        let policy = if follow_redirect {
            Policy::limited(MAX_REDIRECTS)
        } else {
            Policy::none()
        };

        let client = reqwest::Client::builder()
            .redirect(policy)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| TransportError::Request(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    async fn exchange(&self, url: &Url, headers: &Headers) -> Result<TransportResponse, TransportError> {
        let mut request = self.client.get(url.clone());
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let headers = collect_headers(response.headers());
        tracing::trace!(url = %url, status, "Upstream headers received");

        if status != 200 {
            return Ok(TransportResponse {
                status,
                headers,
                body: String::new(),
            });
        }

        let mut stream = response.bytes_stream();
        let mut body = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| TransportError::Body(e.to_string()))?;
            body.extend_from_slice(&chunk);
        }

        Ok(TransportResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &Url, headers: &Headers, timeout: Duration) -> Result<TransportResponse, TransportError> {
        timeouts::enforce(timeout, self.exchange(url, headers)).await
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else {
        TransportError::Request(err.to_string())
    }
}

fn collect_headers(map: &HeaderMap) -> Headers {
    let mut headers = Headers::new();
    for (name, value) in map {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        match headers.entry(header_name(name.as_str())) {
            Entry::Occupied(mut existing) => {
                let existing = existing.get_mut();
                existing.push_str(", ");
                existing.push_str(&value);
            }
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
        }
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_collect_headers_joins_duplicates() {
        let mut map = HeaderMap::new();
        map.append("cache-control", HeaderValue::from_static("public"));
        map.append("cache-control", HeaderValue::from_static("max-age=5"));
        map.insert("content-type", HeaderValue::from_static("text/html"));

        let headers = collect_headers(&map);
        assert_eq!(headers.get("cache-control").map(String::as_str), Some("public, max-age=5"));
        assert_eq!(headers.get("content-type").map(String::as_str), Some("text/html"));
    }

    #[test]
    fn test_builds_with_either_redirect_policy() {
        assert!(ReqwestTransport::new(true).is_ok());
        assert!(ReqwestTransport::new(false).is_ok());
    }
}
