//! Endpoint identity for per-endpoint breakers.

use std::fmt;

use url::Url;

/// Key under which breaker state is tracked: `host[:port]`, optionally
/// followed by the URL path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointKey(String);

impl EndpointKey {
    /// Derive the key for `url`.
    pub fn from_url(url: &Url, include_path: bool) -> Self {
        let mut key = url.host_str().unwrap_or_default().to_string();
        if let Some(port) = url.port() {
            key.push(':');
            key.push_str(&port.to_string());
        }
        if include_path {
            key.push_str(url.path());
        }
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EndpointKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl fmt::Display for EndpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
