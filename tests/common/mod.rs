//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;

use resilient_fetch::cache::{CacheEntry, CacheLookup, CacheStore, MemoryCache};
use resilient_fetch::error::{CacheError, TransportError};
use resilient_fetch::http::{Headers, Transport, TransportResponse};

/// One canned response from the mock backend.
#[derive(Debug, Clone)]
pub struct MockReply {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub delay: Duration,
    pub stall: Option<Duration>,
}

impl MockReply {
    pub fn ok(body: &str) -> Self {
        Self::status(200).body(body)
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: String::new(),
            delay: Duration::ZERO,
            stall: None,
        }
    }

    pub fn body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Send the head and part of the body, then hang for `stall`.
    pub fn stalled_body(mut self, stall: Duration) -> Self {
        self.stall = Some(stall);
        self
    }

    /// Wait before writing anything back.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        301 => "Moved Permanently",
        302 => "Found",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// Handle to a running mock backend.
#[derive(Clone)]
pub struct MockBackend {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockBackend {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Number of requests received.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Raw request heads received, lower-cased.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// Start a mock backend that always returns `reply`.
pub async fn start_mock_backend(reply: MockReply) -> MockBackend {
    start_programmable_backend(move || {
        let reply = reply.clone();
        async move { reply }
    })
    .await
}

/// Start a programmable mock backend on an ephemeral port.
pub async fn start_programmable_backend<F, Fut>(f: F) -> MockBackend
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = MockReply> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let backend = MockBackend {
        addr: listener.local_addr().unwrap(),
        hits: Arc::new(AtomicUsize::new(0)),
        requests: Arc::new(Mutex::new(Vec::new())),
    };
    let f = Arc::new(f);
    let state = backend.clone();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    let state = state.clone();
                    tokio::spawn(async move {
                        let head = read_head(&mut socket).await;
                        state.hits.fetch_add(1, Ordering::SeqCst);
                        state.requests.lock().unwrap().push(head.to_ascii_lowercase());

                        let reply = f().await;
                        if !reply.delay.is_zero() {
                            tokio::time::sleep(reply.delay).await;
                        }

                        let mut response = format!("HTTP/1.1 {} {}\r\n", reply.status, reason(reply.status));
                        for (name, value) in &reply.headers {
                            response.push_str(&format!("{}: {}\r\n", name, value));
                        }
                        // A stalled reply announces more bytes than it sends.
                        let declared = reply.body.len() + if reply.stall.is_some() { 100 } else { 0 };
                        response.push_str(&format!(
                            "Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                            declared, reply.body
                        ));
                        let _ = socket.write_all(response.as_bytes()).await;
                        if let Some(stall) = reply.stall {
                            let _ = socket.flush().await;
                            tokio::time::sleep(stall).await;
                        }
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    backend
}

async fn read_head(socket: &mut tokio::net::TcpStream) -> String {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
    String::from_utf8_lossy(&head).into_owned()
}

/// An address nothing is listening on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// In-memory transport replaying a script of outcomes, then a fallback.
pub struct ScriptedTransport {
    script: Mutex<Vec<Result<TransportResponse, TransportError>>>,
    fallback: Result<TransportResponse, TransportError>,
    delay: Duration,
    calls: AtomicUsize,
    urls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Result<TransportResponse, TransportError>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().rev().collect()),
            fallback: Err(TransportError::Connect("script exhausted".into())),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
        }
    }

    /// Transport that always answers with `outcome`.
    pub fn always(outcome: Result<TransportResponse, TransportError>) -> Self {
        Self::new(Vec::new()).then(outcome)
    }

    /// Outcome once the script runs out.
    pub fn then(mut self, outcome: Result<TransportResponse, TransportError>) -> Self {
        self.fallback = outcome;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, url: &Url, _headers: &Headers, _timeout: Duration) -> Result<TransportResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.script.lock().unwrap().pop();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

pub fn ok(body: &str) -> Result<TransportResponse, TransportError> {
    ok_with(body, &[])
}

pub fn ok_with(body: &str, headers: &[(&str, &str)]) -> Result<TransportResponse, TransportError> {
    Ok(TransportResponse {
        status: 200,
        headers: headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        body: body.to_string(),
    })
}

pub fn status(code: u16) -> Result<TransportResponse, TransportError> {
    Ok(TransportResponse {
        status: code,
        headers: Headers::new(),
        body: String::new(),
    })
}

/// Cache wrapper that records every write and can be told to fail them.
pub struct RecordingCache {
    inner: MemoryCache,
    writes: Mutex<Vec<(String, Duration)>>,
    fail_writes: bool,
}

impl RecordingCache {
    pub fn new(inner: MemoryCache) -> Self {
        Self {
            inner,
            writes: Mutex::new(Vec::new()),
            fail_writes: false,
        }
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// `(key, ttl)` of every write, in order.
    pub fn writes(&self) -> Vec<(String, Duration)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl CacheStore for RecordingCache {
    fn engine(&self) -> &'static str {
        "recording"
    }

    async fn get(&self, key: &str) -> Result<CacheLookup, CacheError> {
        self.inner.get(key).await
    }

    fn set(&self, key: &str, entry: CacheEntry, ttl: Duration) -> BoxFuture<'static, Result<(), CacheError>> {
        self.writes.lock().unwrap().push((key.to_string(), ttl));
        if self.fail_writes {
            return Box::pin(async { Err(CacheError::Write("disk full".into())) });
        }
        self.inner.set(key, entry, ttl)
    }
}
