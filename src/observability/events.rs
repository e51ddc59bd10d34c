//! Event sink interface.
//!
//! Every component of the fetch pipeline reports through an injected
//! `Arc<dyn EventSink>`. Callers own construction and lifecycle of the sink.

use std::fmt;

use crate::resilience::window::CircuitMetrics;

/// Severity of a log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Severity for an upstream status code, grouped by leading digit.
    ///
    /// `3xx` is info, `4xx` is warn, anything else (including no status at all)
    /// is error.
    pub fn for_status(status: Option<u16>) -> Self {
        match status.map(|s| s / 100) {
            Some(3) => LogLevel::Info,
            Some(4) => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(s)
    }
}

/// Correlation data attached to a log event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogContext {
    /// Opaque correlation id carried by the request.
    pub tracer: Option<String>,
    /// Opaque request classification carried by the request.
    pub request_type: Option<String>,
    pub status_code: Option<u16>,
    pub response_time_ms: Option<u64>,
    /// Rolling breaker statistics, set on breaker transitions.
    pub circuit: Option<CircuitMetrics>,
    /// Prefix for stat keys emitted on behalf of this request.
    pub stats_prefix: Option<String>,
}

impl LogContext {
    pub fn new(tracer: Option<String>, request_type: Option<String>) -> Self {
        Self {
            tracer,
            request_type,
            ..Default::default()
        }
    }

    pub fn with_stats_prefix(mut self, prefix: Option<String>) -> Self {
        self.stats_prefix = prefix;
        self
    }

    /// Full stat key for `suffix`, e.g. `svc.cacheHit`.
    pub fn stat_key(&self, suffix: &str) -> String {
        match &self.stats_prefix {
            Some(prefix) if !prefix.is_empty() => format!("{}.{}", prefix, suffix),
            _ => suffix.to_string(),
        }
    }

    pub fn with_status(&self, status_code: Option<u16>) -> Self {
        Self {
            status_code,
            ..self.clone()
        }
    }

    pub fn with_response_time(&self, response_time_ms: u64) -> Self {
        Self {
            response_time_ms: Some(response_time_ms),
            ..self.clone()
        }
    }

    pub fn with_circuit(&self, metrics: CircuitMetrics) -> Self {
        Self {
            circuit: Some(metrics),
            ..self.clone()
        }
    }
}

/// A statistic emitted alongside log events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stat {
    /// Count one occurrence.
    Increment { key: String },
    /// Record a latency sample in milliseconds.
    Timing { key: String, value_ms: u64 },
}

impl Stat {
    pub fn increment(key: impl Into<String>) -> Self {
        Stat::Increment { key: key.into() }
    }

    pub fn timing(key: impl Into<String>, value_ms: u64) -> Self {
        Stat::Timing {
            key: key.into(),
            value_ms,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Stat::Increment { key } | Stat::Timing { key, .. } => key,
        }
    }
}

/// Fire-and-forget destination for log and stat events.
///
/// Implementations must not block and must not panic; the pipeline calls them
/// inline on every branch.
pub trait EventSink: Send + Sync {
    fn log(&self, level: LogLevel, message: &str, context: &LogContext);

    fn stat(&self, stat: Stat);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_for_status() {
        assert_eq!(LogLevel::for_status(Some(301)), LogLevel::Info);
        assert_eq!(LogLevel::for_status(Some(404)), LogLevel::Warn);
        assert_eq!(LogLevel::for_status(Some(503)), LogLevel::Error);
        assert_eq!(LogLevel::for_status(Some(204)), LogLevel::Error);
        assert_eq!(LogLevel::for_status(None), LogLevel::Error);
    }

    #[test]
    fn test_context_builders_keep_correlation() {
        let ctx = LogContext::new(Some("t-1".into()), Some("fragment".into()));
        let with_status = ctx.with_status(Some(500)).with_response_time(12);
        assert_eq!(with_status.tracer.as_deref(), Some("t-1"));
        assert_eq!(with_status.request_type.as_deref(), Some("fragment"));
        assert_eq!(with_status.status_code, Some(500));
        assert_eq!(with_status.response_time_ms, Some(12));
        assert!(ctx.status_code.is_none());
    }

    #[test]
    fn test_context_stat_key() {
        let ctx = LogContext::new(None, None);
        assert_eq!(ctx.stat_key("cacheHit"), "cacheHit");
        let ctx = ctx.with_stats_prefix(Some("fragments".into()));
        assert_eq!(ctx.stat_key("cacheHit"), "fragments.cacheHit");
    }

    #[test]
    fn test_stat_key() {
        assert_eq!(Stat::increment("a.cacheHit").key(), "a.cacheHit");
        assert_eq!(Stat::timing("a.responseTime", 3).key(), "a.responseTime");
    }
}
