//! Production event sink backed by `tracing` and the `metrics` facade.

use crate::observability::events::{EventSink, LogContext, LogLevel, Stat};

/// Sink that turns log events into `tracing` events and stats into metrics.
///
/// Without an installed subscriber or recorder both halves are silent.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TracingSink {
    pub fn new() -> Self {
        Self
    }
}

macro_rules! emit {
    ($level:ident, $message:expr, $ctx:expr) => {{
        let (total, errors, percentage) = match &$ctx.circuit {
            Some(m) => (Some(m.total_count), Some(m.error_count), Some(m.error_percentage)),
            None => (None, None, None),
        };
        tracing::$level!(
            tracer = $ctx.tracer.as_deref(),
            request_type = $ctx.request_type.as_deref(),
            status_code = $ctx.status_code,
            response_time_ms = $ctx.response_time_ms,
            circuit_total_count = total,
            circuit_error_count = errors,
            circuit_error_percentage = percentage,
            "{}",
            $message
        )
    }};
}

impl EventSink for TracingSink {
    fn log(&self, level: LogLevel, message: &str, context: &LogContext) {
        match level {
            LogLevel::Debug => emit!(debug, message, context),
            LogLevel::Info => emit!(info, message, context),
            LogLevel::Warn => emit!(warn, message, context),
            LogLevel::Error => emit!(error, message, context),
        }
    }

    fn stat(&self, stat: Stat) {
        match stat {
            Stat::Increment { key } => metrics::counter!(key).increment(1),
            Stat::Timing { key, value_ms } => metrics::histogram!(key).record(value_ms as f64),
        }
    }
}
