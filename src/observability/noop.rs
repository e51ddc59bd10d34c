//! No-operation event sink.

use crate::observability::events::{EventSink, LogContext, LogLevel, Stat};

/// A sink that discards all events.
///
/// Useful for unit tests where log output would be noise, and for embedders
/// that do not care about fetch telemetry.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpSink;

impl EventSink for NoOpSink {
    #[inline]
    fn log(&self, _level: LogLevel, _message: &str, _context: &LogContext) {}

    #[inline]
    fn stat(&self, _stat: Stat) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_noop_sink_as_trait_object() {
        let sink: Arc<dyn EventSink> = Arc::new(NoOpSink);
        sink.log(LogLevel::Warn, "discarded", &LogContext::default());
        sink.stat(Stat::increment("discarded"));
    }
}
