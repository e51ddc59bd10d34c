//! In-memory event sink.

use std::sync::Mutex;

use crate::observability::events::{EventSink, LogContext, LogLevel, Stat};

/// One captured log event.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
    pub context: LogContext,
}

/// Sink that keeps every event it receives, in order.
///
/// Used by tests to assert on what the pipeline reported, and by the CLI's
/// diagnostics when a full event trail is wanted.
#[derive(Debug, Default)]
pub struct RecordingSink {
    logs: Mutex<Vec<LogRecord>>,
    stats: Mutex<Vec<Stat>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of captured log events.
    pub fn logs(&self) -> Vec<LogRecord> {
        self.logs.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Snapshot of captured stat events.
    pub fn stats(&self) -> Vec<Stat> {
        self.stats.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Messages of captured log events at the given level.
    pub fn messages_at(&self, level: LogLevel) -> Vec<String> {
        self.logs()
            .into_iter()
            .filter(|r| r.level == level)
            .map(|r| r.message)
            .collect()
    }

    /// Number of stat events whose key ends with `suffix`.
    pub fn stat_count(&self, suffix: &str) -> usize {
        self.stats().iter().filter(|s| s.key().ends_with(suffix)).count()
    }

    /// True if any captured message contains `needle`.
    pub fn has_message(&self, needle: &str) -> bool {
        self.logs().iter().any(|r| r.message.contains(needle))
    }

    pub fn clear(&self) {
        if let Ok(mut logs) = self.logs.lock() {
            logs.clear();
        }
        if let Ok(mut stats) = self.stats.lock() {
            stats.clear();
        }
    }
}

impl EventSink for RecordingSink {
    fn log(&self, level: LogLevel, message: &str, context: &LogContext) {
        if let Ok(mut logs) = self.logs.lock() {
            logs.push(LogRecord {
                level,
                message: message.to_string(),
                context: context.clone(),
            });
        }
    }

    fn stat(&self, stat: Stat) {
        if let Ok(mut stats) = self.stats.lock() {
            stats.push(stat);
        }
    }
}
