//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Fetch pipeline, breaker gate, cache write tasks produce:
//!     → EventSink::log  (severity, message, correlation context)
//!     → EventSink::stat (increment / timing)
//!
//! Sinks:
//!     → TracingSink   (tracing events + metrics facade)
//!     → RecordingSink (in-memory, tests and diagnostics)
//!     → NoOpSink      (silent)
//! ```
//!
//! # Design Decisions
//! - The sink is injected, never a global inside the pipeline
//! - Emission is fire-and-forget and never fails the pipeline
//! - Subscriber and exporter installation live here, owned by the binary

pub mod events;
pub mod logging;
pub mod metrics;
mod noop;
mod recording;
mod tracing_sink;

pub use events::{EventSink, LogContext, LogLevel, Stat};
pub use noop::NoOpSink;
pub use recording::{LogRecord, RecordingSink};
pub use tracing_sink::TracingSink;
