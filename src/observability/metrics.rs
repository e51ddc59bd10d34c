//! Metrics exposition.
//!
//! # Responsibilities
//! - Install the Prometheus recorder behind the `metrics` facade
//! - Serve the scrape endpoint
//!
//! # Metrics
//! Stat events from the fetch pipeline become counters and histograms named
//! after their stat key, e.g. `<prefix>.cacheHit`, `<prefix>.requestError`,
//! `<prefix>.responseTime`.
//!
//! # Design Decisions
//! - Recording is decoupled from exposition: `TracingSink` only talks to the
//!   facade, so the exporter is optional

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter listening on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}
