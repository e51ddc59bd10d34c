//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Install logging, then the metrics exporter when enabled
//!
//! # Design Decisions
//! - Fail fast: a bad config file is fatal
//! - No config file means built-in defaults
//! - Logging comes up before anything that might want to log

use std::net::SocketAddr;
use std::path::Path;

use crate::config::loader::{load_config, ConfigError};
use crate::config::{FetchConfig, ObservabilityConfig};
use crate::observability::{logging, metrics};

/// Load configuration from `path`, or defaults when no path is given.
pub fn load(path: Option<&Path>) -> Result<FetchConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => Ok(FetchConfig::default()),
    }
}

/// Install the tracing subscriber and, if enabled, the Prometheus exporter.
///
/// Must be called from within a Tokio runtime when metrics are enabled.
pub fn init_observability(config: &ObservabilityConfig) -> Result<(), Box<dyn std::error::Error>> {
    logging::init_tracing(config)?;

    if config.metrics_enabled {
        let addr: SocketAddr = config.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_path_uses_defaults() {
        let config = load(None).unwrap();
        assert_eq!(config.request.timeout_ms, 5_000);
        assert!(config.circuit_breaker.is_none());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load(Some(Path::new("/nonexistent/resilient-fetch.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
