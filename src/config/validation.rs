//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts and cache capacity > 0, thresholds within 0..=100)
//! - Check the breaker window can be sliced into its buckets
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: FetchConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{CacheEngine, FetchConfig};

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    /// What is wrong with it.
    pub reason: String,
}

impl ValidationError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &FetchConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.request.timeout_ms == 0 {
        errors.push(ValidationError::new("request.timeout_ms", "must be greater than 0"));
    }

    if config.cache.engine == CacheEngine::Memory && config.cache.capacity == 0 {
        errors.push(ValidationError::new("cache.capacity", "must be greater than 0"));
    }

    if let Some(breaker) = &config.circuit_breaker {
        if breaker.window_duration_ms == 0 {
            errors.push(ValidationError::new(
                "circuit_breaker.window_duration_ms",
                "must be greater than 0",
            ));
        }
        if breaker.num_buckets == 0 {
            errors.push(ValidationError::new("circuit_breaker.num_buckets", "must be greater than 0"));
        } else if u64::from(breaker.num_buckets) > breaker.window_duration_ms {
            errors.push(ValidationError::new(
                "circuit_breaker.num_buckets",
                format!(
                    "{} buckets cannot fit in a {}ms window",
                    breaker.num_buckets, breaker.window_duration_ms
                ),
            ));
        }
        if breaker.error_threshold_percent > 100 {
            errors.push(ValidationError::new(
                "circuit_breaker.error_threshold_percent",
                "must be between 0 and 100",
            ));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
