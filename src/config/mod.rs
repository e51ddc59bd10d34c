//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → FetchConfig (validated, immutable)
//!     → handed to ResilientFetcher::from_config
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - An absent `[circuit_breaker]` section disables the breaker entirely
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::CacheConfig;
pub use schema::CacheEngine;
pub use schema::CircuitBreakerConfig;
pub use schema::FetchConfig;
pub use schema::ObservabilityConfig;
pub use schema::RequestDefaults;
