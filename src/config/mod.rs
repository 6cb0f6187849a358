//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) or ClientConfig::default()
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated)
//!     → frozen into an Arc by the factory, one per chain
//! ```
//!
//! # Design Decisions
//! - A built client never observes later changes to a config value
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AdmissionPolicy, CacheConfig, ClientConfig, ObservabilityConfig, RetryConfig, TimeoutConfig,
    DEFAULT_CONNECTION_LIMIT,
};
pub use validation::{validate_config, ValidationError};
