//! Configuration schema definitions.
//!
//! This module defines the connection policy every client is built from.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Connection limit per destination host when none is configured.
pub const DEFAULT_CONNECTION_LIMIT: usize = 128;

/// Root configuration for a client.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Destination used when a method path is not absolute
    /// (e.g., "https://api.example.com/v1/").
    pub base_address: Option<String>,

    /// Maximum concurrent outbound requests per destination host.
    pub connection_limit: usize,

    /// What happens to calls beyond the connection limit.
    pub admission: AdmissionPolicy,

    /// User-Agent header sent with every request.
    pub user_agent: String,

    /// Headers added to every request unless the call sets them itself.
    pub default_headers: BTreeMap<String, String>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Retry configuration.
    pub retries: RetryConfig,

    /// Response cache configuration.
    pub cache: CacheConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_address: None,
            connection_limit: DEFAULT_CONNECTION_LIMIT,
            admission: AdmissionPolicy::Queue,
            user_agent: concat!("httpapi/", env!("CARGO_PKG_VERSION")).to_string(),
            default_headers: BTreeMap::new(),
            timeouts: TimeoutConfig::default(),
            retries: RetryConfig::default(),
            cache: CacheConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Default configuration targeting `base_address`.
    pub fn with_base_address(base_address: impl Into<String>) -> Self {
        Self {
            base_address: Some(base_address.into()),
            ..Self::default()
        }
    }
}

/// Behaviour when a host's connection limit is reached.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionPolicy {
    /// Wait for a slot to free up.
    #[default]
    Queue,
    /// Fail the call immediately.
    Reject,
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Per-call deadline (total time for request/response) in seconds.
    pub request_secs: u64,

    /// How long idle pooled connections are kept, in seconds.
    pub idle_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
            idle_secs: 60,
        }
    }
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    pub fn idle(&self) -> Duration {
        Duration::from_secs(self.idle_secs)
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Percentage of requests that can be retries (retry budget).
    /// e.g., 0.1 for 10% budget.
    pub budget_ratio: f32,

    /// Retries always allowed regardless of the ratio.
    pub min_retries: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
            budget_ratio: 0.1,
            min_retries: 10,
        }
    }
}

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Time a cached response stays fresh, in seconds.
    pub ttl_secs: u64,

    /// Maximum number of cached responses.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 60,
            max_entries: 1024,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Record call metrics.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
        }
    }
}
