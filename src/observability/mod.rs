//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Chain stages and the lifecycle produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!     → tracing.rs (spans with request IDs)
//!
//! Consumers:
//!     → Log aggregation (stdout via the binary's subscriber)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every stage of a call
//! - Metrics are cheap (no-op without a recorder)

pub mod logging;
pub mod metrics;
pub mod tracing;
