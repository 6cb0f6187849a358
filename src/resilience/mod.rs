//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call through the chain:
//!     → retries.rs (RetryInterceptor: classify outcome, back off, re-run next)
//!     → backoff.rs (delay schedule with jitter)
//!     → timeouts.rs (deadline futures raced by the terminal stage)
//! ```
//!
//! # Design Decisions
//! - Every call can carry a deadline; the default comes from the config
//! - Retries only for idempotent requests (GET, HEAD, PUT, DELETE, ...)
//! - All resilience logic is an ordinary interceptor

pub mod backoff;
pub mod retries;
pub mod timeouts;

pub use backoff::Backoff;
pub use retries::{RetryBudget, RetryInterceptor};
