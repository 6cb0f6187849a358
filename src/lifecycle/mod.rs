//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Construction (factory):
//!     Transport + ConnectionLimiter → Lifecycle (prune timer started)
//!
//! Per call (executor.rs):
//!     pending/detached → caller's runtime, or the dedicated runtime
//!     blocking         → dedicated runtime, calling thread waits
//!
//! Disposal (dispose.rs):
//!     dispose() → signal watchers → close transport pool → prune limiter
//! ```
//!
//! # Design Decisions
//! - Disposal is exactly-once; repeated calls are no-ops
//! - Disposal stops new calls but aborts no in-flight call
//! - The dedicated runtime outlives disposal and is only shut down when
//!   the last holder of the chain goes away

pub mod dispose;
pub mod executor;

pub use dispose::Lifecycle;
pub use executor::Executor;
