//! Interceptor pipeline.
//!
//! # Data Flow
//! ```text
//! Proxy dispatch:
//!     → chain.rs (disposed? dispatch, race token/deadline)
//!     → interceptor.rs (stage 1 → stage 2 → ... via Next)
//!     → terminal.rs (build wire request, admission, transport)
//!     ← responses unwind in reverse stage order
//! ```
//!
//! # Design Decisions
//! - Chain as nested continuations rather than a request/response loop
//! - `Next` is `Copy`: wrapping stages may run the rest of the chain again
//! - The terminal stage is the only place a call touches the network

pub mod chain;
pub mod interceptor;
pub mod terminal;

pub use chain::InterceptorChain;
pub use interceptor::{Interceptor, Next};
pub use terminal::TransportStage;
