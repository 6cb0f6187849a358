//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! WireRequest from the terminal stage
//!     → connection.rs (admission per destination, queue or reject)
//!     → transport.rs (pooled HTTP exchange)
//!     → ApiResponse back to the terminal stage
//! ```
//!
//! # Design Decisions
//! - Admission is enforced before any I/O is attempted
//! - The transport is a trait so tests and embedders can substitute it
//! - Pool release is separate from admission; disposal touches both

pub mod connection;
pub mod transport;

pub use connection::{ConnectionGuard, ConnectionId, ConnectionLimiter};
pub use transport::{ReqwestTransport, Transport};
