//! HTTP request and response handling.
//!
//! # Data Flow
//! ```text
//! Façade call
//!     → request.rs (ApiRequest: arguments, headers, token, deadline, state)
//!     → middleware/ (request ID, fixed headers, tracing, caching)
//!     → builder.rs (WireRequest: URL, query, headers, JSON body)
//!     → [transport]
//!     → response.rs (ApiResponse → declared return type)
//! ```

pub mod builder;
pub mod middleware;
pub mod request;
pub mod response;

pub use builder::{RequestBuilder, WireRequest};
pub use request::{ApiRequest, Arguments, CallCell, CallState};
pub use response::{ApiResponse, FromResponse, Json};
