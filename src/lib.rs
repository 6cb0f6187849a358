//! Declarative HTTP API clients.
//!
//! An API is declared once as a contract (usually with [`http_api!`]);
//! the factory turns it into a typed client whose every method is
//! dispatched through an ordered interceptor chain to a pooled transport.
//!
//! ```text
//!   façade method ──▶ Proxy ──▶ InterceptorChain ──▶ TransportStage ──▶ reqwest
//!                       │         (stage 1..n)          (admission,
//!                       │                                deadline, token)
//!                       ▼
//!            blocking │ pending │ detached
//! ```

// Declaring APIs
pub mod contract;
pub mod http;
pub mod proxy;

// Call pipeline
pub mod net;
pub mod pipeline;
pub mod resilience;

// Cross-cutting concerns
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod observability;

pub use config::ClientConfig;
pub use contract::ApiContract;
pub use error::ApiError;
pub use http::{ApiResponse, Arguments, Json};
pub use pipeline::{Interceptor, InterceptorChain, Next};
pub use proxy::{ClientOptions, HttpApi, PendingCall, PendingState, Proxy};

#[doc(hidden)]
pub mod __private {
    pub use reqwest::Method;
}
