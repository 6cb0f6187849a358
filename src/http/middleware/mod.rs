//! Interceptors shipped with the crate.

pub mod cache;
pub mod headers;
pub mod trace;

pub use cache::CacheInterceptor;
pub use headers::{HeadersInterceptor, X_REQUEST_ID};
pub use trace::TraceInterceptor;
