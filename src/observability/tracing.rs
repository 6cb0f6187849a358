//! Call spans.
//!
//! Every traversal can be wrapped in a span carrying the request ID, so
//! events emitted by interceptors and the transport correlate.

use ::tracing::Span;

use crate::http::request::ApiRequest;

/// Span for one call traversal.
pub fn call_span(request: &ApiRequest) -> Span {
    ::tracing::info_span!(
        "call",
        request_id = %request.id(),
        contract = request.contract(),
        method = request.method().name,
        verb = %request.method().verb,
    )
}
