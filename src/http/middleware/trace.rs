//! Call tracing middleware.
//!
//! Logs the start and end of every call with its request ID and records
//! the call counter and latency histogram.

use async_trait::async_trait;
use std::time::Instant;

use crate::error::ApiError;
use crate::http::request::ApiRequest;
use crate::http::response::ApiResponse;
use crate::observability::metrics;
use crate::pipeline::{Interceptor, Next};

#[derive(Debug, Default, Clone, Copy)]
pub struct TraceInterceptor;

impl TraceInterceptor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Interceptor for TraceInterceptor {
    fn name(&self) -> &str {
        "trace"
    }

    async fn intercept(&self, request: ApiRequest, next: Next<'_>) -> Result<ApiResponse, ApiError> {
        let start = Instant::now();
        let request_id = request.id();
        let contract = request.contract();
        let method = request.method().name;

        tracing::info!(
            request_id = %request_id,
            contract,
            method,
            verb = %request.method().verb,
            "Call started"
        );

        let outcome = next.run(request).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        let label = match &outcome {
            Ok(response) => {
                tracing::info!(
                    request_id = %request_id,
                    method,
                    status = response.status.as_u16(),
                    elapsed_ms,
                    "Call finished"
                );
                if response.is_success() {
                    "success"
                } else {
                    "error_status"
                }
            }
            Err(e) if e.is_cancelled() => {
                tracing::info!(request_id = %request_id, method, elapsed_ms, reason = %e, "Call cancelled");
                "cancelled"
            }
            Err(e) => {
                tracing::warn!(request_id = %request_id, method, elapsed_ms, error = %e, "Call failed");
                "failure"
            }
        };
        metrics::record_call(contract, method, label, start);

        outcome
    }
}
