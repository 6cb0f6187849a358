//! Header injection middleware.
//!
//! # Responsibilities
//! - Stamp every call with `x-request-id` carrying its request ID
//! - Apply a fixed set of headers to every call
//!
//! # Design Decisions
//! - Never overrides a header an earlier stage already set
//! - Header arguments declared on the method still win at build time

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::config::ValidationError;
use crate::error::ApiError;
use crate::http::request::ApiRequest;
use crate::http::response::ApiResponse;
use crate::pipeline::{Interceptor, Next};

pub const X_REQUEST_ID: &str = "x-request-id";

#[derive(Debug, Clone)]
pub struct HeadersInterceptor {
    headers: HeaderMap,
    request_id: bool,
}

impl Default for HeadersInterceptor {
    fn default() -> Self {
        Self {
            headers: HeaderMap::new(),
            request_id: true,
        }
    }
}

impl HeadersInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fixed header. Fails on names or values HTTP cannot carry.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, ApiError> {
        let invalid = |reason: String| {
            ApiError::InvalidConfiguration(vec![ValidationError::new(format!("headers.{}", name), reason)])
        };
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(e.to_string()))?;
        let header_value = HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Stop adding `x-request-id`.
    pub fn without_request_id(mut self) -> Self {
        self.request_id = false;
        self
    }
}

#[async_trait]
impl Interceptor for HeadersInterceptor {
    fn name(&self) -> &str {
        "headers"
    }

    async fn intercept(&self, mut request: ApiRequest, next: Next<'_>) -> Result<ApiResponse, ApiError> {
        for (name, value) in &self.headers {
            request.set_default_header(name.clone(), value.clone());
        }
        if self.request_id {
            if let Ok(value) = HeaderValue::from_str(&request.id().to_string()) {
                request.set_default_header(HeaderName::from_static(X_REQUEST_ID), value);
            }
        }
        next.run(request).await
    }
}
