//! Terminal stage: the actual network exchange.
//!
//! # Responsibilities
//! - Build the wire request and apply configured default headers
//! - Take a per-destination admission slot
//! - Race the exchange against the call's token and deadline
//!
//! # Design Decisions
//! - The select drops the transport future as soon as a signal fires, so
//!   the admission slot is released promptly
//! - Queueing for admission happens inside the race and is cancellable
//! - Disposal is decided once, at dispatch; the stage sends through the
//!   transport handle leased then, so a call already in the chain is never
//!   refused by a later `dispose()`

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::sync::Arc;

use crate::config::{ClientConfig, ValidationError};
use crate::error::{ApiError, CancelReason};
use crate::http::builder::RequestBuilder;
use crate::http::request::ApiRequest;
use crate::http::response::ApiResponse;
use crate::lifecycle::Lifecycle;
use crate::net::transport::Transport;
use crate::resilience::timeouts::sleep_until_deadline;

pub struct TransportStage {
    builder: RequestBuilder,
    default_headers: HeaderMap,
    lifecycle: Arc<Lifecycle>,
}

impl TransportStage {
    pub(crate) fn new(config: &ClientConfig, lifecycle: Arc<Lifecycle>) -> Result<Self, ApiError> {
        let base = match config.base_address.as_deref() {
            Some(raw) => Some(
                crate::config::validation::check_base_address(raw)
                    .map_err(|reason| ApiError::InvalidConfiguration(vec![ValidationError::new("base_address", reason)]))?,
            ),
            None => None,
        };

        let mut default_headers = HeaderMap::new();
        for (name, value) in &config.default_headers {
            let header = HeaderName::from_bytes(name.as_bytes())
                .ok()
                .zip(HeaderValue::from_str(value).ok())
                .ok_or_else(|| {
                    ApiError::InvalidConfiguration(vec![ValidationError::new(
                        format!("default_headers.{}", name),
                        "not a valid header",
                    )])
                })?;
            default_headers.insert(header.0, header.1);
        }

        Ok(Self {
            builder: RequestBuilder::new(base),
            default_headers,
            lifecycle,
        })
    }

    pub async fn exchange(&self, request: ApiRequest, transport: &dyn Transport) -> Result<ApiResponse, ApiError> {
        let mut wire = self.builder.build(&request, request.contract_base())?;
        for (name, value) in &self.default_headers {
            wire.headers.entry(name).or_insert_with(|| value.clone());
        }

        let destination = wire.destination();
        let limiter = self.lifecycle.limiter();
        let token = request.cancellation().clone();

        tracing::debug!(
            request_id = %request.id(),
            verb = %wire.method,
            url = %wire.url,
            "Sending request"
        );

        let exchange = async {
            let _guard = limiter.acquire(&destination).await?;
            transport.send(wire).await.map_err(ApiError::from)
        };

        tokio::select! {
            biased;
            _ = token.cancelled() => Err(ApiError::Cancelled { reason: CancelReason::Token }),
            _ = sleep_until_deadline(request.deadline()) => {
                Err(ApiError::Cancelled { reason: CancelReason::Deadline })
            }
            result = exchange => result,
        }
    }
}

impl std::fmt::Debug for TransportStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportStage")
            .field("base_address", &self.builder.base_address().map(|u| u.as_str()))
            .field("default_headers", &self.default_headers.len())
            .finish()
    }
}
