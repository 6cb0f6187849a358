//! The interceptor chain.
//!
//! # Responsibilities
//! - Freeze the configuration and the ordered stages at construction
//! - Own the lifecycle (transport, admission, executor)
//! - Drive one traversal per call and settle the call's state
//!
//! # Design Decisions
//! - Stages run in configured order on the way in, reverse on the way out
//! - Cancellation and the deadline are raced around the whole traversal,
//!   so no stage can hold a cancelled call open
//! - Calls after disposal fail before entering any stage; calls dispatched
//!   earlier keep the transport handle they leased

use std::sync::Arc;
use tracing::Instrument;

use crate::config::{validate_config, ClientConfig, ValidationError};
use crate::error::{ApiError, CancelReason};
use crate::http::request::{ApiRequest, CallState};
use crate::http::response::ApiResponse;
use crate::lifecycle::Lifecycle;
use crate::net::connection::ConnectionLimiter;
use crate::net::transport::{ReqwestTransport, Transport};
use crate::observability::tracing::call_span;
use crate::pipeline::interceptor::{Interceptor, Next};
use crate::pipeline::terminal::TransportStage;
use crate::proxy::factory::{ClientOptions, FaultHandler};
use crate::resilience::timeouts::sleep_until_deadline;

/// Ordered interceptors in front of the transport, plus the resources they
/// share. Shared by every proxy bound to it.
pub struct InterceptorChain {
    config: Arc<ClientConfig>,
    stages: Arc<[Arc<dyn Interceptor>]>,
    terminal: TransportStage,
    lifecycle: Arc<Lifecycle>,
    on_fault: Option<FaultHandler>,
}

impl InterceptorChain {
    /// Validate `options` and build the chain.
    pub fn new(options: ClientOptions) -> Result<Self, ApiError> {
        let ClientOptions {
            config,
            interceptors,
            transport,
            on_fault,
        } = options;

        validate_config(&config).map_err(ApiError::InvalidConfiguration)?;

        let transport: Arc<dyn Transport> = match transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::from_config(&config).map_err(|e| {
                ApiError::InvalidConfiguration(vec![ValidationError::new("transport", e.to_string())])
            })?),
        };

        let limiter = Arc::new(ConnectionLimiter::new(config.connection_limit, config.admission));
        let lifecycle = Arc::new(Lifecycle::new(transport, limiter, config.timeouts.idle()));
        let terminal = TransportStage::new(&config, Arc::clone(&lifecycle))?;

        let chain = Self {
            config: Arc::new(config),
            stages: interceptors.into(),
            terminal,
            lifecycle,
            on_fault,
        };

        tracing::debug!(
            stages = ?chain.stage_names(),
            connection_limit = chain.config.connection_limit,
            base_address = chain.config.base_address.as_deref().unwrap_or("-"),
            "Interceptor chain built"
        );

        Ok(chain)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Stage names, outermost first.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn lifecycle(&self) -> &Arc<Lifecycle> {
        &self.lifecycle
    }

    /// Dispose the chain's resources. Idempotent.
    pub fn dispose(&self) -> bool {
        self.lifecycle.dispose()
    }

    pub fn is_disposed(&self) -> bool {
        self.lifecycle.is_disposed()
    }

    /// Run `request` through every stage and return the raw response.
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        self.execute_mapped(request, Ok).await
    }

    /// Run `request` through every stage and map the response.
    ///
    /// The call's state is settled after mapping, so a decode failure
    /// leaves it `Failed`.
    pub async fn execute_mapped<T, F>(&self, request: ApiRequest, map: F) -> Result<T, ApiError>
    where
        F: FnOnce(ApiResponse) -> Result<T, ApiError> + Send,
    {
        let cell = Arc::clone(request.cell());

        let transport = match self.lifecycle.lease() {
            Ok(transport) => transport,
            Err(e) => {
                cell.settle(CallState::Failed);
                return Err(e);
            }
        };
        if !cell.dispatch() {
            return Err(ApiError::invalid_contract(
                request.contract(),
                format!("request {} was already dispatched", request.id()),
            ));
        }

        let span = call_span(&request);
        let token = request.cancellation().clone();
        let deadline = request.deadline();
        let traversal = Next::new(&self.stages, &self.terminal, transport.as_ref()).run(request);

        let outcome = async {
            let response = tokio::select! {
                biased;
                _ = token.cancelled() => Err(ApiError::Cancelled { reason: CancelReason::Token }),
                _ = sleep_until_deadline(deadline) => Err(ApiError::Cancelled { reason: CancelReason::Deadline }),
                result = traversal => result,
            }?;
            map(response)
        }
        .instrument(span)
        .await;

        cell.settle(match &outcome {
            Ok(_) => CallState::Completed,
            Err(e) if e.is_cancelled() => CallState::Cancelled,
            Err(_) => CallState::Failed,
        });

        outcome
    }

    /// Report a failure nobody is waiting for.
    pub(crate) fn report_fault(&self, method: &str, error: &ApiError) {
        tracing::warn!(method, error = %error, "Detached call failed");
        if let Some(handler) = &self.on_fault {
            handler(method, error);
        }
    }
}

impl std::fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("stages", &self.stage_names())
            .field("terminal", &self.terminal)
            .field("lifecycle", &self.lifecycle)
            .finish()
    }
}
