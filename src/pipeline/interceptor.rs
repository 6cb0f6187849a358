//! Interceptor contract.
//!
//! An interceptor receives the call's request and the continuation for the
//! rest of the chain. It may pass through, mutate then pass, short-circuit
//! by returning without calling `next`, or wrap `next` (it is `Copy`, so it
//! can be run more than once).

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::ApiError;
use crate::http::request::ApiRequest;
use crate::http::response::ApiResponse;
use crate::net::transport::Transport;
use crate::pipeline::terminal::TransportStage;

/// One stage of the interceptor chain.
#[async_trait]
pub trait Interceptor: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &str;

    async fn intercept(&self, request: ApiRequest, next: Next<'_>) -> Result<ApiResponse, ApiError>;
}

/// The remainder of the chain after the current stage, bound to the
/// transport handle the call leased at dispatch.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    stages: &'a [Arc<dyn Interceptor>],
    terminal: &'a TransportStage,
    transport: &'a dyn Transport,
}

impl<'a> Next<'a> {
    pub(crate) fn new(
        stages: &'a [Arc<dyn Interceptor>],
        terminal: &'a TransportStage,
        transport: &'a dyn Transport,
    ) -> Self {
        Self {
            stages,
            terminal,
            transport,
        }
    }

    /// Number of interceptors still ahead of the transport.
    pub fn remaining(&self) -> usize {
        self.stages.len()
    }

    /// Hand `request` to the next stage.
    pub async fn run(self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        match self.stages.split_first() {
            Some((stage, rest)) => {
                tracing::trace!(stage = stage.name(), request_id = %request.id(), "Entering stage");
                stage
                    .intercept(request, Next::new(rest, self.terminal, self.transport))
                    .await
            }
            None => self.terminal.exchange(request, self.transport).await,
        }
    }
}

impl std::fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next").field("remaining", &self.stages.len()).finish()
    }
}
