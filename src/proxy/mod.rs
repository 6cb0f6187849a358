//! Dispatcher and client factory.
//!
//! # Data Flow
//! ```text
//! HttpApi::create_with_options::<C>(options)
//!     → registry::describe::<C>() (cached descriptor)
//!     → InterceptorChain::new(options)
//!     → C::bind(Proxy)
//!
//! c.method(args)
//!     → Proxy::invoke_{blocking,async,detached}(name, args)
//!     → ApiRequest → InterceptorChain::execute_mapped → FromResponse
//! ```
//!
//! # Design Decisions
//! - One generic dispatcher per client, keyed by method name
//! - Shape mismatches and unknown names are contract errors; the generated
//!   façade never produces them
//! - Per-call failures always travel the shape's own result channel

pub mod factory;
pub mod pending;

pub use factory::{ClientOptions, FaultHandler, HttpApi};
pub use pending::{PendingCall, PendingState};

use std::sync::Arc;

use crate::config::ClientConfig;
use crate::contract::{InterfaceDescriptor, ReturnShape};
use crate::error::ApiError;
use crate::http::request::{ApiRequest, Arguments};
use crate::http::response::FromResponse;
use crate::pipeline::InterceptorChain;

/// Generic dispatcher behind a contract's typed client.
#[derive(Clone)]
pub struct Proxy {
    descriptor: Arc<InterfaceDescriptor>,
    chain: Arc<InterceptorChain>,
}

impl Proxy {
    pub(crate) fn new(descriptor: Arc<InterfaceDescriptor>, chain: Arc<InterceptorChain>) -> Self {
        Self { descriptor, chain }
    }

    pub fn descriptor(&self) -> &Arc<InterfaceDescriptor> {
        &self.descriptor
    }

    pub fn chain(&self) -> &Arc<InterceptorChain> {
        &self.chain
    }

    pub fn config(&self) -> &ClientConfig {
        self.chain.config()
    }

    /// Dispose the underlying chain. Idempotent.
    pub fn dispose(&self) -> bool {
        self.chain.dispose()
    }

    pub fn is_disposed(&self) -> bool {
        self.chain.is_disposed()
    }

    /// Call `method` and block until it settles.
    pub fn invoke_blocking<T: FromResponse>(&self, method: &str, args: Arguments) -> Result<T, ApiError> {
        let request = self.prepare(method, ReturnShape::Blocking, args)?;
        let chain = Arc::clone(&self.chain);
        self.chain
            .lifecycle()
            .executor()
            .block_on(async move { chain.execute_mapped(request, T::from_response).await })?
    }

    /// Start `method` and return a handle to its outcome.
    pub fn invoke_async<T: FromResponse>(&self, method: &str, args: Arguments) -> PendingCall<T> {
        let request = match self.prepare(method, ReturnShape::Pending, args) {
            Ok(request) => request,
            Err(e) => return PendingCall::failed(e),
        };

        let cell = Arc::clone(request.cell());
        let token = request.cancellation().clone();
        let chain = Arc::clone(&self.chain);

        match self
            .chain
            .lifecycle()
            .executor()
            .spawn(async move { chain.execute_mapped(request, T::from_response).await })
        {
            Ok(handle) => PendingCall::running(handle, cell, token),
            Err(e) => PendingCall::failed(e),
        }
    }

    /// Start `method` without waiting for it. Failures go to the fault
    /// handler.
    pub fn invoke_detached(&self, method: &str, args: Arguments) {
        let request = match self.prepare(method, ReturnShape::Detached, args) {
            Ok(request) => request,
            Err(e) => return self.chain.report_fault(method, &e),
        };

        let name = request.method().name;
        let chain = Arc::clone(&self.chain);
        let spawned = self.chain.lifecycle().executor().spawn(async move {
            if let Err(e) = chain.execute_mapped(request, <()>::from_response).await {
                chain.report_fault(name, &e);
            }
        });

        if let Err(e) = spawned {
            self.chain.report_fault(method, &e);
        }
    }

    fn prepare(&self, method: &str, shape: ReturnShape, mut args: Arguments) -> Result<ApiRequest, ApiError> {
        let contract = self.descriptor.name();
        let declared = self
            .descriptor
            .method(method)
            .ok_or_else(|| ApiError::invalid_contract(contract, format!("no method named `{}`", method)))?;

        if declared.shape != shape {
            return Err(ApiError::invalid_contract(
                contract,
                format!("`{}` is declared {:?} but was invoked {:?}", method, declared.shape, shape),
            ));
        }

        if let Some(e) = args.take_encode_error() {
            return Err(ApiError::Encode(e));
        }

        let mut request = ApiRequest::new(contract, Arc::clone(declared), args)
            .with_contract_base(self.descriptor.base_address());
        request.set_timeout(self.config().timeouts.request());
        Ok(request)
    }
}

impl std::fmt::Debug for Proxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Proxy")
            .field("contract", &self.descriptor.name())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
