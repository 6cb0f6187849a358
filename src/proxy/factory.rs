//! Client construction.

use std::sync::Arc;

use crate::config::ClientConfig;
use crate::contract::registry::describe;
use crate::contract::ApiContract;
use crate::error::ApiError;
use crate::net::transport::Transport;
use crate::pipeline::{Interceptor, InterceptorChain};
use crate::proxy::Proxy;

/// Observer for failures of detached calls: `(method, error)`.
pub type FaultHandler = Arc<dyn Fn(&str, &ApiError) + Send + Sync>;

/// Everything needed to build a chain.
///
/// Consumed when the client is built; changing a copy afterwards does not
/// affect clients already created from it.
#[derive(Clone, Default)]
pub struct ClientOptions {
    pub config: ClientConfig,
    /// Outermost first.
    pub interceptors: Vec<Arc<dyn Interceptor>>,
    /// Replaces the default reqwest transport.
    pub transport: Option<Arc<dyn Transport>>,
    pub on_fault: Option<FaultHandler>,
}

impl ClientOptions {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Append an interceptor. Runs after every interceptor added before it.
    pub fn with_interceptor(self, interceptor: impl Interceptor) -> Self {
        self.with_shared_interceptor(Arc::new(interceptor))
    }

    pub fn with_shared_interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn with_transport(mut self, transport: impl Transport) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn on_fault(mut self, handler: impl Fn(&str, &ApiError) + Send + Sync + 'static) -> Self {
        self.on_fault = Some(Arc::new(handler));
        self
    }
}

impl From<ClientConfig> for ClientOptions {
    fn from(config: ClientConfig) -> Self {
        Self::new(config)
    }
}

impl std::fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientOptions")
            .field("config", &self.config)
            .field(
                "interceptors",
                &self.interceptors.iter().map(|i| i.name().to_string()).collect::<Vec<_>>(),
            )
            .field("transport", &self.transport.is_some())
            .field("on_fault", &self.on_fault.is_some())
            .finish()
    }
}

/// Entry points for building contract clients.
pub struct HttpApi;

impl HttpApi {
    /// Client with the default configuration: no base address, 128
    /// concurrent requests per destination, no interceptors.
    pub fn create<C: ApiContract>() -> Result<C, ApiError> {
        Self::create_with_config(ClientConfig::default())
    }

    pub fn create_with_base<C: ApiContract>(base_address: &str) -> Result<C, ApiError> {
        if base_address.trim().is_empty() {
            return Err(ApiError::missing("base_address"));
        }
        Self::create_with_config(ClientConfig::with_base_address(base_address))
    }

    pub fn create_with_config<C: ApiContract>(config: ClientConfig) -> Result<C, ApiError> {
        Self::create_with_options(ClientOptions::new(config))
    }

    /// Build a fresh chain from `options` and bind `C` to it.
    pub fn create_with_options<C: ApiContract>(options: ClientOptions) -> Result<C, ApiError> {
        let descriptor = describe::<C>()?;
        let chain = Arc::new(InterceptorChain::new(options)?);

        tracing::info!(
            contract = descriptor.name(),
            methods = descriptor.len(),
            stages = chain.stage_names().len(),
            "Client created"
        );

        Ok(C::bind(Proxy::new(descriptor, chain)))
    }

    /// Bind `C` to an existing chain, sharing its interceptors and
    /// resources with every other client bound to it.
    pub fn create_with_chain<C: ApiContract>(chain: Arc<InterceptorChain>) -> Result<C, ApiError> {
        let descriptor = describe::<C>()?;
        chain.lifecycle().ensure_active()?;
        Ok(C::bind(Proxy::new(descriptor, chain)))
    }
}
