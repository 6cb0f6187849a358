//! Transport abstraction and the default reqwest-backed transport.
//!
//! # Responsibilities
//! - Send one resolved `WireRequest` and buffer the response
//! - Own the HTTP connection pool
//! - Release the pool on `close()` without touching in-flight exchanges
//!
//! # Design Decisions
//! - Each dispatched call leases its own handle on the client, so swapping
//!   the slot to `None` only affects calls dispatched afterwards; the pool
//!   goes away when the last lease drops
//! - Transport-level failures are classified into `TransportErrorKind`

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use std::sync::Arc;

use crate::config::ClientConfig;
use crate::error::{TransportError, TransportErrorKind};
use crate::http::builder::WireRequest;
use crate::http::response::ApiResponse;

/// The terminal I/O operation of every chain.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Perform one HTTP exchange.
    async fn send(&self, request: WireRequest) -> Result<ApiResponse, TransportError>;

    /// Release pooled resources. Called at most once, on disposal.
    fn close(&self) {}

    /// A handle for one call, taken when the call is dispatched.
    ///
    /// The handle must keep working after `close()`. `None` means the
    /// transport itself serves every call.
    fn lease(&self) -> Option<Arc<dyn Transport>> {
        None
    }
}

/// Default transport backed by a pooled `reqwest::Client`.
pub struct ReqwestTransport {
    client: ArcSwapOption<reqwest::Client>,
}

impl ReqwestTransport {
    /// Build a transport from a client configuration.
    pub fn from_config(config: &ClientConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.timeouts.connect())
            .pool_idle_timeout(config.timeouts.idle())
            .pool_max_idle_per_host(config.connection_limit)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self::new(client))
    }

    /// Wrap an existing client.
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client: ArcSwapOption::from_pointee(client),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.client.load().is_none()
    }
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: WireRequest) -> Result<ApiResponse, TransportError> {
        let client: Arc<reqwest::Client> = self
            .client
            .load_full()
            .ok_or_else(|| TransportError::new(TransportErrorKind::Closed, "transport closed"))?;

        let mut builder = client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(ApiResponse { status, headers, body })
    }

    fn close(&self) {
        if self.client.swap(None).is_some() {
            tracing::debug!("Connection pool released");
        }
    }

    fn lease(&self) -> Option<Arc<dyn Transport>> {
        let client = self.client.load_full()?;
        Some(Arc::new(Self {
            client: ArcSwapOption::new(Some(client)),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_is_sticky() {
        let transport = ReqwestTransport::from_config(&ClientConfig::default()).unwrap();
        assert!(!transport.is_closed());
        transport.close();
        transport.close();
        assert!(transport.is_closed());
    }

    #[tokio::test]
    async fn send_after_close_fails() {
        let transport = ReqwestTransport::from_config(&ClientConfig::default()).unwrap();
        transport.close();

        let request = WireRequest {
            method: reqwest::Method::GET,
            url: url::Url::parse("http://127.0.0.1:9/").unwrap(),
            headers: Default::default(),
            body: None,
        };
        let err = transport.send(request).await.unwrap_err();
        assert_eq!(err.kind, TransportErrorKind::Closed);
    }

    #[tokio::test]
    async fn lease_outlives_close() {
        let transport = ReqwestTransport::from_config(&ClientConfig::default()).unwrap();
        let leased = transport.lease().unwrap();
        transport.close();
        assert!(transport.lease().is_none());

        let request = WireRequest {
            method: reqwest::Method::GET,
            url: url::Url::parse("http://127.0.0.1:9/").unwrap(),
            headers: Default::default(),
            body: None,
        };
        let err = leased.send(request).await.unwrap_err();
        assert_ne!(err.kind, TransportErrorKind::Closed);
    }
}
