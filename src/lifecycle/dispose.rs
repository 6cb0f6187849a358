//! Resource ownership and disposal for one chain.

use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;

use crate::error::ApiError;
use crate::lifecycle::executor::Executor;
use crate::net::connection::ConnectionLimiter;
use crate::net::transport::Transport;
use crate::observability::metrics;

/// Owns a chain's transport, admission limiter, prune timer and executor.
///
/// `dispose()` is idempotent: the first caller flips the watch value and
/// releases resources; later callers observe `true` and do nothing.
pub struct Lifecycle {
    disposed: watch::Sender<bool>,
    transport: Arc<dyn Transport>,
    limiter: Arc<ConnectionLimiter>,
    executor: Executor,
}

impl Lifecycle {
    /// Take ownership of the chain's resources.
    ///
    /// When called inside a tokio runtime, starts a timer that forgets idle
    /// destinations every `prune_every`.
    pub fn new(transport: Arc<dyn Transport>, limiter: Arc<ConnectionLimiter>, prune_every: Duration) -> Self {
        let (disposed, _) = watch::channel(false);

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(prune_idle(
                Arc::downgrade(&limiter),
                disposed.subscribe(),
                prune_every.max(Duration::from_secs(1)),
            ));
        }

        Self {
            disposed,
            transport,
            limiter,
            executor: Executor::new(),
        }
    }

    pub fn is_disposed(&self) -> bool {
        *self.disposed.borrow()
    }

    /// Fail with `Disposed` once disposal has started.
    pub fn ensure_active(&self) -> Result<(), ApiError> {
        if self.is_disposed() {
            Err(ApiError::Disposed)
        } else {
            Ok(())
        }
    }

    /// Transport handle for a call dispatched now.
    ///
    /// Fails with `Disposed` once disposal has started. The handle keeps
    /// working through a later `dispose()`, so calls dispatched before it
    /// run to completion.
    pub fn lease(&self) -> Result<Arc<dyn Transport>, ApiError> {
        // Lease before checking: `dispose` flips the flag before closing.
        let leased = self.transport.lease();
        self.ensure_active()?;
        Ok(leased.unwrap_or_else(|| Arc::clone(&self.transport)))
    }

    pub fn limiter(&self) -> &Arc<ConnectionLimiter> {
        &self.limiter
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Subscribe to the disposal signal.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.disposed.subscribe()
    }

    /// Release owned resources. Returns true only for the call that did it.
    ///
    /// In-flight calls are not aborted: they leased their transport handle
    /// at dispatch, and queued admission waiters hold their own semaphore.
    pub fn dispose(&self) -> bool {
        if self.disposed.send_replace(true) {
            return false;
        }

        self.transport.close();
        let pruned = self.limiter.prune();
        metrics::record_disposed();
        tracing::info!(pruned_destinations = pruned, "Client disposed");
        true
    }
}

impl std::fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lifecycle")
            .field("disposed", &self.is_disposed())
            .field("limiter", &self.limiter)
            .finish()
    }
}

async fn prune_idle(limiter: Weak<ConnectionLimiter>, mut disposed: watch::Receiver<bool>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(limiter) = limiter.upgrade() else { break };
                let pruned = limiter.prune();
                if pruned > 0 {
                    tracing::debug!(pruned, "Pruned idle destinations");
                }
            }
            changed = disposed.changed() => {
                if changed.is_err() || *disposed.borrow() {
                    break;
                }
            }
        }
    }

    tracing::trace!("Prune timer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdmissionPolicy;
    use crate::error::TransportError;
    use crate::http::builder::WireRequest;
    use crate::http::response::ApiResponse;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingTransport {
        closes: AtomicUsize,
    }

    #[async_trait]
    impl Transport for CountingTransport {
        async fn send(&self, _request: WireRequest) -> Result<ApiResponse, TransportError> {
            Ok(ApiResponse::new(reqwest::StatusCode::OK, ""))
        }

        fn close(&self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn lifecycle(transport: Arc<CountingTransport>) -> Lifecycle {
        let limiter = Arc::new(ConnectionLimiter::new(4, AdmissionPolicy::Queue));
        Lifecycle::new(transport, limiter, Duration::from_secs(60))
    }

    #[test]
    fn concurrent_dispose_releases_once() {
        let transport = Arc::new(CountingTransport::default());
        let lifecycle = Arc::new(lifecycle(Arc::clone(&transport)));

        let winners: usize = (0..8)
            .map(|_| {
                let lifecycle = Arc::clone(&lifecycle);
                std::thread::spawn(move || lifecycle.dispose())
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|h| h.join().unwrap() as usize)
            .sum();

        assert_eq!(winners, 1);
        assert_eq!(transport.closes.load(Ordering::SeqCst), 1);
        assert!(lifecycle.is_disposed());
    }

    #[test]
    fn lease_refused_after_dispose() {
        let lifecycle = lifecycle(Arc::new(CountingTransport::default()));
        let leased = lifecycle.lease().unwrap();
        lifecycle.dispose();
        assert!(matches!(lifecycle.lease(), Err(ApiError::Disposed)));
        assert_eq!(Arc::strong_count(&leased), 2);
    }

    #[tokio::test]
    async fn prune_timer_stops_on_dispose() {
        let lifecycle = lifecycle(Arc::new(CountingTransport::default()));
        let mut signal = lifecycle.subscribe();
        lifecycle.dispose();
        signal.changed().await.unwrap();
        assert!(*signal.borrow());
    }
}
