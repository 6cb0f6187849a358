//! Per-destination admission control.
//!
//! # Responsibilities
//! - Bound concurrent outbound requests per destination (`scheme://host:port`)
//! - Queue or reject calls beyond the bound, per `AdmissionPolicy`
//! - Generate unique connection IDs for tracing
//! - Drop bookkeeping for idle destinations
//!
//! # Design Decisions
//! - One semaphore per destination; a permit is held for the whole exchange
//! - Permits are released by a RAII guard, so every exit path frees the slot
//! - Waiters hold their own `Arc` of the semaphore, so pruning never strands them

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};

use crate::config::AdmissionPolicy;
use crate::error::{TransportError, TransportErrorKind};
use crate::observability::metrics;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for an admitted exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Bounds concurrent exchanges per destination.
#[derive(Debug)]
pub struct ConnectionLimiter {
    limit: usize,
    policy: AdmissionPolicy,
    destinations: DashMap<String, Arc<Semaphore>>,
}

impl ConnectionLimiter {
    pub fn new(limit: usize, policy: AdmissionPolicy) -> Self {
        Self {
            limit,
            policy,
            destinations: DashMap::new(),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn policy(&self) -> AdmissionPolicy {
        self.policy
    }

    /// Admit one exchange to `destination`. Returns a guard that frees the
    /// slot on drop.
    pub async fn acquire(&self, destination: &str) -> Result<ConnectionGuard, TransportError> {
        let semaphore = self.semaphore(destination);

        let permit = match self.policy {
            AdmissionPolicy::Queue => semaphore
                .acquire_owned()
                .await
                .map_err(|_| TransportError::new(TransportErrorKind::Closed, "admission closed"))?,
            AdmissionPolicy::Reject => match semaphore.try_acquire_owned() {
                Ok(permit) => permit,
                Err(TryAcquireError::NoPermits) => {
                    tracing::warn!(destination = %destination, limit = self.limit, "Connection limit reached");
                    metrics::record_admission_rejected(destination);
                    return Err(TransportError::new(
                        TransportErrorKind::ConnectionLimit,
                        format!("{} concurrent requests to {} already in flight", self.limit, destination),
                    ));
                }
                Err(TryAcquireError::Closed) => {
                    return Err(TransportError::new(TransportErrorKind::Closed, "admission closed"))
                }
            },
        };

        let guard = ConnectionGuard {
            _permit: permit,
            id: ConnectionId::new(),
        };
        tracing::trace!(connection_id = %guard.id, destination = %destination, "Connection admitted");
        Ok(guard)
    }

    /// Exchanges currently admitted to `destination`.
    pub fn in_flight(&self, destination: &str) -> usize {
        self.destinations
            .get(destination)
            .map(|s| self.limit - s.available_permits())
            .unwrap_or(0)
    }

    /// Number of destinations with bookkeeping.
    pub fn destinations(&self) -> usize {
        self.destinations.len()
    }

    /// Forget destinations nobody holds or waits on.
    pub fn prune(&self) -> usize {
        let before = self.destinations.len();
        self.destinations
            .retain(|_, s| Arc::strong_count(s) > 1 || s.available_permits() < self.limit);
        before - self.destinations.len()
    }

    fn semaphore(&self, destination: &str) -> Arc<Semaphore> {
        if let Some(existing) = self.destinations.get(destination) {
            return Arc::clone(existing.value());
        }
        let entry = self
            .destinations
            .entry(destination.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.limit)));
        Arc::clone(entry.value())
    }
}

/// Guard that holds an admission slot.
/// Frees it when dropped.
#[derive(Debug)]
pub struct ConnectionGuard {
    _permit: OwnedSemaphorePermit,
    id: ConnectionId,
}

impl ConnectionGuard {
    /// Get this exchange's ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        tracing::trace!(connection_id = %self.id, "Connection released");
    }
}
