//! Call executor.
//!
//! Pending and detached calls run on the caller's tokio runtime when there
//! is one. Otherwise, and for every blocking call, they run on a small
//! runtime owned by the chain, created on first use and shut down in the
//! background when the chain is dropped.

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;

use crate::error::{ApiError, TransportError, TransportErrorKind};

const WORKER_THREADS: usize = 2;

/// Spawns call traversals.
#[derive(Debug, Default)]
pub struct Executor {
    runtime: Mutex<Option<Runtime>>,
}

impl Executor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `future` in the background.
    pub fn spawn<F>(&self, future: F) -> Result<JoinHandle<F::Output>, ApiError>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => self.dedicated()?,
        };
        Ok(handle.spawn(future))
    }

    /// Run `future` to completion, blocking the current thread.
    ///
    /// Safe to call from inside an async context: the future runs on the
    /// dedicated runtime and only this thread waits.
    pub fn block_on<F>(&self, future: F) -> Result<F::Output, ApiError>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let handle = self.dedicated()?;
        let (tx, rx) = std::sync::mpsc::sync_channel(1);
        handle.spawn(async move {
            let _ = tx.send(future.await);
        });
        rx.recv().map_err(|_| {
            ApiError::from(TransportError::new(
                TransportErrorKind::Io,
                "executor stopped before the call settled",
            ))
        })
    }

    /// True once the dedicated runtime has been started.
    pub fn is_started(&self) -> bool {
        self.runtime
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn dedicated(&self) -> Result<Handle, ApiError> {
        let mut slot = self.runtime.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(runtime) = slot.as_ref() {
            return Ok(runtime.handle().clone());
        }

        let runtime = Builder::new_multi_thread()
            .worker_threads(WORKER_THREADS)
            .thread_name("httpapi-executor")
            .enable_all()
            .build()
            .map_err(|e| {
                ApiError::from(TransportError::new(
                    TransportErrorKind::Io,
                    format!("failed to start executor: {}", e),
                ))
            })?;
        tracing::debug!(workers = WORKER_THREADS, "Dedicated executor started");

        let handle = runtime.handle().clone();
        *slot = Some(runtime);
        Ok(handle)
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        let slot = self.runtime.get_mut().unwrap_or_else(PoisonError::into_inner);
        let Some(runtime) = slot.take() else { return };

        // The last chain handle may be released by a task on this very
        // runtime; hand the shutdown to a plain thread in that case.
        if Handle::try_current().is_ok() {
            let _ = std::thread::Builder::new()
                .name("httpapi-executor-shutdown".into())
                .spawn(move || runtime.shutdown_background());
        } else {
            runtime.shutdown_background();
        }
    }
}
