//! Pending call handle.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{ApiError, TransportError, TransportErrorKind};
use crate::http::request::{CallCell, CallState};

/// Observable progress of a pending call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingState {
    Pending,
    Resolved,
    Failed,
    Cancelled,
}

impl From<CallState> for PendingState {
    fn from(state: CallState) -> Self {
        match state {
            CallState::Created | CallState::Dispatched => PendingState::Pending,
            CallState::Completed => PendingState::Resolved,
            CallState::Failed => PendingState::Failed,
            CallState::Cancelled => PendingState::Cancelled,
        }
    }
}

enum Outcome<T> {
    Running(JoinHandle<Result<T, ApiError>>),
    Ready(Result<T, ApiError>),
    Taken,
}

/// Handle to a call whose traversal is already running.
///
/// Awaiting it yields the decoded result. Dropping it does not stop the
/// call; use [`cancel`](Self::cancel) for that.
pub struct PendingCall<T> {
    outcome: Outcome<T>,
    cell: Arc<CallCell>,
    token: CancellationToken,
}

impl<T> PendingCall<T> {
    pub(crate) fn running(handle: JoinHandle<Result<T, ApiError>>, cell: Arc<CallCell>, token: CancellationToken) -> Self {
        Self {
            outcome: Outcome::Running(handle),
            cell,
            token,
        }
    }

    /// A call that failed before it could be dispatched.
    pub(crate) fn failed(error: ApiError) -> Self {
        let cell = Arc::new(CallCell::new());
        cell.settle(if error.is_cancelled() {
            CallState::Cancelled
        } else {
            CallState::Failed
        });
        Self {
            outcome: Outcome::Ready(Err(error)),
            cell,
            token: CancellationToken::new(),
        }
    }

    pub fn state(&self) -> PendingState {
        self.cell.state().into()
    }

    /// True once the call has settled, whatever the outcome.
    pub fn is_finished(&self) -> bool {
        self.cell.state().is_terminal()
    }

    /// Ask the call to stop. It resolves to `Cancelled` unless it already
    /// settled.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// The call's cancellation token.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.token
    }
}

impl<T> Unpin for PendingCall<T> {}

impl<T> Future for PendingCall<T> {
    type Output = Result<T, ApiError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let result = match std::mem::replace(&mut this.outcome, Outcome::Taken) {
            Outcome::Running(mut handle) => match Pin::new(&mut handle).poll(cx) {
                Poll::Pending => {
                    this.outcome = Outcome::Running(handle);
                    return Poll::Pending;
                }
                Poll::Ready(Ok(result)) => result,
                Poll::Ready(Err(e)) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                // Aborted by its runtime shutting down, not by the caller.
                Poll::Ready(Err(e)) => {
                    this.cell.settle(CallState::Failed);
                    Err(ApiError::Transport(TransportError::new(
                        TransportErrorKind::Io,
                        format!("call task did not finish: {}", e),
                    )))
                }
            },
            Outcome::Ready(result) => result,
            Outcome::Taken => panic!("PendingCall polled after completion"),
        };
        Poll::Ready(result)
    }
}

impl<T> std::fmt::Debug for PendingCall<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingCall").field("state", &self.state()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_with_task_output() {
        let cell = Arc::new(CallCell::new());
        let task_cell = Arc::clone(&cell);
        let handle = tokio::spawn(async move {
            task_cell.settle(CallState::Completed);
            Ok::<_, ApiError>(5)
        });
        let call = PendingCall::running(handle, cell, CancellationToken::new());
        assert_eq!(call.await.unwrap(), 5);
    }

    #[tokio::test]
    async fn early_failure_is_observable() {
        let call: PendingCall<()> = PendingCall::failed(ApiError::Encode("bad".into()));
        assert_eq!(call.state(), PendingState::Failed);
        assert!(call.is_finished());
        assert!(matches!(call.await, Err(ApiError::Encode(_))));
    }

    #[tokio::test]
    async fn aborted_task_is_a_failure_not_a_cancellation() {
        let handle = tokio::spawn(async {
            std::future::pending::<()>().await;
            Ok::<u8, ApiError>(0)
        });
        handle.abort();
        let mut call = PendingCall::running(handle, Arc::new(CallCell::new()), CancellationToken::new());

        match (&mut call).await {
            Err(ApiError::Transport(e)) => assert_eq!(e.kind, TransportErrorKind::Io),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(call.state(), PendingState::Failed);
        assert!(!call.cancellation().is_cancelled());
    }
}
