//! Single-assignment completion for one call.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use strand_core::Status;
use tokio::sync::oneshot;
use tracing::debug;

/// Terminal outcome of one call.
#[derive(Debug)]
pub enum CallOutcome<R> {
    /// Final response message plus terminal status.
    Success { response: R, status: Status },
    /// Terminal failure; no response message is sent.
    Failure(Status),
}

impl<R> CallOutcome<R> {
    pub fn status(&self) -> &Status {
        match self {
            Self::Success { status, .. } => status,
            Self::Failure(status) => status,
        }
    }
}

/// Receiving half observed by the call handler.
pub type CompletionReceiver<R> = oneshot::Receiver<CallOutcome<R>>;

/// Write-once handle that terminates a call.
///
/// Exactly one write wins; every later write is a no-op. Clones share the
/// same slot, so business logic can carry a handle into spawned work while
/// the handler keeps one for the explicit error-status path.
pub struct CompletionSlot<R> {
    tx: Arc<Mutex<Option<oneshot::Sender<CallOutcome<R>>>>>,
}

impl<R> Clone for CompletionSlot<R> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<R> CompletionSlot<R> {
    pub fn new() -> (Self, CompletionReceiver<R>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                tx: Arc::new(Mutex::new(Some(tx))),
            },
            rx,
        )
    }

    /// Resolve with a final response and status. Returns whether this write won.
    pub fn resolve(&self, response: R, status: Status) -> bool {
        self.write(CallOutcome::Success { response, status })
    }

    /// Resolve with a failure status. Returns whether this write won.
    pub fn fail(&self, status: Status) -> bool {
        self.write(CallOutcome::Failure(status))
    }

    pub fn is_resolved(&self) -> bool {
        self.lock().is_none()
    }

    fn write(&self, outcome: CallOutcome<R>) -> bool {
        let Some(tx) = self.lock().take() else {
            debug!(status = %outcome.status(), "completion slot already resolved, dropping write");
            return false;
        };
        // A dropped receiver means the call was already torn down; the
        // write still counts as the slot's one resolution.
        let _ = tx.send(outcome);
        true
    }

    fn lock(&self) -> MutexGuard<'_, Option<oneshot::Sender<CallOutcome<R>>>> {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
