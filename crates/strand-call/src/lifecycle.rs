//! Observer lifecycle state machine.
//!
//! The tri-state progression is a closed sum type matched exhaustively in
//! the handler; there is no path that dispatches an event to a missing
//! observer.

use crate::observer::{CallObserver, ObserverFactory, ObserverFuture, StreamEvent};
use std::collections::VecDeque;

pub(crate) enum ObserverLifecycle<M, R> {
    /// Factory not yet invoked; the handler is not attached to the
    /// transport write path.
    PendingCreation(ObserverFactory<M, R>),
    /// Factory invoked exactly once; the handle may still be resolving.
    Created(PendingObserver<M>),
    /// Completion resolved. Terminal: no further event reaches any
    /// observer, and the factory is never re-read.
    NotRequired,
}

/// The asynchronous observer handle inside `Created`.
pub(crate) enum PendingObserver<M> {
    /// Construction in flight; events queue in arrival order behind it.
    Resolving {
        future: ObserverFuture<M>,
        queued: VecDeque<StreamEvent<M>>,
    },
    /// Construction finished; events dispatch directly.
    Ready(Box<dyn CallObserver<M>>),
}
