//! Per-call context and the collaborator seams it bundles.

use crate::completion::CompletionSlot;
use bytes::Bytes;
use strand_core::Status;

/// Append-only, ordering-preserving write path for one call.
///
/// Bytes handed to `write` are already framed; trailer encoding for `close`
/// belongs to the surrounding header protocol, not this core.
pub trait CallSink: Send {
    fn write(&mut self, bytes: Bytes);

    /// Write the terminal status trailer and close the call.
    fn close(&mut self, status: Status);
}

/// Observes terminal failure statuses for diagnostics.
pub trait ErrorDelegate: Send {
    fn on_error(&self, status: &Status);
}

/// Per-call bundle owned by exactly one handler.
///
/// The handler holds the context by value and moves it into the completion
/// path, where it is dropped; transport references cannot outlive the call.
pub struct CallContext<C, S> {
    /// Output message type descriptor.
    pub response_codec: C,
    /// Transport write path.
    pub sink: S,
    /// Optional failure observer.
    pub error_delegate: Option<Box<dyn ErrorDelegate>>,
    /// Identity used in diagnostics.
    pub call_id: u64,
}

impl<C, S> CallContext<C, S> {
    pub fn new(response_codec: C, sink: S, call_id: u64) -> Self {
        Self {
            response_codec,
            sink,
            error_delegate: None,
            call_id,
        }
    }

    pub fn with_error_delegate(mut self, delegate: Box<dyn ErrorDelegate>) -> Self {
        self.error_delegate = Some(delegate);
        self
    }
}

/// View of a call handed to the observer factory.
pub struct ResponseContext<R> {
    /// Slot the business logic resolves exactly once.
    pub completion: CompletionSlot<R>,
    pub call_id: u64,
}
