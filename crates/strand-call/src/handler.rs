//! Per-call handler: ordered inbound dispatch and one-shot completion.
//!
//! One handler owns one logical call. The surrounding connection loop feeds
//! it decoded messages and end-of-input, and polls [`CallHandler::poll_complete`]
//! to drive observer construction and the completion write. All state
//! transitions happen on that one execution context; the only shared piece
//! is the completion slot, which business logic may resolve from elsewhere.

use crate::completion::{CallOutcome, CompletionReceiver, CompletionSlot};
use crate::context::{CallContext, CallSink, ResponseContext};
use crate::lifecycle::{ObserverLifecycle, PendingObserver};
use crate::observer::{ObserverFuture, StreamEvent};
use bytes::Bytes;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use strand_core::{Compressor, FrameEncoder, MessageCodec, Status};
use tracing::{debug, warn};

/// Handler for one streaming call.
///
/// Generic over the inbound message type `M`, the response codec `C`, and
/// the transport sink `S`.
pub struct CallHandler<M, C, S>
where
    C: MessageCodec,
{
    lifecycle: ObserverLifecycle<M, C::Message>,
    completion: CompletionSlot<C::Message>,
    receiver: Option<CompletionReceiver<C::Message>>,
    context: Option<CallContext<C, S>>,
    encoder: FrameEncoder,
    compress_responses: bool,
    call_id: u64,
    finished: Option<Status>,
}

impl<M, C, S> CallHandler<M, C, S>
where
    C: MessageCodec,
    S: CallSink,
{
    /// Create a handler in the `PendingCreation` state.
    ///
    /// The factory is not invoked here; it runs once, when [`activate`]
    /// signals that the handler sits downstream of the framing encoder and
    /// eager writes are safe.
    ///
    /// [`activate`]: CallHandler::activate
    pub fn new<F>(factory: F, context: CallContext<C, S>) -> Self
    where
        F: FnOnce(ResponseContext<C::Message>) -> ObserverFuture<M> + Send + 'static,
    {
        let (completion, receiver) = CompletionSlot::new();
        let call_id = context.call_id;
        Self {
            lifecycle: ObserverLifecycle::PendingCreation(Box::new(factory)),
            completion,
            receiver: Some(receiver),
            context: Some(context),
            encoder: FrameEncoder::new(),
            compress_responses: false,
            call_id,
            finished: None,
        }
    }

    /// Compress outbound response payloads with the given compressor.
    pub fn with_response_compression(mut self, compressor: Arc<dyn Compressor>) -> Self {
        self.encoder = FrameEncoder::with_compressor(compressor);
        self.compress_responses = true;
        self
    }

    /// Handle to this call's completion slot.
    pub fn completion(&self) -> CompletionSlot<C::Message> {
        self.completion.clone()
    }

    /// One-time transport-attachment hook: invoke the observer factory.
    ///
    /// Fired by the connection once the handler is wired into the active
    /// write path. A repeated call is a no-op.
    pub fn activate(&mut self) {
        self.enter_not_required_if_resolved();
        match std::mem::replace(&mut self.lifecycle, ObserverLifecycle::NotRequired) {
            ObserverLifecycle::PendingCreation(factory) => {
                let response_context = ResponseContext {
                    completion: self.completion.clone(),
                    call_id: self.call_id,
                };
                let future = factory(response_context);
                self.lifecycle = ObserverLifecycle::Created(PendingObserver::Resolving {
                    future,
                    queued: VecDeque::new(),
                });
            }
            ObserverLifecycle::Created(pending) => {
                debug!(call_id = self.call_id, "activate called twice, ignoring");
                self.lifecycle = ObserverLifecycle::Created(pending);
            }
            ObserverLifecycle::NotRequired => {}
        }
    }

    /// Deliver one decoded inbound message.
    pub fn on_message(&mut self, message: M) {
        self.dispatch(StreamEvent::Message(message));
    }

    /// Signal that no further input will arrive. At most once per call;
    /// enforcing that is the transport's contract, not checked here.
    pub fn on_end_of_input(&mut self) {
        self.dispatch(StreamEvent::End);
    }

    /// Resolve the call with a failure status, bypassing the observer.
    ///
    /// Safe from any lifecycle state; a second call is a no-op because the
    /// slot is single-assignment.
    pub fn send_error_status(&mut self, status: Status) {
        self.completion.fail(status);
    }

    /// Drive observer construction and completion.
    ///
    /// Ready once the completion slot has resolved and the outbound write
    /// (response frame on success, status trailer either way) has been
    /// issued. Later polls return the same terminal status.
    pub fn poll_complete(&mut self, cx: &mut Context<'_>) -> Poll<Status> {
        if let Some(status) = self.finished.clone() {
            return Poll::Ready(status);
        }

        // The slot may already hold an outcome (explicit error status, or
        // business logic that finished before any observer work).
        if let Some(status) = self.try_finish(cx) {
            return Poll::Ready(status);
        }

        self.drive_observer(cx);

        // Observer-construction failure, or an observer that resolved the
        // slot while draining queued events, completes within this poll.
        if let Some(status) = self.try_finish(cx) {
            return Poll::Ready(status);
        }

        Poll::Pending
    }

    /// Wait for the call to finish; see [`poll_complete`].
    ///
    /// [`poll_complete`]: CallHandler::poll_complete
    pub async fn completed(&mut self) -> Status {
        std::future::poll_fn(|cx| self.poll_complete(cx)).await
    }

    fn dispatch(&mut self, event: StreamEvent<M>) {
        self.enter_not_required_if_resolved();
        match &mut self.lifecycle {
            ObserverLifecycle::PendingCreation(_) => {
                warn!(
                    call_id = self.call_id,
                    "inbound event before observer attachment, dropping"
                );
            }
            ObserverLifecycle::Created(PendingObserver::Resolving { queued, .. }) => {
                queued.push_back(event);
            }
            ObserverLifecycle::Created(PendingObserver::Ready(observer)) => {
                observer.on_event(event);
            }
            ObserverLifecycle::NotRequired => {
                debug!(
                    call_id = self.call_id,
                    "inbound event after call completion, dropping"
                );
            }
        }
    }

    fn drive_observer(&mut self, cx: &mut Context<'_>) {
        if let ObserverLifecycle::Created(PendingObserver::Resolving { future, queued }) =
            &mut self.lifecycle
        {
            match future.as_mut().poll(cx) {
                Poll::Ready(Ok(mut observer)) => {
                    if self.completion.is_resolved() {
                        // The call terminated while the observer was being
                        // built; it never sees an event.
                        self.lifecycle = ObserverLifecycle::NotRequired;
                        return;
                    }
                    // Queued events drain in arrival order before the
                    // observer becomes directly reachable.
                    for event in queued.drain(..) {
                        observer.on_event(event);
                    }
                    self.lifecycle = ObserverLifecycle::Created(PendingObserver::Ready(observer));
                }
                Poll::Ready(Err(status)) => {
                    debug!(call_id = self.call_id, %status, "observer construction failed");
                    self.lifecycle = ObserverLifecycle::NotRequired;
                    self.completion.fail(status);
                }
                Poll::Pending => {}
            }
        }
    }

    fn try_finish(&mut self, cx: &mut Context<'_>) -> Option<Status> {
        let receiver = self.receiver.as_mut()?;
        match Pin::new(receiver).poll(cx) {
            Poll::Ready(result) => {
                // Err means every slot handle was dropped without a write;
                // the call still observes exactly one terminal status.
                let outcome = result.unwrap_or_else(|_| {
                    CallOutcome::Failure(Status::internal("call dropped without completion"))
                });
                Some(self.finish(outcome))
            }
            Poll::Pending => None,
        }
    }

    /// Perform the completion write and release the call's resources.
    fn finish(&mut self, outcome: CallOutcome<C::Message>) -> Status {
        self.lifecycle = ObserverLifecycle::NotRequired;
        self.receiver = None;

        let status = match self.context.take() {
            Some(mut context) => match outcome {
                CallOutcome::Success { response, status } => {
                    match self.encode_response(&context, &response) {
                        Ok(frame) => {
                            context.sink.write(frame);
                            context.sink.close(status.clone());
                            status
                        }
                        Err(encode_status) => {
                            if let Some(delegate) = context.error_delegate.as_deref() {
                                delegate.on_error(&encode_status);
                            }
                            context.sink.close(encode_status.clone());
                            encode_status
                        }
                    }
                }
                CallOutcome::Failure(status) => {
                    if let Some(delegate) = context.error_delegate.as_deref() {
                        delegate.on_error(&status);
                    }
                    context.sink.close(status.clone());
                    status
                }
            },
            // Context already released; the `finished` latch makes this
            // unreachable in practice.
            None => match outcome {
                CallOutcome::Success { status, .. } | CallOutcome::Failure(status) => status,
            },
        };

        debug!(call_id = self.call_id, %status, "call completed");
        self.finished = Some(status.clone());
        status
    }

    fn encode_response(
        &self,
        context: &CallContext<C, S>,
        response: &C::Message,
    ) -> Result<Bytes, Status> {
        let payload = context.response_codec.encode(response)?;
        self.encoder
            .encode(&payload, self.compress_responses)
            .map_err(Status::from)
    }

    fn enter_not_required_if_resolved(&mut self) {
        if self.completion.is_resolved()
            && !matches!(self.lifecycle, ObserverLifecycle::NotRequired)
        {
            self.lifecycle = ObserverLifecycle::NotRequired;
        }
    }
}
