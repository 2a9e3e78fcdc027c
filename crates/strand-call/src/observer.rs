//! Business-logic observer seam.

use crate::context::ResponseContext;
use std::future::Future;
use std::pin::Pin;
use strand_core::Status;

/// A single inbound event on a call's stream.
#[derive(Debug, PartialEq)]
pub enum StreamEvent<M> {
    /// One decoded request message.
    Message(M),
    /// No further input will arrive on this call.
    End,
}

/// Business-logic callback consuming a call's inbound stream events.
///
/// Invoked at most once per event, only between observer creation and call
/// completion, and never concurrently with itself for the same call. The
/// observer eventually resolves the call's completion slot exactly once.
pub trait CallObserver<M>: Send {
    fn on_event(&mut self, event: StreamEvent<M>);
}

/// Pending observer handle produced by a factory; resolves to the observer
/// or fails the call with a status.
pub type ObserverFuture<M> =
    Pin<Box<dyn Future<Output = Result<Box<dyn CallObserver<M>>, Status>> + Send>>;

/// Deferred observer constructor, invoked exactly once when the handler is
/// attached to the transport write path.
pub type ObserverFactory<M, R> = Box<dyn FnOnce(ResponseContext<R>) -> ObserverFuture<M> + Send>;

/// Wrap an already-constructed observer as a resolved [`ObserverFuture`],
/// for factories with no asynchronous setup.
pub fn ready_observer<M: 'static>(observer: impl CallObserver<M> + 'static) -> ObserverFuture<M> {
    Box::pin(std::future::ready(Ok(Box::new(observer) as Box<dyn CallObserver<M>>)))
}
