//! Per-call runtime for the Strand RPC core.
//!
//! This crate manages the lifecycle of a single streaming RPC invocation:
//! - Deferred, one-shot construction of the business-logic observer
//! - Ordered delivery of inbound events across asynchronous construction
//! - Single-assignment completion driving the outbound write and teardown

pub mod completion;
pub mod context;
pub mod handler;
pub mod inbound;
mod lifecycle;
pub mod observer;

pub use completion::{CallOutcome, CompletionReceiver, CompletionSlot};
pub use context::{CallContext, CallSink, ErrorDelegate, ResponseContext};
pub use handler::CallHandler;
pub use inbound::{pump_call, InboundMessageStream};
pub use observer::{ready_observer, CallObserver, ObserverFactory, ObserverFuture, StreamEvent};
