//! Inbound byte-stream to message-stream adapter.
//!
//! Bridges a transport's chunked byte stream into the decoded messages a
//! call handler consumes.

use crate::context::CallSink;
use crate::handler::CallHandler;
use bytes::Bytes;
use std::pin::Pin;
use std::task::{Context, Poll};
use strand_core::{FrameDecoder, MessageCodec, Status};
use tokio_stream::Stream;

/// Stream adapter that deframes and decodes inbound messages.
///
/// Wraps a byte-chunk stream; chunk boundaries carry no meaning, partial
/// frames stay buffered in the decoder until completed by later chunks.
pub struct InboundMessageStream<B, D> {
    body: B,
    decoder: FrameDecoder,
    codec: D,
    finished: bool,
}

impl<B, D> InboundMessageStream<B, D> {
    pub fn new(body: B, decoder: FrameDecoder, codec: D) -> Self {
        Self {
            body,
            decoder,
            codec,
            finished: false,
        }
    }
}

impl<B, D> Stream for InboundMessageStream<B, D>
where
    B: Stream<Item = Result<Bytes, Status>> + Unpin,
    D: MessageCodec + Unpin,
{
    type Item = Result<D::Message, Status>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if self.finished {
                return Poll::Ready(None);
            }

            // Drain buffered frames before asking the transport for more.
            match self.decoder.next_frame() {
                Ok(Some(frame)) => {
                    return Poll::Ready(Some(self.codec.decode(frame.payload)));
                }
                Ok(None) => {}
                Err(e) => {
                    self.finished = true;
                    return Poll::Ready(Some(Err(Status::from(e))));
                }
            }

            match Pin::new(&mut self.body).poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    self.decoder.feed(&chunk);
                }
                Poll::Ready(Some(Err(status))) => {
                    self.finished = true;
                    return Poll::Ready(Some(Err(status)));
                }
                Poll::Ready(None) => {
                    self.finished = true;
                    let leftover = self.decoder.buffered();
                    if leftover > 0 {
                        return Poll::Ready(Some(Err(Status::data_loss(format!(
                            "stream ended with {leftover} bytes of an incomplete frame"
                        )))));
                    }
                    return Poll::Ready(None);
                }
                Poll::Pending => {
                    return Poll::Pending;
                }
            }
        }
    }
}

/// Drive one call from a byte stream to its terminal status.
///
/// Attaches the handler, feeds it every decoded message, signals
/// end-of-input when the stream ends, and aborts the call on a framing or
/// decode error. Embedders with their own connection loop wire these steps
/// up themselves; this is the reference glue.
pub async fn pump_call<B, D, C, S>(
    mut handler: CallHandler<D::Message, C, S>,
    mut inbound: InboundMessageStream<B, D>,
) -> Status
where
    B: Stream<Item = Result<Bytes, Status>> + Unpin,
    D: MessageCodec + Unpin,
    C: MessageCodec,
    S: CallSink,
{
    handler.activate();
    let mut input_done = false;

    std::future::poll_fn(move |cx| {
        if let Poll::Ready(status) = handler.poll_complete(cx) {
            return Poll::Ready(status);
        }

        while !input_done {
            match Pin::new(&mut inbound).poll_next(cx) {
                Poll::Ready(Some(Ok(message))) => handler.on_message(message),
                Poll::Ready(Some(Err(status))) => {
                    handler.send_error_status(status);
                    input_done = true;
                }
                Poll::Ready(None) => {
                    handler.on_end_of_input();
                    input_done = true;
                }
                Poll::Pending => break,
            }
        }

        // Delivered events may have resolved the call within this poll.
        handler.poll_complete(cx)
    })
    .await
}
