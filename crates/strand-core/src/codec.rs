//! Message codec seam between frame payloads and typed messages.
//!
//! The generated-code layer that maps typed messages to bytes lives outside
//! this crate; callers hand the framing layer a codec per direction.

use crate::status::Status;
use bytes::Bytes;

/// Converts between one message type and its wire payload.
pub trait MessageCodec: Send + Sync {
    type Message;

    fn encode(&self, message: &Self::Message) -> Result<Bytes, Status>;

    fn decode(&self, payload: Bytes) -> Result<Self::Message, Status>;
}

/// Identity codec for callers that frame pre-serialized payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesCodec;

impl MessageCodec for BytesCodec {
    type Message = Bytes;

    fn encode(&self, message: &Bytes) -> Result<Bytes, Status> {
        Ok(message.clone())
    }

    fn decode(&self, payload: Bytes) -> Result<Bytes, Status> {
        Ok(payload)
    }
}
