//! Core wire-level types for the Strand RPC core.
//!
//! This crate provides the foundation types used by the per-call runtime:
//! - Length-prefixed message framing (encode/decode with partial buffering)
//! - Terminal status model
//! - Message codec and compression seams

pub mod codec;
pub mod compress;
pub mod error;
pub mod framing;
pub mod status;

pub use codec::{BytesCodec, MessageCodec};
pub use compress::{Compressor, ZstdCompressor, DEFAULT_COMPRESSION_LEVEL};
pub use error::FramingError;
pub use framing::{
    Frame, FrameDecoder, FrameEncoder, FrameFlags, DEFAULT_MAX_MESSAGE_SIZE, FRAME_HEADER_SIZE,
};
pub use status::{Status, StatusCode};
