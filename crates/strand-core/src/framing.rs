//! Length-prefixed message framing.
//!
//! Frame format: [flags byte][length u32 big-endian][payload bytes]
//! Flags: COMPRESSED(bit 0)

use crate::compress::Compressor;
use crate::error::FramingError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::sync::Arc;

/// Fixed frame header size: 1 flags byte + 4-byte big-endian length
pub const FRAME_HEADER_SIZE: usize = 5;

/// Default maximum message size (4MB)
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 4 * 1024 * 1024;

/// Frame flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameFlags(u8);

impl FrameFlags {
    pub const COMPRESSED: u8 = 0b0000_0001;

    pub fn new(flags: u8) -> Self {
        Self(flags)
    }

    pub fn is_compressed(&self) -> bool {
        self.0 & Self::COMPRESSED != 0
    }

    pub fn as_u8(&self) -> u8 {
        self.0
    }
}

/// One length-prefixed unit of message payload on the wire.
///
/// A decoded frame's payload is the message bytes; when the compressed flag
/// was set on the wire, the payload has already been run through the
/// decoder's compressor.
#[derive(Debug, Clone)]
pub struct Frame {
    pub flags: FrameFlags,
    pub payload: Bytes,
}

/// Encodes one message into one frame.
///
/// Stateless between calls; one encoder is reused for every message sent on
/// a call.
#[derive(Clone)]
pub struct FrameEncoder {
    compressor: Option<Arc<dyn Compressor>>,
}

impl FrameEncoder {
    pub fn new() -> Self {
        Self { compressor: None }
    }

    pub fn with_compressor(compressor: Arc<dyn Compressor>) -> Self {
        Self {
            compressor: Some(compressor),
        }
    }

    /// Encode `payload` into a single frame.
    ///
    /// With `compressed` set, the payload is run through the configured
    /// compressor and the length prefix reflects the bytes actually
    /// written. Requesting compression without a configured compressor is
    /// a caller contract violation, reported as an error.
    pub fn encode(&self, payload: &[u8], compressed: bool) -> Result<Bytes, FramingError> {
        let body = if compressed {
            let compressor = self
                .compressor
                .as_ref()
                .ok_or(FramingError::CompressorMissing)?;
            compressor.compress(payload)?
        } else {
            Bytes::copy_from_slice(payload)
        };

        let mut buf = BytesMut::with_capacity(FRAME_HEADER_SIZE + body.len());
        buf.put_u8(if compressed { FrameFlags::COMPRESSED } else { 0 });
        buf.put_u32(body.len() as u32);
        buf.put_slice(&body);
        Ok(buf.freeze())
    }
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Extracts frames from an incoming byte stream.
///
/// The transport may deliver bytes at arbitrary boundaries; the decoder
/// accumulates them and emits a frame only once all of its payload has
/// arrived. Bytes it cannot yet use are kept, never discarded.
pub struct FrameDecoder {
    buffer: BytesMut,
    max_message_size: usize,
    compressor: Option<Arc<dyn Compressor>>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            compressor: None,
        }
    }

    pub fn with_max_message_size(mut self, max: usize) -> Self {
        self.max_message_size = max;
        self
    }

    pub fn with_compressor(mut self, compressor: Arc<dyn Compressor>) -> Self {
        self.compressor = Some(compressor);
        self
    }

    /// Add data to the decode buffer
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Number of buffered bytes not yet consumed by a complete frame
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Try to extract one complete frame from the buffer.
    ///
    /// Returns `Ok(None)` when more bytes are needed. A length prefix
    /// exceeding the maximum message size is rejected as soon as the header
    /// is visible, before any payload is waited for.
    pub fn next_frame(&mut self) -> Result<Option<Frame>, FramingError> {
        if self.buffer.len() < FRAME_HEADER_SIZE {
            return Ok(None);
        }

        let flags = FrameFlags::new(self.buffer[0]);
        let length = u32::from_be_bytes([
            self.buffer[1],
            self.buffer[2],
            self.buffer[3],
            self.buffer[4],
        ]) as usize;

        if length > self.max_message_size {
            return Err(FramingError::MessageTooLarge {
                size: length,
                max: self.max_message_size,
            });
        }

        if self.buffer.len() < FRAME_HEADER_SIZE + length {
            return Ok(None);
        }

        self.buffer.advance(FRAME_HEADER_SIZE);
        let payload = self.buffer.split_to(length).freeze();

        let payload = if flags.is_compressed() {
            let compressor = self
                .compressor
                .as_ref()
                .ok_or(FramingError::CompressionNotSupported)?;
            compressor.decompress(&payload)?
        } else {
            payload
        };

        Ok(Some(Frame { flags, payload }))
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compress::ZstdCompressor;

    fn decode_all(decoder: &mut FrameDecoder) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Some(frame) = decoder.next_frame().unwrap() {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn test_encode_known_bytes() {
        let encoder = FrameEncoder::new();
        let encoded = encoder.encode(b"ok", false).unwrap();
        assert_eq!(&encoded[..], &[0x00, 0x00, 0x00, 0x00, 0x02, 0x6F, 0x6B]);
    }

    #[test]
    fn test_frame_roundtrip() {
        let encoder = FrameEncoder::new();
        let encoded = encoder.encode(b"hello", false).unwrap();

        let mut decoder = FrameDecoder::new();
        decoder.feed(&encoded);

        let frame = decoder.next_frame().unwrap().unwrap();
        assert_eq!(&frame.payload[..], b"hello");
        assert!(!frame.flags.is_compressed());
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_compressed_roundtrip() {
        let compressor = Arc::new(ZstdCompressor::new());
        let encoder = FrameEncoder::with_compressor(compressor.clone());
        let message = b"a message worth compressing, repeated ".repeat(20);

        let encoded = encoder.encode(&message, true).unwrap();
        assert_eq!(encoded[0], FrameFlags::COMPRESSED);

        let mut decoder = FrameDecoder::new().with_compressor(compressor);
        decoder.feed(&encoded);

        let frame = decoder.next_frame().unwrap().unwrap();
        assert!(frame.flags.is_compressed());
        assert_eq!(&frame.payload[..], &message[..]);
    }

    #[test]
    fn test_compression_without_compressor() {
        let encoder = FrameEncoder::new();
        assert!(matches!(
            encoder.encode(b"data", true),
            Err(FramingError::CompressorMissing)
        ));

        // A compressed frame from the wire needs a compressor too
        let compressing = FrameEncoder::with_compressor(Arc::new(ZstdCompressor::new()));
        let encoded = compressing.encode(b"data", true).unwrap();

        let mut decoder = FrameDecoder::new();
        decoder.feed(&encoded);
        assert!(matches!(
            decoder.next_frame(),
            Err(FramingError::CompressionNotSupported)
        ));
    }

    #[test]
    fn test_partial_delivery() {
        let encoder = FrameEncoder::new();
        let mut wire = Vec::new();
        for payload in [&b"first"[..], b"second", b"third"] {
            wire.extend_from_slice(&encoder.encode(payload, false).unwrap());
        }

        // Decoding the stream split at every offset yields the same frames
        // as decoding it whole.
        for split in 0..=wire.len() {
            let mut decoder = FrameDecoder::new();
            decoder.feed(&wire[..split]);
            let mut frames = decode_all(&mut decoder);
            decoder.feed(&wire[split..]);
            frames.extend(decode_all(&mut decoder));

            let payloads: Vec<_> = frames.iter().map(|f| &f.payload[..]).collect();
            assert_eq!(payloads, vec![&b"first"[..], b"second", b"third"]);
            assert_eq!(decoder.buffered(), 0);
        }
    }

    #[test]
    fn test_incomplete_frame_is_buffered() {
        let encoder = FrameEncoder::new();
        let encoded = encoder.encode(b"buffered", false).unwrap();

        let mut decoder = FrameDecoder::new();
        decoder.feed(&encoded[..encoded.len() - 1]);
        assert!(decoder.next_frame().unwrap().is_none());
        assert_eq!(decoder.buffered(), encoded.len() - 1);

        decoder.feed(&encoded[encoded.len() - 1..]);
        let frame = decoder.next_frame().unwrap().unwrap();
        assert_eq!(&frame.payload[..], b"buffered");
    }

    #[test]
    fn test_empty_payload() {
        let encoder = FrameEncoder::new();
        let encoded = encoder.encode(b"", false).unwrap();
        assert_eq!(encoded.len(), FRAME_HEADER_SIZE);

        let mut decoder = FrameDecoder::new();
        decoder.feed(&encoded);
        let frame = decoder.next_frame().unwrap().unwrap();
        assert!(frame.payload.is_empty());
    }

    #[test]
    fn test_oversized_length_rejected_from_header_alone() {
        let mut decoder = FrameDecoder::new().with_max_message_size(16);

        // Header declares 1KB; only the 5 header bytes are fed. The error
        // surfaces immediately, without buffering toward the payload.
        let mut header = vec![0x00];
        header.extend_from_slice(&1024u32.to_be_bytes());
        decoder.feed(&header);

        assert!(matches!(
            decoder.next_frame(),
            Err(FramingError::MessageTooLarge { size: 1024, max: 16 })
        ));
    }

    #[test]
    fn test_multiple_frames_single_feed() {
        let encoder = FrameEncoder::new();
        let mut wire = Vec::new();
        wire.extend_from_slice(&encoder.encode(b"one", false).unwrap());
        wire.extend_from_slice(&encoder.encode(b"two", false).unwrap());

        let mut decoder = FrameDecoder::new();
        decoder.feed(&wire);

        assert_eq!(&decoder.next_frame().unwrap().unwrap().payload[..], b"one");
        assert_eq!(&decoder.next_frame().unwrap().unwrap().payload[..], b"two");
        assert!(decoder.next_frame().unwrap().is_none());
    }
}
