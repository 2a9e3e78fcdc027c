//! Payload compression seam.
//!
//! The frame codec treats compression as a pluggable transform; the bit 0
//! frame flag only records whether a payload went through it. Algorithm
//! negotiation happens in the surrounding header protocol and is not part
//! of this crate.

use crate::error::FramingError;
use bytes::Bytes;

/// Compression level for zstd
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// A payload compression algorithm.
pub trait Compressor: Send + Sync {
    /// Algorithm name as negotiated on the wire
    fn name(&self) -> &'static str;

    fn compress(&self, data: &[u8]) -> Result<Bytes, FramingError>;

    fn decompress(&self, data: &[u8]) -> Result<Bytes, FramingError>;
}

/// zstd-backed [`Compressor`]
pub struct ZstdCompressor {
    level: i32,
}

impl ZstdCompressor {
    pub fn new() -> Self {
        Self {
            level: DEFAULT_COMPRESSION_LEVEL,
        }
    }

    pub fn with_level(level: i32) -> Self {
        Self { level }
    }
}

impl Default for ZstdCompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Compressor for ZstdCompressor {
    fn name(&self) -> &'static str {
        "zstd"
    }

    fn compress(&self, data: &[u8]) -> Result<Bytes, FramingError> {
        zstd::encode_all(data, self.level)
            .map(Bytes::from)
            .map_err(|e| FramingError::Codec {
                algorithm: "zstd",
                reason: e.to_string(),
            })
    }

    fn decompress(&self, data: &[u8]) -> Result<Bytes, FramingError> {
        zstd::decode_all(data)
            .map(Bytes::from)
            .map_err(|e| FramingError::Codec {
                algorithm: "zstd",
                reason: e.to_string(),
            })
    }
}
