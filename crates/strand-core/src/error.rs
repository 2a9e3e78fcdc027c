//! Error types for the wire layer.

use crate::status::{Status, StatusCode};

/// Errors raised while framing or deframing messages.
///
/// Framing errors are fatal to the call they occur on, never to the
/// connection: the call is aborted with the mapped [`Status`] and the
/// transport stays usable for other calls.
#[derive(Debug, thiserror::Error)]
pub enum FramingError {
    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("received a compressed frame but no compressor is configured")]
    CompressionNotSupported,

    #[error("compression requested but no compressor is configured")]
    CompressorMissing,

    #[error("{algorithm} codec failed: {reason}")]
    Codec {
        algorithm: &'static str,
        reason: String,
    },
}

impl From<FramingError> for Status {
    fn from(err: FramingError) -> Self {
        let code = match err {
            FramingError::MessageTooLarge { .. } => StatusCode::ResourceExhausted,
            FramingError::CompressionNotSupported => StatusCode::Internal,
            FramingError::CompressorMissing => StatusCode::Unimplemented,
            FramingError::Codec { .. } => StatusCode::Internal,
        };
        Status::new(code, err.to_string())
    }
}
