use thiserror::Error;

/// Errors that can occur while encoding/decoding wire data
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Buffer ended before the value could be read
    #[error("buffer truncated: needed {needed} more bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    /// String payload was not valid utf-8
    #[error("string payload is not valid utf-8")]
    InvalidUtf8,

    /// Message type tag in a frame header was not recognized
    #[error("unknown message type {0}")]
    UnknownMessageType(u16),

    /// Typed-array typecode string was not recognized
    #[error("unknown typed-array typecode {0:?}")]
    UnknownTypeCode(String),

    /// Typed-array byte length is not a multiple of the element width
    #[error("typed array of {len} bytes is not a multiple of element width {width}")]
    MisalignedTypedArray { len: usize, width: usize },

    /// Frame length prefix exceeds the hard limit (SECURITY: framing corruption,
    /// fatal to the connection)
    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: u64, max: u64 },
}
