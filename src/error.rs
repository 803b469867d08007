// ABOUTME: Error types for streaming MessagePack decoding.
// ABOUTME: Every variant is a terminal format error; the decoder must be reset afterwards.

use std::fmt;

/// The result type for decoder operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Alias naming the role every [`Error`] plays: the byte stream violated the format.
pub type FormatError = Error;

/// Errors that can occur while decoding.
///
/// All variants are fatal to the message being decoded. Once [`Decoder::advance`]
/// returns one, the decoder refuses further input with [`Error::Poisoned`] until
/// [`Decoder::reset`] is called.
///
/// [`Decoder::advance`]: crate::Decoder::advance
/// [`Decoder::reset`]: crate::Decoder::reset
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Unrecognized leading type code.
    #[error("parse error: invalid type code 0x{0:02x}")]
    InvalidTypeCode(u8),

    /// Container (or Value-Object) nesting deeper than the configured maximum.
    #[error("parse error: maximum nesting depth of {0} exceeded")]
    MaxDepthExceeded(usize),

    /// A 32-bit length or count prefix above 2^31-1.
    #[error("length {0} exceeds the format limit")]
    LengthOutOfRange(u64),

    /// Raw (or custom value type) payload longer than the configured maximum.
    #[error("raw length {0} exceeds the configured maximum")]
    MaxRawLengthExceeded(usize),

    /// Container count larger than the configured maximum.
    #[error("container size {0} exceeds the configured maximum")]
    MaxContainerSizeExceeded(usize),

    /// A Value-Object marker was found but no helper is registered.
    #[error("value-object marker found but no helper is registered")]
    MissingVoHelper,

    /// The Value-Object helper rejected the data it was given.
    #[error("value-object helper error: {0}")]
    VoHelper(String),

    /// A field group flags values the helper does not expect.
    #[error("value-object field group 0x{0:02x} flags values the helper does not expect")]
    VoMismatch(u8),

    /// The decoder is in a state its current frame does not support.
    #[error("decoder state does not match its container stack")]
    InvalidState,

    /// The decoder failed earlier and has not been reset.
    #[error("decoder must be reset after a format error")]
    Poisoned,

    /// Input ended before the message was complete (one-shot decoding only).
    #[error("unexpected end of input")]
    Truncated,

    /// Bytes remained after a complete message (one-shot decoding only).
    #[error("trailing bytes after message")]
    TrailingBytes,

    /// Custom error message (for serde integration).
    #[error("{0}")]
    Custom(String),
}

impl Error {
    /// Returns a stable error type name, used by the conformance runner.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Error::InvalidTypeCode(_) => "invalid_type_code",
            Error::MaxDepthExceeded(_) => "max_depth_exceeded",
            Error::LengthOutOfRange(_) => "length_out_of_range",
            Error::MaxRawLengthExceeded(_) => "max_raw_length_exceeded",
            Error::MaxContainerSizeExceeded(_) => "max_container_size_exceeded",
            Error::MissingVoHelper => "missing_vo_helper",
            Error::VoHelper(_) => "vo_helper",
            Error::VoMismatch(_) => "vo_mismatch",
            Error::InvalidState => "invalid_state",
            Error::Poisoned => "poisoned",
            Error::Truncated => "truncated",
            Error::TrailingBytes => "trailing_bytes",
            Error::Custom(_) => "custom",
        }
    }

    /// Build a helper error from anything displayable.
    pub fn vo_helper<T: fmt::Display>(msg: T) -> Self {
        Error::VoHelper(msg.to_string())
    }
}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_types() {
        assert_eq!(Error::Truncated.error_type(), "truncated");
        assert_eq!(Error::InvalidTypeCode(0xc1).error_type(), "invalid_type_code");
        assert_eq!(Error::MaxDepthExceeded(32).error_type(), "max_depth_exceeded");
        assert_eq!(Error::vo_helper("bad").error_type(), "vo_helper");
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::InvalidTypeCode(0xc1).to_string(),
            "parse error: invalid type code 0xc1"
        );
        assert_eq!(
            Error::MaxDepthExceeded(32).to_string(),
            "parse error: maximum nesting depth of 32 exceeded"
        );
        assert_eq!(Error::vo_helper("no such type").to_string(), "value-object helper error: no such type");
    }
}
