//! Box codec errors.

use thiserror::Error;

/// Error while encoding or parsing box bytes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("trailing bytes after box body")]
    TrailingBytes,

    #[error("length field overflows usize")]
    LengthOverflow,

    #[error("unknown box type tag: {0:?}")]
    UnknownTypeTag(String),

    #[error("invalid utf-8 in {0}")]
    InvalidUtf8(&'static str),

    #[error("invalid contract value json: {0}")]
    InvalidJson(String),

    #[error("invalid proposition encoding")]
    InvalidProposition,
}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
