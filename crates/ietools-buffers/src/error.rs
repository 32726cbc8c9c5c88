//! Buffer error types

use thiserror::Error;

/// Broad failure category shared by the buffer and container crates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Offset or size outside the buffer bounds
    OutOfRange,
    /// Malformed parameters or unsupported enumeration values
    InvalidArguments,
    /// Structurally invalid input data
    Format,
    /// Failure reported by the stream or block codec
    Codec,
    /// Failure reported by a source or sink
    Io,
}

/// Errors produced by [`crate::ByteBuffer`] operations
///
/// The type is `Clone` so a buffer can hand out its sticky error on every
/// call made while it is set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    /// Offset and size describe a region outside the buffer
    #[error("offset out of range: {offset:#x}+{size} exceeds buffer length {len}")]
    OutOfRange {
        /// Requested start offset
        offset: usize,
        /// Requested region size
        size: usize,
        /// Buffer length at the time of the call
        len: usize,
    },

    /// Malformed parameter tuple
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// Stream compressor or decompressor failure
    #[error("stream codec error: {0}")]
    Codec(String),

    /// Source or sink failure
    #[error("I/O error: {message}")]
    Io {
        /// Kind reported by the underlying `std::io::Error`
        kind: std::io::ErrorKind,
        /// Rendered error message
        message: String,
    },
}

impl BufferError {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::OutOfRange { .. } => ErrorKind::OutOfRange,
            Self::InvalidArguments(_) => ErrorKind::InvalidArguments,
            Self::Codec(_) => ErrorKind::Codec,
            Self::Io { .. } => ErrorKind::Io,
        }
    }
}

impl From<std::io::Error> for BufferError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Result type for buffer operations
pub type BufferResult<T> = Result<T, BufferError>;
