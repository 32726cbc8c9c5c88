//! PVR/PVRZ error types

use ietools_buffers::{BufferError, ErrorKind};
use thiserror::Error;

/// Texture container error type
///
/// `Clone` so the container can return its sticky error on every call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PvrzError {
    /// Header signature does not match the PVR magic
    #[error("invalid PVR signature: {0:#010x}")]
    InvalidSignature(u32),

    /// PVRZ wrapper declares an implausible decompressed size
    #[error("PVRZ declared size outside accepted limits: {0}")]
    DeclaredSizeOutOfRange(i32),

    /// Decompressed PVRZ data is shorter than declared
    #[error("PVRZ data size mismatch: {actual} < {declared}")]
    SizeMismatch {
        /// Size announced by the wrapper
        declared: usize,
        /// Size actually produced by decompression
        actual: usize,
    },

    /// Header uses the extended pixel format bits
    #[error("extended pixel format not supported: {0:#x}")]
    ExtendedFormat(u32),

    /// Pixel format other than BC1, BC2 or BC3
    #[error("unsupported pixel format: {0}")]
    UnsupportedPixelFormat(u32),

    /// Color space other than linear RGB or sRGB
    #[error("unsupported color space: {0}")]
    UnsupportedColorSpace(u32),

    /// Channel type outside the byte-sized types
    #[error("unsupported channel type: {0}")]
    UnsupportedChannelType(u32),

    /// Width or height above the limit or not a multiple of 4
    #[error("unsupported texture {axis}: {value}")]
    InvalidDimension {
        /// `"width"` or `"height"`
        axis: &'static str,
        /// Offending value
        value: u32,
    },

    /// Depth, surface, face or mipmap count other than 1
    #[error("unsupported number of texture {field}: {value}")]
    UnsupportedLayout {
        /// Header field name
        field: &'static str,
        /// Offending value
        value: u32,
    },

    /// Input shorter than the structure being read
    #[error("PVR input buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall {
        /// Bytes required
        needed: usize,
        /// Bytes present
        available: usize,
    },

    /// Metadata block extends past the end of the input
    #[error("metadata size mismatch: {length} bytes declared, {available} available")]
    MetadataSizeMismatch {
        /// Declared metadata length
        length: usize,
        /// Bytes present after the header
        available: usize,
    },

    /// Malformed or out-of-range parameter
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// Pixel block encoder or decoder failure
    #[error("block codec error: {0}")]
    BlockCodec(String),

    /// Failure reported by the underlying byte buffer
    #[error(transparent)]
    Buffer(#[from] BufferError),
}

impl PvrzError {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidSignature(_)
            | Self::DeclaredSizeOutOfRange(_)
            | Self::SizeMismatch { .. }
            | Self::ExtendedFormat(_)
            | Self::UnsupportedPixelFormat(_)
            | Self::UnsupportedColorSpace(_)
            | Self::UnsupportedChannelType(_)
            | Self::InvalidDimension { .. }
            | Self::UnsupportedLayout { .. }
            | Self::BufferTooSmall { .. }
            | Self::MetadataSizeMismatch { .. } => ErrorKind::Format,
            Self::InvalidArguments(_) => ErrorKind::InvalidArguments,
            Self::BlockCodec(_) => ErrorKind::Codec,
            Self::Buffer(err) => err.kind(),
        }
    }

    /// Whether this error describes malformed container data
    pub fn is_format_error(&self) -> bool {
        self.kind() == ErrorKind::Format
    }
}

impl From<std::io::Error> for PvrzError {
    fn from(err: std::io::Error) -> Self {
        Self::Buffer(BufferError::from(err))
    }
}

/// Result type for texture container operations
pub type PvrzResult<T> = Result<T, PvrzError>;
