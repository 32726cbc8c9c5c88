//! In-place binary buffer editing for Infinity Engine resources
//!
#![allow(clippy::cast_possible_wrap)] // Signed field reads
#![allow(clippy::cast_lossless)] // Sometimes clearer than From
#![allow(clippy::module_name_repetitions)] // Clear naming is preferred
#![allow(clippy::return_self_not_must_use)] // Builder patterns
//! This crate provides [`ByteBuffer`], a growable byte array with
//! bounds-checked little-endian accessors, fixed-size string fields,
//! structural insert/delete and in-place zlib stream replacement.
//!
//! # Features
//!
//! - **Typed Access**: 8/16/32-bit signed and unsigned reads and writes
//! - **String Fields**: Fixed-size fields transcoded through a codepage,
//!   Windows-1252 by default
//! - **Structural Edits**: Insert and delete byte ranges
//! - **Stream Compression**: Replace a region with its zlib stream and back
//! - **Offset Arrays**: Resolve lists of substructures from header fields
//! - **Sticky Errors**: The first failure is kept until explicitly cleared
//! - **Dirty Tracking**: Writes that do not change content leave the buffer clean
//!
//! # Example
//!
//! ```
//! use ietools_buffers::{ByteBuffer, CompressionLevel};
//!
//! let mut buf = ByteBuffer::with_len(8);
//! buf.put_u32(0, 0xDEAD_BEEF).unwrap();
//! assert_eq!(buf.get_u16(2).unwrap(), 0xDEAD);
//!
//! let packed = buf.compress_replace(0, 8, CompressionLevel::BEST).unwrap();
//! let unpacked = buf.decompress_replace(0, packed).unwrap();
//! assert_eq!(unpacked, 8);
//! assert_eq!(buf.get_u32(0).unwrap(), 0xDEAD_BEEF);
//! ```

#![warn(missing_docs)]

pub mod buffer;
pub mod codec;
pub mod error;
pub mod offsets;
pub mod text;

pub use buffer::ByteBuffer;
pub use codec::CompressionLevel;
pub use error::{BufferError, BufferResult, ErrorKind};
pub use offsets::{FieldWidth, OffsetArraySpec};
pub use text::{Codepage, TextTranscoder, TranscodeError};
