//! Zlib stream compression adapter
//!
//! Thin wrapper over `flate2` used by the buffer's compress/decompress
//! replace operations. Compressed output is always a complete zlib stream
//! (header, deflate body and Adler-32 trailer).

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use serde::{Deserialize, Serialize};

use crate::error::{BufferError, BufferResult};

/// Compression level accepted by [`compress`]
///
/// Mirrors the classic zlib level range `-2..=9`, where `-2` selects
/// Huffman-only coding and `-1` the library default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionLevel {
    /// Level `-2`: entropy coding only
    HuffmanOnly,
    /// Level `-1`: library default
    #[default]
    Default,
    /// Explicit level `0..=9`
    Level(u8),
}

impl CompressionLevel {
    /// Lowest accepted raw level
    pub const MIN: i32 = -2;
    /// Highest accepted raw level
    pub const MAX: i32 = 9;
    /// Smallest output
    pub const BEST: Self = Self::Level(9);

    /// Convert a raw level, clamping to `-2..=9`
    pub fn from_i32(level: i32) -> Self {
        match level.clamp(Self::MIN, Self::MAX) {
            -2 => Self::HuffmanOnly,
            -1 => Self::Default,
            n => Self::Level(n as u8),
        }
    }

    /// Raw level value
    pub fn as_i32(self) -> i32 {
        match self {
            Self::HuffmanOnly => -2,
            Self::Default => -1,
            Self::Level(n) => i32::from(n.min(9)),
        }
    }

    // flate2 has no portable Huffman-only strategy; use the fastest level.
    fn to_flate2(self) -> Compression {
        match self {
            Self::HuffmanOnly => Compression::fast(),
            Self::Default => Compression::default(),
            Self::Level(n) => Compression::new(u32::from(n.min(9))),
        }
    }
}

impl From<i32> for CompressionLevel {
    fn from(level: i32) -> Self {
        Self::from_i32(level)
    }
}

/// Compress `data` into a complete zlib stream
pub fn compress(data: &[u8], level: CompressionLevel) -> BufferResult<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2 + 16), level.to_flate2());
    encoder
        .write_all(data)
        .map_err(|e| BufferError::Codec(format!("zlib compression failed: {e}")))?;
    encoder
        .finish()
        .map_err(|e| BufferError::Codec(format!("zlib compression failed: {e}")))
}

/// Decompress a zlib stream of unknown output length
///
/// The destination starts at `size_hint` bytes (at least one) and doubles
/// whenever it fills up. It is trimmed to the produced length on return.
pub fn decompress(data: &[u8], size_hint: usize) -> BufferResult<Vec<u8>> {
    inflate(ZlibDecoder::new(data), size_hint)
}

/// Decompress at most `limit` bytes of a zlib stream
///
/// Output past `limit` is never produced, so a stream that inflates beyond
/// it is returned cut at exactly `limit` bytes.
pub fn decompress_limited(data: &[u8], limit: usize) -> BufferResult<Vec<u8>> {
    let limit_u64 = u64::try_from(limit).unwrap_or(u64::MAX);
    inflate(ZlibDecoder::new(data).take(limit_u64), limit.min(data.len().saturating_mul(4)))
}

fn inflate<R: Read>(mut decoder: R, size_hint: usize) -> BufferResult<Vec<u8>> {
    let mut out = vec![0u8; size_hint.max(1)];
    let mut total = 0;

    loop {
        if total == out.len() {
            let grow = out.len();
            out.resize(total + grow, 0);
        }

        match decoder.read(&mut out[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => {
                return Err(BufferError::Codec(format!(
                    "zlib decompression failed: {e}"
                )));
            }
        }
    }

    out.truncate(total);
    Ok(out)
}
