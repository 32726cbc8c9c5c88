//! PVR header structures and parsing
//!
//! The header is a fixed 0x34-byte little-endian block followed by an opaque
//! metadata blob:
//!
//! | Offset | Field            |
//! |--------|------------------|
//! | 0x00   | signature        |
//! | 0x04   | flags            |
//! | 0x08   | pixel format     |
//! | 0x0c   | extended format  |
//! | 0x10   | color space      |
//! | 0x14   | channel type     |
//! | 0x18   | height           |
//! | 0x1c   | width            |
//! | 0x20   | depth            |
//! | 0x24   | surfaces         |
//! | 0x28   | faces            |
//! | 0x2c   | mip maps         |
//! | 0x30   | metadata length  |

use ietools_buffers::ByteBuffer;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PvrzError, PvrzResult};

/// PVR signature (`"PVR\x03"` little-endian)
pub const PVR_MAGIC: u32 = 0x0352_5650;

/// Size of the fixed header in bytes
pub const HEADER_SIZE: usize = 0x34;

/// Largest accepted texture width or height
pub const MAX_DIMENSION: u32 = 4096;

/// Largest decompressed size a PVRZ wrapper may declare
pub const MAX_DECLARED_SIZE: usize = 1 << 25;

/// Header flag: pixels are premultiplied by alpha
pub const FLAG_PREMULTIPLIED: u32 = 2;

mod offsets {
    pub const SIGNATURE: usize = 0x00;
    pub const FLAGS: usize = 0x04;
    pub const PIXEL_FORMAT: usize = 0x08;
    pub const EXTENDED_FORMAT: usize = 0x0c;
    pub const COLOR_SPACE: usize = 0x10;
    pub const CHANNEL_TYPE: usize = 0x14;
    pub const HEIGHT: usize = 0x18;
    pub const WIDTH: usize = 0x1c;
    pub const DEPTH: usize = 0x20;
    pub const SURFACES: usize = 0x24;
    pub const FACES: usize = 0x28;
    pub const MIP_MAPS: usize = 0x2c;
    pub const META_LENGTH: usize = 0x30;
}

/// Block compression applied to the pixel payload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum PixelFormat {
    /// BC1 (DXT1), 8 bytes per 4x4 block
    #[default]
    Bc1 = 7,
    /// BC2 (DXT3), 16 bytes per 4x4 block
    Bc2 = 9,
    /// BC3 (DXT5), 16 bytes per 4x4 block
    Bc3 = 11,
}

impl PixelFormat {
    /// Bytes per 4x4 pixel block
    pub fn block_size(self) -> usize {
        match self {
            Self::Bc1 => 8,
            Self::Bc2 | Self::Bc3 => 16,
        }
    }

    /// Raw header value
    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for PixelFormat {
    type Error = PvrzError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            7 => Ok(Self::Bc1),
            9 => Ok(Self::Bc2),
            11 => Ok(Self::Bc3),
            _ => Err(PvrzError::UnsupportedPixelFormat(value)),
        }
    }
}

/// Color space of the pixel data
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum ColorSpace {
    /// Linear RGB
    #[default]
    Linear = 0,
    /// Standard RGB
    Srgb = 1,
}

impl ColorSpace {
    /// Raw header value
    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for ColorSpace {
    type Error = PvrzError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Linear),
            1 => Ok(Self::Srgb),
            _ => Err(PvrzError::UnsupportedColorSpace(value)),
        }
    }
}

/// Storage type of the individual color channels
///
/// Only byte-sized channel types are supported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum ChannelType {
    /// Unsigned byte, normalized
    #[default]
    UByteNorm = 0,
    /// Signed byte, normalized
    SByteNorm = 1,
    /// Unsigned byte
    UByte = 2,
    /// Signed byte
    SByte = 3,
}

impl ChannelType {
    /// Raw header value
    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for ChannelType {
    type Error = PvrzError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::UByteNorm),
            1 => Ok(Self::SByteNorm),
            2 => Ok(Self::UByte),
            3 => Ok(Self::SByte),
            _ => Err(PvrzError::UnsupportedChannelType(value)),
        }
    }
}

/// Parsed PVR header
///
/// Depth, surface, face and mipmap counts are always 1 and therefore not
/// stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PvrHeader {
    /// Header flags (see [`FLAG_PREMULTIPLIED`])
    pub flags: u32,
    /// Pixel payload compression
    pub pixel_format: PixelFormat,
    /// Color space of the pixel data
    pub color_space: ColorSpace,
    /// Channel storage type
    pub channel_type: ChannelType,
    /// Texture width in pixels
    pub width: u32,
    /// Texture height in pixels
    pub height: u32,
    /// Opaque metadata blob
    pub metadata: Vec<u8>,
}

impl PvrHeader {
    /// Parse and validate the header at the start of `buf`
    pub fn parse(buf: &mut ByteBuffer) -> PvrzResult<Self> {
        let available = buf.buffer_length();
        if available < HEADER_SIZE {
            return Err(PvrzError::BufferTooSmall {
                needed: HEADER_SIZE,
                available,
            });
        }

        let signature = buf.get_u32(offsets::SIGNATURE)?;
        if signature != PVR_MAGIC {
            return Err(PvrzError::InvalidSignature(signature));
        }

        let flags = buf.get_u32(offsets::FLAGS)?;
        let extended = buf.get_u32(offsets::EXTENDED_FORMAT)?;
        if extended != 0 {
            return Err(PvrzError::ExtendedFormat(extended));
        }
        let pixel_format = PixelFormat::try_from(buf.get_u32(offsets::PIXEL_FORMAT)?)?;
        let color_space = ColorSpace::try_from(buf.get_u32(offsets::COLOR_SPACE)?)?;
        let channel_type = ChannelType::try_from(buf.get_u32(offsets::CHANNEL_TYPE)?)?;
        let height = check_dimension("height", buf.get_u32(offsets::HEIGHT)?)?;
        let width = check_dimension("width", buf.get_u32(offsets::WIDTH)?)?;

        for (field, offset) in [
            ("depth", offsets::DEPTH),
            ("surfaces", offsets::SURFACES),
            ("faces", offsets::FACES),
            ("mip maps", offsets::MIP_MAPS),
        ] {
            let value = buf.get_u32(offset)?;
            if value != 1 {
                return Err(PvrzError::UnsupportedLayout { field, value });
            }
        }

        // Negative lengths are treated as "no metadata"
        let meta_len = usize::try_from(buf.get_i32(offsets::META_LENGTH)?).unwrap_or(0);
        let available = available - HEADER_SIZE;
        if meta_len > available {
            return Err(PvrzError::MetadataSizeMismatch {
                length: meta_len,
                available,
            });
        }
        let metadata = buf.get_bytes(HEADER_SIZE, meta_len)?;

        debug!(
            "Parsed PVR header: {width}x{height} {pixel_format:?}, {} metadata bytes",
            metadata.len()
        );

        Ok(Self {
            flags,
            pixel_format,
            color_space,
            channel_type,
            width,
            height,
            metadata,
        })
    }

    /// Offset of the pixel payload
    pub fn data_offset(&self) -> usize {
        HEADER_SIZE + self.metadata.len()
    }

    /// Serialize the header followed by the metadata
    pub fn write(&self) -> PvrzResult<ByteBuffer> {
        let meta_len = u32::try_from(self.metadata.len()).map_err(|_| {
            PvrzError::InvalidArguments(format!(
                "metadata too large: {} bytes",
                self.metadata.len()
            ))
        })?;

        let mut buf = ByteBuffer::with_len(HEADER_SIZE);
        buf.put_u32(offsets::SIGNATURE, PVR_MAGIC)?;
        buf.put_u32(offsets::FLAGS, self.flags)?;
        buf.put_u32(offsets::PIXEL_FORMAT, self.pixel_format.as_u32())?;
        buf.put_u32(offsets::EXTENDED_FORMAT, 0)?;
        buf.put_u32(offsets::COLOR_SPACE, self.color_space.as_u32())?;
        buf.put_u32(offsets::CHANNEL_TYPE, self.channel_type.as_u32())?;
        buf.put_u32(offsets::HEIGHT, self.height)?;
        buf.put_u32(offsets::WIDTH, self.width)?;
        for offset in [
            offsets::DEPTH,
            offsets::SURFACES,
            offsets::FACES,
            offsets::MIP_MAPS,
        ] {
            buf.put_u32(offset, 1)?;
        }
        buf.put_u32(offsets::META_LENGTH, meta_len)?;

        if !self.metadata.is_empty() {
            buf.insert_bytes(HEADER_SIZE, self.metadata.len())?;
            buf.put_bytes(HEADER_SIZE, &self.metadata)?;
        }
        Ok(buf)
    }
}

fn check_dimension(axis: &'static str, value: u32) -> PvrzResult<u32> {
    if value > MAX_DIMENSION || value % 4 != 0 {
        return Err(PvrzError::InvalidDimension { axis, value });
    }
    Ok(value)
}
