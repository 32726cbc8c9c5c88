//! PVR and PVRZ texture containers for Enhanced Edition Infinity Engine games
//!
#![allow(clippy::cast_possible_wrap)] // Header fields are stored as raw integers
#![allow(clippy::module_name_repetitions)] // Clear naming is preferred
#![allow(clippy::return_self_not_must_use)] // Builder patterns
//! PVR files hold a single block-compressed texture (BC1, BC2 or BC3) behind
//! a fixed 0x34-byte header. PVRZ files wrap a complete PVR file in a zlib
//! stream prefixed with its decompressed size. This crate reads both forms
//! into an RGBA image, lets the image be edited, and writes it back.
//!
//! # Example
//!
//! ```no_run
//! use ietools_pvrz::{PixelFormat, PvrTexture, Quality, Rect};
//! use image::Rgba;
//!
//! let mut texture = PvrTexture::new(64, 64, PixelFormat::Bc3);
//! texture.fill_image_rect(Rect::new(0, 0, 32, 32), Rgba([255, 0, 0, 255]))?;
//! texture.set_quality(Quality::High)?;
//!
//! let file = std::fs::File::create("MOS0000.PVRZ")?;
//! texture.save(file, true)?;
//!
//! let reloaded = PvrTexture::load(std::fs::File::open("MOS0000.PVRZ")?)?;
//! assert_eq!(reloaded.width(), 64);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]

pub mod block;
pub mod error;
pub mod header;
pub mod options;
pub mod rect;
pub mod texture;

pub use block::{BlockCodec, EncodeParams, SquishCodec};
pub use error::{PvrzError, PvrzResult};
pub use header::{
    ChannelType, ColorSpace, FLAG_PREMULTIPLIED, HEADER_SIZE, MAX_DIMENSION, PVR_MAGIC,
    PixelFormat, PvrHeader,
};
pub use options::{EncodeOptions, Quality};
pub use rect::Rect;
pub use texture::PvrTexture;
