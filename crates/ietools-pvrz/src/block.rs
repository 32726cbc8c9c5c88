//! Pixel block compression
//!
//! The container only talks to pixel encoders through the [`BlockCodec`]
//! trait. [`SquishCodec`] is the default implementation, built on the
//! `texpresso` port of libsquish.
//!
//! ```text
//! ┌──────────────┐  storage_requirement / decode / encode  ┌─────────────┐
//! │  PvrTexture  │ ──────────────────────────────────────▶ │ BlockCodec  │
//! └──────────────┘                                         └──────┬──────┘
//!                                                                 │
//!                                                          ┌──────┴──────┐
//!                                                          │ SquishCodec │
//!                                                          └─────────────┘
//! ```

use image::RgbaImage;
use texpresso::{Algorithm, COLOUR_WEIGHTS_PERCEPTUAL, COLOUR_WEIGHTS_UNIFORM, Format, Params};

use crate::error::{PvrzError, PvrzResult};
use crate::header::PixelFormat;
use crate::options::{EncodeOptions, Quality};

/// Encoder settings passed to [`BlockCodec::encode`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeParams {
    /// Color fitting quality
    pub quality: Quality,
    /// Weight color error by pixel alpha
    pub weight_by_alpha: bool,
    /// Use perceptual instead of uniform color weights
    pub perceptual_metric: bool,
}

impl From<&EncodeOptions> for EncodeParams {
    fn from(options: &EncodeOptions) -> Self {
        Self {
            quality: options.quality,
            weight_by_alpha: options.weight_by_alpha,
            perceptual_metric: options.perceptual_metric,
        }
    }
}

/// Block-compressed pixel encoder and decoder
///
/// Implementations must be thread-safe so a texture can be moved between
/// threads.
pub trait BlockCodec: Send + Sync {
    /// Payload size in bytes for an image of the given dimensions
    fn storage_requirement(&self, width: u32, height: u32, format: PixelFormat) -> usize;

    /// Decode `data` into an RGBA image
    fn decode(
        &self,
        data: &[u8],
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> PvrzResult<RgbaImage>;

    /// Encode `image` into block-compressed data
    ///
    /// Image dimensions must be non-zero multiples of 4.
    fn encode(
        &self,
        image: &RgbaImage,
        format: PixelFormat,
        params: &EncodeParams,
    ) -> PvrzResult<Vec<u8>>;

    /// Human-readable codec name
    fn name(&self) -> &str;
}

/// Default block codec backed by `texpresso`
#[derive(Debug, Clone, Copy, Default)]
pub struct SquishCodec;

impl SquishCodec {
    /// Create the codec
    pub fn new() -> Self {
        Self
    }

    fn format(format: PixelFormat) -> Format {
        match format {
            PixelFormat::Bc1 => Format::Bc1,
            PixelFormat::Bc2 => Format::Bc2,
            PixelFormat::Bc3 => Format::Bc3,
        }
    }

    fn params(params: &EncodeParams) -> Params {
        let algorithm = match params.quality {
            Quality::Low => Algorithm::RangeFit,
            Quality::Default => Algorithm::ClusterFit,
            Quality::High => Algorithm::IterativeClusterFit,
        };
        let weights = if params.perceptual_metric {
            COLOUR_WEIGHTS_PERCEPTUAL
        } else {
            COLOUR_WEIGHTS_UNIFORM
        };
        Params {
            algorithm,
            weights,
            weigh_colour_by_alpha: params.weight_by_alpha,
        }
    }
}

impl BlockCodec for SquishCodec {
    fn storage_requirement(&self, width: u32, height: u32, format: PixelFormat) -> usize {
        let blocks_wide = width.div_ceil(4) as usize;
        let blocks_high = height.div_ceil(4) as usize;
        blocks_wide * blocks_high * format.block_size()
    }

    fn decode(
        &self,
        data: &[u8],
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> PvrzResult<RgbaImage> {
        if width == 0 || height == 0 {
            return Err(PvrzError::BlockCodec(format!(
                "cannot decode {width}x{height} texture"
            )));
        }
        let needed = self.storage_requirement(width, height, format);
        if data.len() < needed {
            return Err(PvrzError::BlockCodec(format!(
                "{format:?} payload too small: need {needed} bytes, have {}",
                data.len()
            )));
        }

        let mut rgba = vec![0u8; width as usize * height as usize * 4];
        Self::format(format).decompress(
            &data[..needed],
            width as usize,
            height as usize,
            &mut rgba,
        );

        RgbaImage::from_raw(width, height, rgba)
            .ok_or_else(|| PvrzError::BlockCodec("decoded pixel buffer size mismatch".into()))
    }

    fn encode(
        &self,
        image: &RgbaImage,
        format: PixelFormat,
        params: &EncodeParams,
    ) -> PvrzResult<Vec<u8>> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 || width % 4 != 0 || height % 4 != 0 {
            return Err(PvrzError::BlockCodec(format!(
                "cannot encode {width}x{height} image: dimensions must be non-zero multiples of 4"
            )));
        }

        let target = Self::format(format);
        let mut out = vec![0u8; target.compressed_size(width as usize, height as usize)];
        target.compress(
            image.as_raw(),
            width as usize,
            height as usize,
            Self::params(params),
            &mut out,
        );
        Ok(out)
    }

    fn name(&self) -> &str {
        "squish"
    }
}
