//! PVR/PVRZ texture container
//!
//! [`PvrTexture`] owns a decoded RGBA image together with the header fields
//! needed to serialize it again. Import detects whether the input is a raw
//! PVR file or a zlib-compressed PVRZ wrapper.
//!
//! # Error model
//!
//! Fallible operations return a [`PvrzResult`] and also record the first
//! failure. While an error is recorded every further mutating or
//! serializing call returns it unchanged and getters report zero or empty
//! values; [`PvrTexture::clear_error`] resumes normal operation. A failed import leaves the texture exactly as
//! it was before the call.

use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;

use ietools_buffers::{ByteBuffer, CompressionLevel};
use image::{Rgba, RgbaImage, imageops};
use tracing::{debug, warn};

use crate::block::{BlockCodec, EncodeParams, SquishCodec};
use crate::error::{PvrzError, PvrzResult};
use crate::header::{
    ChannelType, ColorSpace, HEADER_SIZE, MAX_DECLARED_SIZE, PVR_MAGIC, PixelFormat, PvrHeader,
};
use crate::options::{EncodeOptions, Quality};
use crate::rect::Rect;

/// PVR texture with a decoded pixel image
#[derive(Clone)]
pub struct PvrTexture {
    header: PvrHeader,
    image: RgbaImage,
    options: EncodeOptions,
    codec: Arc<dyn BlockCodec>,
    error: Option<PvrzError>,
}

impl fmt::Debug for PvrTexture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PvrTexture")
            .field("header", &self.header)
            .field("dimensions", &self.image.dimensions())
            .field("options", &self.options)
            .field("codec", &self.codec.name())
            .field("error", &self.error)
            .finish()
    }
}

impl PvrTexture {
    /// Create a blank texture
    ///
    /// Dimensions below 1 are raised to 1. Dimensions that are not a
    /// multiple of 4 are padded on export.
    pub fn new(width: u32, height: u32, pixel_format: PixelFormat) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            header: PvrHeader {
                pixel_format,
                width,
                height,
                ..PvrHeader::default()
            },
            image: RgbaImage::new(width, height),
            options: EncodeOptions::default(),
            codec: Arc::new(SquishCodec::new()),
            error: None,
        }
    }

    /// Use `codec` for pixel encoding and decoding
    #[must_use]
    pub fn with_codec<C: BlockCodec + 'static>(mut self, codec: C) -> Self {
        self.codec = Arc::new(codec);
        self
    }

    /// Use `options` when serializing
    #[must_use]
    pub fn with_options(mut self, options: EncodeOptions) -> Self {
        self.options = options;
        self
    }

    /// Read a PVR or PVRZ texture from `reader`
    pub fn load<R: Read>(mut reader: R) -> PvrzResult<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(data)
    }

    /// Decode a PVR or PVRZ texture from memory
    pub fn from_bytes(data: Vec<u8>) -> PvrzResult<Self> {
        let mut texture = Self::new(1, 1, PixelFormat::Bc1);
        texture.import(data)?;
        Ok(texture)
    }

    /// Replace the texture with the PVR or PVRZ data in `data`
    ///
    /// Encoding options and the block codec are kept. On failure the
    /// texture is left unchanged and the error is recorded.
    pub fn import(&mut self, data: Vec<u8>) -> PvrzResult<()> {
        self.check()?;
        match self.decode_container(data) {
            Ok((header, image)) => {
                self.header = header;
                self.image = image;
                Ok(())
            }
            Err(err) => {
                warn!("PVR import failed: {err}");
                self.fail(err)
            }
        }
    }

    /// Write the texture to `writer`, optionally as PVRZ
    pub fn save<W: Write>(&mut self, mut writer: W, as_compressed: bool) -> PvrzResult<()> {
        let data = self.to_bytes(as_compressed)?;
        let result = writer.write_all(&data).map_err(PvrzError::from);
        self.record(result)
    }

    /// Serialize the texture, optionally as PVRZ
    ///
    /// The image is padded to a multiple of 4 in both directions; the stored
    /// image is not modified.
    pub fn to_bytes(&mut self, as_compressed: bool) -> PvrzResult<Vec<u8>> {
        self.check()?;
        let result = self.encode_container(as_compressed);
        self.record(result)
    }

    /// Recorded error, if any
    pub fn error(&self) -> Option<&PvrzError> {
        self.error.as_ref()
    }

    /// Clear the recorded error so subsequent operations run again
    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Copy of the current image, empty while an error is recorded
    pub fn image(&self) -> RgbaImage {
        if self.error.is_some() {
            return RgbaImage::new(0, 0);
        }
        self.image.clone()
    }

    /// Borrow the current image, or `None` while an error is recorded
    pub fn image_ref(&self) -> Option<&RgbaImage> {
        self.error.is_none().then_some(&self.image)
    }

    /// Replace the image, adopting its dimensions
    pub fn set_image(&mut self, image: &RgbaImage) -> PvrzResult<()> {
        self.check()?;
        self.replace_image(image.clone());
        Ok(())
    }

    /// Copy of the pixels inside `rect`
    pub fn image_rect(&mut self, rect: Rect) -> PvrzResult<RgbaImage> {
        self.check()?;
        self.require_inside(rect, self.image.dimensions(), "source")?;
        Ok(imageops::crop_imm(&self.image, rect.x, rect.y, rect.width, rect.height).to_image())
    }

    /// Copy the `src` region of `image` into the texture at `dst`
    pub fn set_image_rect(&mut self, image: &RgbaImage, src: Rect, dst: (u32, u32)) -> PvrzResult<()> {
        self.check()?;
        self.require_inside(src, image.dimensions(), "source")?;
        let target = Rect::new(dst.0, dst.1, src.width, src.height);
        self.require_inside(target, self.image.dimensions(), "destination")?;

        let patch = imageops::crop_imm(image, src.x, src.y, src.width, src.height).to_image();
        imageops::replace(&mut self.image, &patch, i64::from(dst.0), i64::from(dst.1));
        Ok(())
    }

    /// Fill `rect` with `color`
    pub fn fill_image_rect(&mut self, rect: Rect, color: Rgba<u8>) -> PvrzResult<()> {
        self.check()?;
        self.require_inside(rect, self.image.dimensions(), "fill")?;
        if rect.is_empty() {
            return Ok(());
        }
        for y in rect.y..rect.y + rect.height {
            for x in rect.x..rect.x + rect.width {
                self.image.put_pixel(x, y, color);
            }
        }
        Ok(())
    }

    /// Image width in pixels
    pub fn width(&self) -> u32 {
        self.unless_failed(self.image.width())
    }

    /// Image height in pixels
    pub fn height(&self) -> u32 {
        self.unless_failed(self.image.height())
    }

    /// Resize the canvas
    ///
    /// With `preserve`, the overlapping top-left region of the old image is
    /// kept; otherwise the new canvas is blank. Keeping the current size
    /// with `preserve` set does nothing.
    pub fn set_dimension(&mut self, width: u32, height: u32, preserve: bool) -> PvrzResult<()> {
        self.check()?;
        if preserve && (width, height) == self.image.dimensions() {
            return Ok(());
        }
        if width == 0 || height == 0 {
            return self.fail(PvrzError::InvalidArguments(format!(
                "invalid texture dimension {width}x{height}"
            )));
        }

        let canvas = resize_canvas(&self.image, width, height, preserve);
        self.replace_image(canvas);
        Ok(())
    }

    /// Pixel format used on export
    pub fn pixel_format(&self) -> PixelFormat {
        self.unless_failed(self.header.pixel_format)
    }

    /// Set the pixel format used on export
    pub fn set_pixel_format(&mut self, format: PixelFormat) -> PvrzResult<()> {
        self.check()?;
        self.header.pixel_format = format;
        Ok(())
    }

    /// Set the pixel format from its raw header value (7, 9 or 11)
    pub fn set_pixel_format_raw(&mut self, value: u32) -> PvrzResult<()> {
        self.check()?;
        let format = self.parse_raw(value, PixelFormat::try_from)?;
        self.set_pixel_format(format)
    }

    /// Channel storage type
    pub fn channel_type(&self) -> ChannelType {
        self.unless_failed(self.header.channel_type)
    }

    /// Set the channel storage type
    pub fn set_channel_type(&mut self, channel_type: ChannelType) -> PvrzResult<()> {
        self.check()?;
        self.header.channel_type = channel_type;
        Ok(())
    }

    /// Set the channel storage type from its raw header value (0 to 3)
    pub fn set_channel_type_raw(&mut self, value: u32) -> PvrzResult<()> {
        self.check()?;
        let channel_type = self.parse_raw(value, ChannelType::try_from)?;
        self.set_channel_type(channel_type)
    }

    /// Color space of the pixel data
    pub fn color_space(&self) -> ColorSpace {
        self.unless_failed(self.header.color_space)
    }

    /// Set the color space of the pixel data
    pub fn set_color_space(&mut self, color_space: ColorSpace) -> PvrzResult<()> {
        self.check()?;
        self.header.color_space = color_space;
        Ok(())
    }

    /// Set the color space from its raw header value (0 or 1)
    pub fn set_color_space_raw(&mut self, value: u32) -> PvrzResult<()> {
        self.check()?;
        let color_space = self.parse_raw(value, ColorSpace::try_from)?;
        self.set_color_space(color_space)
    }

    /// Header flags
    pub fn flags(&self) -> u32 {
        self.unless_failed(self.header.flags)
    }

    /// Set the header flags (see [`crate::FLAG_PREMULTIPLIED`])
    pub fn set_flags(&mut self, flags: u32) -> PvrzResult<()> {
        self.check()?;
        self.header.flags = flags;
        Ok(())
    }

    /// Opaque metadata stored between header and pixel data
    pub fn metadata(&self) -> &[u8] {
        match self.error {
            Some(_) => &[],
            None => self.header.metadata.as_slice(),
        }
    }

    /// Replace the metadata blob
    pub fn set_metadata(&mut self, metadata: Vec<u8>) -> PvrzResult<()> {
        self.check()?;
        self.header.metadata = metadata;
        Ok(())
    }

    /// Current encoding options
    pub fn options(&self) -> &EncodeOptions {
        &self.options
    }

    /// Replace all encoding options
    pub fn set_options(&mut self, options: EncodeOptions) -> PvrzResult<()> {
        self.check()?;
        self.options = options;
        Ok(())
    }

    /// Block encoding quality
    pub fn quality(&self) -> Quality {
        match self.error {
            Some(_) => Quality::Low,
            None => self.options.quality,
        }
    }

    /// Set the block encoding quality
    pub fn set_quality(&mut self, quality: Quality) -> PvrzResult<()> {
        self.check()?;
        self.options.quality = quality;
        Ok(())
    }

    /// Set the block encoding quality from its raw value (0 to 2)
    pub fn set_quality_raw(&mut self, value: i32) -> PvrzResult<()> {
        self.check()?;
        let quality = self.parse_raw(value, Quality::try_from)?;
        self.set_quality(quality)
    }

    /// Whether color fitting is weighted by alpha
    pub fn weight_by_alpha(&self) -> bool {
        self.unless_failed(self.options.weight_by_alpha)
    }

    /// Enable or disable alpha-weighted color fitting
    pub fn set_weight_by_alpha(&mut self, enable: bool) -> PvrzResult<()> {
        self.check()?;
        self.options.weight_by_alpha = enable;
        Ok(())
    }

    /// Whether the perceptual color metric is used
    pub fn perceptual_metric(&self) -> bool {
        self.unless_failed(self.options.perceptual_metric)
    }

    /// Enable or disable the perceptual color metric
    pub fn set_perceptual_metric(&mut self, enable: bool) -> PvrzResult<()> {
        self.check()?;
        self.options.perceptual_metric = enable;
        Ok(())
    }

    /// Zlib level used for PVRZ output
    pub fn compression_level(&self) -> CompressionLevel {
        self.unless_failed(self.options.compression_level)
    }

    /// Set the zlib level used for PVRZ output
    pub fn set_compression_level(&mut self, level: CompressionLevel) -> PvrzResult<()> {
        self.check()?;
        self.options.compression_level = level;
        Ok(())
    }

    /// Name of the block codec in use
    pub fn codec_name(&self) -> &str {
        self.codec.name()
    }

    fn check(&self) -> PvrzResult<()> {
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn fail<T>(&mut self, err: PvrzError) -> PvrzResult<T> {
        self.error = Some(err.clone());
        Err(err)
    }

    fn record<T>(&mut self, result: PvrzResult<T>) -> PvrzResult<T> {
        match result {
            Ok(value) => Ok(value),
            Err(err) => self.fail(err),
        }
    }

    /// `value`, or its type's default while an error is recorded
    fn unless_failed<T: Default>(&self, value: T) -> T {
        if self.error.is_some() {
            return T::default();
        }
        value
    }

    fn parse_raw<V, T>(
        &mut self,
        value: V,
        parse: impl FnOnce(V) -> PvrzResult<T>,
    ) -> PvrzResult<T> {
        match parse(value) {
            Ok(parsed) => Ok(parsed),
            Err(err) => self.fail(PvrzError::InvalidArguments(err.to_string())),
        }
    }

    fn require_inside(&mut self, rect: Rect, (width, height): (u32, u32), what: &str) -> PvrzResult<()> {
        if rect.fits_within(width, height) {
            return Ok(());
        }
        self.fail(PvrzError::InvalidArguments(format!(
            "{what} rectangle {}x{}+{}+{} exceeds {width}x{height} image",
            rect.width, rect.height, rect.x, rect.y
        )))
    }

    fn replace_image(&mut self, image: RgbaImage) {
        self.header.width = image.width();
        self.header.height = image.height();
        self.image = image;
    }

    /// Unwrap, parse and decode `data` without touching `self`
    fn decode_container(&self, data: Vec<u8>) -> PvrzResult<(PvrHeader, RgbaImage)> {
        let mut buf = ByteBuffer::wrap(data);
        let available = buf.buffer_length();
        if available < 4 {
            return Err(PvrzError::BufferTooSmall {
                needed: 4,
                available,
            });
        }

        if buf.get_u32(0)? != PVR_MAGIC {
            let declared = buf.get_i32(0)?;
            let size = usize::try_from(declared)
                .ok()
                .filter(|size| (HEADER_SIZE..=MAX_DECLARED_SIZE).contains(size))
                .ok_or(PvrzError::DeclaredSizeOutOfRange(declared))?;
            debug!("PVRZ wrapper detected, declared size {size}");
            if available <= 4 {
                return Err(PvrzError::BufferTooSmall {
                    needed: 5,
                    available,
                });
            }

            buf.decompress_replace_limited(4, available - 4, size)?;
            buf.delete_bytes(0, 4)?;
            let actual = buf.buffer_length();
            if actual < size {
                return Err(PvrzError::SizeMismatch {
                    declared: size,
                    actual,
                });
            }
        }

        let header = PvrHeader::parse(&mut buf)?;
        let offset = header.data_offset();
        let needed = offset
            + self
                .codec
                .storage_requirement(header.width, header.height, header.pixel_format);
        if buf.buffer_length() < needed {
            return Err(PvrzError::BufferTooSmall {
                needed,
                available: buf.buffer_length(),
            });
        }

        let image = self.codec.decode(
            &buf.as_bytes()[offset..needed],
            header.width,
            header.height,
            header.pixel_format,
        )?;
        Ok((header, image))
    }

    fn encode_container(&self, as_compressed: bool) -> PvrzResult<Vec<u8>> {
        let width = self.image.width().next_multiple_of(4);
        let height = self.image.height().next_multiple_of(4);
        let padded;
        let image = if (width, height) == self.image.dimensions() {
            &self.image
        } else {
            padded = resize_canvas(&self.image, width, height, true);
            &padded
        };

        let header = PvrHeader {
            width,
            height,
            ..self.header.clone()
        };
        let params = EncodeParams::from(&self.options);
        let payload = self.codec.encode(image, header.pixel_format, &params)?;

        let mut buf = header.write()?;
        let offset = buf.buffer_length();
        buf.insert_bytes(offset, payload.len())?;
        buf.put_bytes(offset, &payload)?;

        if as_compressed {
            let total = buf.buffer_length();
            let declared = u32::try_from(total).map_err(|_| {
                PvrzError::InvalidArguments(format!("texture too large for PVRZ: {total} bytes"))
            })?;
            buf.compress_replace(0, total, self.options.compression_level)?;
            buf.insert_bytes(0, 4)?;
            buf.put_u32(0, declared)?;
        }

        debug!(
            "Encoded {width}x{height} {:?} texture into {} bytes{}",
            header.pixel_format,
            buf.buffer_length(),
            if as_compressed { " (PVRZ)" } else { "" }
        );
        Ok(buf.into_inner())
    }
}

/// New canvas of the given size, optionally carrying over `image`'s
/// top-left content
fn resize_canvas(image: &RgbaImage, width: u32, height: u32, preserve: bool) -> RgbaImage {
    let mut canvas = RgbaImage::new(width, height);
    if preserve {
        imageops::replace(&mut canvas, image, 0, 0);
    }
    canvas
}
