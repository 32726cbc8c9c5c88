//! Encoding configuration for texture export

use ietools_buffers::CompressionLevel;
use serde::{Deserialize, Serialize};

use crate::error::PvrzError;

/// Pixel block encoding quality
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quality {
    /// Fastest, lowest quality (range fit)
    Low,
    /// Balanced quality and speed (cluster fit)
    #[default]
    Default,
    /// Slowest, highest quality (iterative cluster fit)
    High,
}

impl TryFrom<i32> for Quality {
    type Error = PvrzError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Low),
            1 => Ok(Self::Default),
            2 => Ok(Self::High),
            _ => Err(PvrzError::InvalidArguments(format!(
                "quality must be 0, 1 or 2, got {value}"
            ))),
        }
    }
}

impl Quality {
    /// Raw quality value
    pub fn as_raw(self) -> i32 {
        match self {
            Self::Low => 0,
            Self::Default => 1,
            Self::High => 2,
        }
    }
}

/// Settings applied when a texture is serialized
///
/// None of these settings are stored in the container itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeOptions {
    /// Block encoding quality
    pub quality: Quality,

    /// Weight color error by pixel alpha (improves alpha-blended images)
    pub weight_by_alpha: bool,

    /// Use perceptual instead of uniform color weights
    pub perceptual_metric: bool,

    /// Zlib level used for PVRZ output
    pub compression_level: CompressionLevel,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            quality: Quality::Default,
            weight_by_alpha: false,
            perceptual_metric: false,
            compression_level: CompressionLevel::BEST,
        }
    }
}

impl EncodeOptions {
    /// Create options with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the block encoding quality
    #[must_use]
    pub const fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    /// Enable or disable alpha-weighted color fitting
    #[must_use]
    pub const fn with_weight_by_alpha(mut self, enable: bool) -> Self {
        self.weight_by_alpha = enable;
        self
    }

    /// Enable or disable the perceptual color metric
    #[must_use]
    pub const fn with_perceptual_metric(mut self, enable: bool) -> Self {
        self.perceptual_metric = enable;
        self
    }

    /// Set the zlib level used for PVRZ output
    #[must_use]
    pub const fn with_compression_level(mut self, level: CompressionLevel) -> Self {
        self.compression_level = level;
        self
    }
}
