//! Pixel rectangles with a top-left origin

/// Axis-aligned pixel rectangle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    /// Left edge
    pub x: u32,
    /// Top edge
    pub y: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Rect {
    /// Create a rectangle from its top-left corner and size
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle covering a whole `width` x `height` canvas
    pub const fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Whether the rectangle lies fully inside a `width` x `height` canvas
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        let right = self.x.checked_add(self.width);
        let bottom = self.y.checked_add(self.height);
        matches!((right, bottom), (Some(r), Some(b)) if r <= width && b <= height)
    }

    /// Whether the rectangle covers no pixels
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}
