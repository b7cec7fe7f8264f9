//! Box geometry in full-frame pixel coordinates.

use serde::{Deserialize, Serialize};

/// Axis-aligned box `(x1, y1, x2, y2)` in pixel coordinates of the
/// full, uncropped frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge
    pub x1: f64,
    /// Top edge
    pub y1: f64,
    /// Right edge
    pub x2: f64,
    /// Bottom edge
    pub y2: f64,
}

/// Integer pixel rectangle, always inside the frame it was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// Create a box from corner coordinates.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Convert a center-based `(cx, cy, width, height)` box to corners.
    pub fn from_center(cx: f64, cy: f64, width: f64, height: f64) -> Self {
        Self {
            x1: cx - width / 2.0,
            y1: cy - height / 2.0,
            x2: cx + width / 2.0,
            y2: cy + height / 2.0,
        }
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    /// Box area in pixels. Degenerate boxes have zero area.
    #[inline]
    pub fn area(&self) -> f64 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Shift the box by `(dx, dy)`.
    pub fn translate(&self, dx: f64, dy: f64) -> BoundingBox {
        BoundingBox {
            x1: self.x1 + dx,
            y1: self.y1 + dy,
            x2: self.x2 + dx,
            y2: self.y2 + dy,
        }
    }

    /// Integer corners, truncated toward zero.
    fn int_corners(&self) -> (i64, i64, i64, i64) {
        (
            self.x1.trunc() as i64,
            self.y1.trunc() as i64,
            self.x2.trunc() as i64,
            self.y2.trunc() as i64,
        )
    }

    /// Integer pixel rectangle clamped to a `frame_width x frame_height` frame.
    ///
    /// Returns `None` when nothing of the box remains inside the frame.
    pub fn to_pixel_rect(&self, frame_width: u32, frame_height: u32) -> Option<PixelRect> {
        let (x1, y1, x2, y2) = self.int_corners();
        clamp_rect(x1, y1, x2, y2, frame_width, frame_height)
    }

    /// Integer pixel rectangle grown on each side by `ratio` of the box's own
    /// width/height (truncated), then clamped to the frame.
    pub fn padded_pixel_rect(
        &self,
        frame_width: u32,
        frame_height: u32,
        ratio: f64,
    ) -> Option<PixelRect> {
        let (x1, y1, x2, y2) = self.int_corners();
        let pad_x = ((x2 - x1) as f64 * ratio).trunc() as i64;
        let pad_y = ((y2 - y1) as f64 * ratio).trunc() as i64;
        clamp_rect(
            x1 - pad_x,
            y1 - pad_y,
            x2 + pad_x,
            y2 + pad_y,
            frame_width,
            frame_height,
        )
    }
}

fn clamp_rect(
    x1: i64,
    y1: i64,
    x2: i64,
    y2: i64,
    frame_width: u32,
    frame_height: u32,
) -> Option<PixelRect> {
    let (fw, fh) = (frame_width as i64, frame_height as i64);
    let x1 = x1.clamp(0, fw);
    let y1 = y1.clamp(0, fh);
    let x2 = x2.clamp(0, fw);
    let y2 = y2.clamp(0, fh);

    if x2 <= x1 || y2 <= y1 {
        return None;
    }

    Some(PixelRect {
        x: x1 as u32,
        y: y1 as u32,
        width: (x2 - x1) as u32,
        height: (y2 - y1) as u32,
    })
}

impl PixelRect {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}
