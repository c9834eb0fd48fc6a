use serde::{Deserialize, Serialize};
use std::fmt;

/// Axis-aligned pixel rectangle in corner form.
///
/// Invariant: `x1 < x2` and `y1 < y2`. Construct through [`BoundingBox::new`]
/// or [`BoundingBox::from_center`] to keep it that way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl BoundingBox {
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Option<BoundingBox> {
        if x1 < x2 && y1 < y2 {
            Some(BoundingBox { x1, y1, x2, y2 })
        } else {
            None
        }
    }

    /// Build a corner box from the centered form some detection oracles
    /// report (center point plus width/height). Coordinates are truncated
    /// to whole pixels; corners falling left of or above the image origin
    /// clamp to zero.
    pub fn from_center(cx: f64, cy: f64, width: f64, height: f64) -> Option<BoundingBox> {
        let x1 = (cx - width / 2.0).max(0.0) as u32;
        let y1 = (cy - height / 2.0).max(0.0) as u32;
        let x2 = (cx + width / 2.0).max(0.0) as u32;
        let y2 = (cy + height / 2.0).max(0.0) as u32;
        BoundingBox::new(x1, y1, x2, y2)
    }

    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width()) * u64::from(self.height())
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})-({},{})", self.x1, self.y1, self.x2, self.y2)
    }
}
