//! Rotation math between canonical and display page space
//!
//! Canonical space is normalized `[0, 1]` relative to the *unrotated* page,
//! origin top-left, y growing downward. Display space is the same page after
//! the active clockwise rotation has been applied, again normalized to the
//! rotated page's own width/height.
//!
//! Stored geometry only ever lives in canonical space. Reading for display goes
//! through [`to_display`]; writing a dragged/resized rect back goes through
//! [`to_canonical`].

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle, origin top-left
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Whether `other` lies entirely inside this rect (edges inclusive, with `eps` slack)
    pub fn contains(&self, other: &Rect, eps: f64) -> bool {
        other.x >= self.x - eps
            && other.y >= self.y - eps
            && other.right() <= self.right() + eps
            && other.bottom() <= self.bottom() + eps
    }

    pub fn approx_eq(&self, other: &Rect, eps: f64) -> bool {
        (self.x - other.x).abs() <= eps
            && (self.y - other.y).abs() <= eps
            && (self.width - other.width).abs() <= eps
            && (self.height - other.height).abs() <= eps
    }
}

/// Clockwise page rotation, always one of the four quadrants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

/// Normalize any degree value into `0..360`
pub fn normalize_degrees(degrees: i64) -> i64 {
    degrees.rem_euclid(360)
}

impl Rotation {
    /// Build from arbitrary degrees. Values are normalized modulo 360 and
    /// snapped to the nearest quadrant (PDF viewers ignore non-multiples of 90).
    pub fn from_degrees(degrees: i64) -> Self {
        match ((normalize_degrees(degrees) + 45) / 90) % 4 {
            0 => Rotation::Deg0,
            1 => Rotation::Deg90,
            2 => Rotation::Deg180,
            _ => Rotation::Deg270,
        }
    }

    pub fn degrees(self) -> i64 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// Additive composition, as used when a delta is applied on top of a page's own rotation
    pub fn plus(self, other: Rotation) -> Rotation {
        Rotation::from_degrees(self.degrees() + other.degrees())
    }

    /// At 90/270 the displayed page is the unrotated page turned on its side
    pub fn swaps_axes(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }

    pub const ALL: [Rotation; 4] = [
        Rotation::Deg0,
        Rotation::Deg90,
        Rotation::Deg180,
        Rotation::Deg270,
    ];
}

/// Canonical -> display
pub fn to_display(rect: Rect, rotation: Rotation) -> Rect {
    let Rect {
        x,
        y,
        width: w,
        height: h,
    } = rect;
    match rotation {
        Rotation::Deg0 => rect,
        Rotation::Deg90 => Rect::new(1.0 - y - h, x, h, w),
        Rotation::Deg180 => Rect::new(1.0 - x - w, 1.0 - y - h, w, h),
        Rotation::Deg270 => Rect::new(y, 1.0 - x - w, h, w),
    }
}

/// Display -> canonical; exact inverse of [`to_display`] for the same rotation
pub fn to_canonical(rect: Rect, rotation: Rotation) -> Rect {
    let Rect {
        x,
        y,
        width: w,
        height: h,
    } = rect;
    match rotation {
        Rotation::Deg0 => rect,
        Rotation::Deg90 => Rect::new(y, 1.0 - x - w, h, w),
        Rotation::Deg180 => Rect::new(1.0 - x - w, 1.0 - y - h, w, h),
        Rotation::Deg270 => Rect::new(1.0 - y - h, x, h, w),
    }
}
