//! Normalized rectangle geometry
//!
//! All coordinates are frame-relative in the [0, 1] range, matching the
//! coordinate space the text recognizer reports fragment bounds in.

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in normalized [0, 1] frame coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    /// Width
    pub w: f32,
    /// Height
    pub h: f32,
}

impl Rect {
    /// Create a new rectangle
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Right edge (x + width)
    pub fn max_x(&self) -> f32 {
        self.x + self.w
    }

    /// Bottom edge (y + height)
    pub fn max_y(&self) -> f32 {
        self.y + self.h
    }

    /// Whether two rectangles overlap at all
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.max_x()
            && other.x < self.max_x()
            && self.y < other.max_y()
            && other.y < self.max_y()
    }

    /// Smallest rectangle containing both
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let max_x = self.max_x().max(other.max_x());
        let max_y = self.max_y().max(other.max_y());
        Rect::new(x, y, max_x - x, max_y - y)
    }

    /// Height of the vertical overlap between two rectangles (0.0 if disjoint)
    pub fn vertical_overlap(&self, other: &Rect) -> f32 {
        let top = self.y.max(other.y);
        let bottom = self.max_y().min(other.max_y());
        (bottom - top).max(0.0)
    }

    /// Horizontal gap between two rectangles, measured between the nearest
    /// vertical edges. Negative when the rectangles overlap horizontally.
    pub fn horizontal_gap(&self, other: &Rect) -> f32 {
        if self.x <= other.x {
            other.x - self.max_x()
        } else {
            self.x - other.max_x()
        }
    }
}
