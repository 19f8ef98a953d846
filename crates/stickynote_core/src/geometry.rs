//! Pure drag/resize transforms for note windows.
//!
//! # Responsibility
//! - Compute new positions and sizes from a gesture's start snapshot and the
//!   current pointer sample.
//!
//! # Invariants
//! - Results depend only on (start snapshot, current pointer), never on the
//!   previous sample, so replaying a sample is idempotent.
//! - Resized width/height never fall below the supplied minimums.
//! - Translation is unclamped; notes may leave the viewport.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// 2D point in host surface units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Component-wise `self - other`.
    pub fn delta_from(self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }

    pub fn offset(self, delta: Point) -> Point {
        Point::new(self.x + delta.x, self.y + delta.y)
    }
}

/// Window size in host surface units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Raises each dimension to its minimum.
    pub fn clamped(self, limits: SizeLimits) -> Size {
        Size::new(
            at_least(self.width, limits.min_width),
            at_least(self.height, limits.min_height),
        )
    }
}

/// Lower bounds applied by resize.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeLimits {
    pub min_width: f64,
    pub min_height: f64,
}

/// Position plus size of one window.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Geometry {
    pub position: Point,
    pub size: Size,
}

impl Geometry {
    pub const fn new(position: Point, size: Size) -> Self {
        Self { position, size }
    }
}

/// Resizable window edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResizeEdge {
    Left,
    Right,
    Bottom,
}

impl ResizeEdge {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Bottom => "bottom",
        }
    }
}

impl Display for ResizeEdge {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResizeEdge {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "bottom" => Ok(Self::Bottom),
            other => Err(format!(
                "unknown resize edge `{other}`; expected left|right|bottom"
            )),
        }
    }
}

/// Drag-translate: `start + (pointer - start_pointer)`.
pub fn translate(start: Point, start_pointer: Point, pointer: Point) -> Point {
    start.offset(pointer.delta_from(start_pointer))
}

/// Edge resize relative to the gesture's start geometry.
///
/// - `Right` grows with rightward pointer motion; `left` is untouched.
/// - `Left` grows with leftward motion and moves `left` so the right edge
///   stays anchored at `start.left + start.width`.
/// - `Bottom` grows with downward motion; `top` is untouched.
pub fn resize(
    edge: ResizeEdge,
    start: Geometry,
    start_pointer: Point,
    pointer: Point,
    limits: SizeLimits,
) -> Geometry {
    let delta = pointer.delta_from(start_pointer);
    let mut next = start;
    match edge {
        ResizeEdge::Right => {
            next.size.width = at_least(start.size.width + delta.x, limits.min_width);
        }
        ResizeEdge::Left => {
            let width = at_least(start.size.width - delta.x, limits.min_width);
            next.size.width = width;
            next.position.x = start.position.x + (start.size.width - width);
        }
        ResizeEdge::Bottom => {
            next.size.height = at_least(start.size.height + delta.y, limits.min_height);
        }
    }
    next
}

// f64::max would let NaN through as the minimum; treat NaN as "at minimum".
fn at_least(value: f64, min: f64) -> f64 {
    if value.is_nan() || value < min {
        min
    } else {
        value
    }
}
