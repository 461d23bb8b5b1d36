#![forbid(unsafe_code)]

//! Board-space geometry: points/sizes and axis-aligned bounds.

use std::fmt;
use std::ops::{Add, Sub};

/// A 2D point or size in board coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
}

impl Vector {
    pub const ZERO: Self = Self::new(0.0, 0.0);

    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Multiply both components by a scalar.
    #[must_use]
    pub fn multiply(self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    /// Component-wise product.
    #[must_use]
    pub fn scale(self, other: Self) -> Self {
        Self::new(self.x * other.x, self.y * other.y)
    }

    /// Component-wise quotient. Zero components of `other` yield zero.
    #[must_use]
    pub fn divide_by(self, other: Self) -> Self {
        let div = |a: f64, b: f64| if b == 0.0 { 0.0 } else { a / b };
        Self::new(div(self.x, other.x), div(self.y, other.y))
    }

    /// Component-wise maximum.
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y))
    }

    /// `(x, y)` with a fixed number of decimals.
    #[must_use]
    pub fn to_rounded_string(self, decimals: usize) -> String {
        // Adding 0.0 turns -0.0 into 0.0.
        let x = self.x + 0.0;
        let y = self.y + 0.0;
        format!("({x:.decimals$}, {y:.decimals$})")
    }
}

impl Add for Vector {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vector {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Rounded to whole units: `(10, -3)`.
impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let x = self.x.round() + 0.0;
        let y = self.y.round() + 0.0;
        write!(f, "({x}, {y})")
    }
}

/// Axis-aligned rectangle given by its edges.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Bounds {
    #[must_use]
    pub const fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    #[must_use]
    pub fn from_rect(location: Vector, dimensions: Vector) -> Self {
        Self::new(
            location.x,
            location.y,
            location.x + dimensions.x,
            location.y + dimensions.y,
        )
    }

    /// Smallest bounds containing every rectangle, empty bounds at the origin
    /// for no input.
    #[must_use]
    pub fn enclosing(rects: impl IntoIterator<Item = Self>) -> Self {
        rects
            .into_iter()
            .reduce(|a, b| {
                Self::new(
                    a.left.min(b.left),
                    a.top.min(b.top),
                    a.right.max(b.right),
                    a.bottom.max(b.bottom),
                )
            })
            .unwrap_or_default()
    }

    #[must_use]
    pub fn top_left(&self) -> Vector {
        Vector::new(self.left, self.top)
    }

    #[must_use]
    pub fn bottom_right(&self) -> Vector {
        Vector::new(self.right, self.bottom)
    }

    #[must_use]
    pub fn dimensions(&self) -> Vector {
        self.bottom_right() - self.top_left()
    }
}
