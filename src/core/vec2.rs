//! 2D Vector
//!
//! Plain `f32` vector math for game physics and geometry.
//! All operations are pure and return new values; vectors are
//! copied everywhere, never shared.

use std::fmt;
use std::ops::{Add, Neg, Sub};

/// A 2D vector with `f32` components.
#[derive(Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
}

impl Vec2 {
    /// Zero vector
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Unit vector pointing right (+X)
    pub const RIGHT: Self = Self { x: 1.0, y: 0.0 };

    /// Unit vector pointing up (+Y)
    pub const UP: Self = Self { x: 0.0, y: 1.0 };

    /// Create a new vector.
    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Add another vector.
    #[inline]
    pub fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }

    /// Subtract another vector.
    #[inline]
    pub fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }

    /// Scale by a scalar.
    #[inline]
    pub fn mul(self, n: f32) -> Self {
        Self::new(self.x * n, self.y * n)
    }

    /// Divide by a scalar.
    #[inline]
    pub fn div(self, n: f32) -> Self {
        Self::new(self.x / n, self.y / n)
    }

    /// Invert both components.
    #[inline]
    pub fn invert(self) -> Self {
        Self::new(-self.x, -self.y)
    }

    /// Rotate by an angle in radians.
    pub fn rotate(self, angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    /// Squared length (avoids sqrt - prefer this for comparisons).
    #[inline]
    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    /// Length (magnitude).
    #[inline]
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Distance to another point.
    #[inline]
    pub fn distance(self, other: Self) -> f32 {
        self.sub(other).length()
    }

    /// Dot product.
    #[inline]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Normalize to unit length. Vectors shorter than an epsilon are
    /// returned unchanged.
    pub fn normalize(self) -> Self {
        const EPS: f32 = 1e-6;
        let len = self.length();
        if len > EPS {
            self.div(len)
        } else {
            self
        }
    }

    /// Normalize to unit length, falling back to `fallback` for
    /// degenerate (near-zero) vectors.
    pub fn normalize_or(self, fallback: Self) -> Self {
        const EPS: f32 = 1e-6;
        let len = self.length();
        if len > EPS {
            self.div(len)
        } else {
            fallback
        }
    }

    /// Interpolate between two vectors. `t` ranges from 0 to 1.
    pub fn lerp(self, end: Self, t: f32) -> Self {
        self.mul(1.0 - t).add(end.mul(t))
    }

    /// Clamp both components into `[min, max]` per axis.
    pub fn clamp(self, min: Self, max: Self) -> Self {
        Self::new(self.x.clamp(min.x, max.x), self.y.clamp(min.y, max.y))
    }
}

impl Add for Vec2 {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Vec2::add(self, other)
    }
}

impl Sub for Vec2 {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Vec2::sub(self, other)
    }
}

impl Neg for Vec2 {
    type Output = Self;
    fn neg(self) -> Self {
        self.invert()
    }
}

impl fmt::Debug for Vec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3})", self.x, self.y)
    }
}
