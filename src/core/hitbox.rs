//! Hitboxes
//!
//! A hitbox is a tagged union over the two shapes the game uses:
//! circles (players, projectiles, obstacles) and axis-aligned
//! rectangles (view regions, world bounds). The hitbox is the single
//! source of truth for an entity's position; entities derive their
//! position from it rather than keeping a second mutable copy.

use crate::core::collision::{
    check_circle_circle, check_rect_circle, check_rect_rect, circle_circle_intersection,
    line_intersects_circle, line_intersects_rect, rect_circle_intersection,
    rect_rect_intersection, Intersection, LineIntersection,
};
use crate::core::vec2::Vec2;

/// Collision shape carried by every entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Hitbox {
    /// Circle with a center position and radius.
    Circle {
        /// Center of the circle.
        position: Vec2,
        /// Radius of the circle.
        radius: f32,
    },
    /// Axis-aligned rectangle.
    Rect {
        /// Minimum corner.
        min: Vec2,
        /// Maximum corner.
        max: Vec2,
    },
}

impl Hitbox {
    /// Create a circle hitbox.
    pub const fn circle(position: Vec2, radius: f32) -> Self {
        Self::Circle { position, radius }
    }

    /// Create a rectangle hitbox from corners.
    pub const fn rect(min: Vec2, max: Vec2) -> Self {
        Self::Rect { min, max }
    }

    /// Create a rectangle hitbox covering the bounds of a circle.
    pub fn rect_from_circle(radius: f32, position: Vec2) -> Self {
        Self::Rect {
            min: Vec2::new(position.x - radius, position.y - radius),
            max: Vec2::new(position.x + radius, position.y + radius),
        }
    }

    /// Create a rectangle hitbox spanning a line segment.
    pub fn rect_from_line(a: Vec2, b: Vec2) -> Self {
        Self::Rect {
            min: Vec2::new(a.x.min(b.x), a.y.min(b.y)),
            max: Vec2::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Check if this hitbox collides with another one.
    pub fn collides_with(&self, that: &Hitbox) -> bool {
        match (*self, *that) {
            (
                Self::Circle { position, radius },
                Self::Circle {
                    position: p2,
                    radius: r2,
                },
            ) => check_circle_circle(p2, r2, position, radius),
            (Self::Circle { position, radius }, Self::Rect { min, max })
            | (Self::Rect { min, max }, Self::Circle { position, radius }) => {
                check_rect_circle(min, max, position, radius)
            }
            (
                Self::Rect { min, max },
                Self::Rect {
                    min: min2,
                    max: max2,
                },
            ) => check_rect_rect(min2, max2, min, max),
        }
    }

    /// Compute the separation between this hitbox and another.
    ///
    /// The returned direction points from `self` toward `that`.
    pub fn intersection(&self, that: &Hitbox) -> Option<Intersection> {
        match (*self, *that) {
            (
                Self::Circle { position, radius },
                Self::Circle {
                    position: p2,
                    radius: r2,
                },
            ) => circle_circle_intersection(position, radius, p2, r2),
            (Self::Circle { position, radius }, Self::Rect { min, max }) => {
                // Flip: the primitive pushes the circle away from the rect.
                rect_circle_intersection(min, max, position, radius).map(|ix| Intersection {
                    dir: ix.dir.invert(),
                    pen: ix.pen,
                })
            }
            (Self::Rect { min, max }, Self::Circle { position, radius }) => {
                rect_circle_intersection(min, max, position, radius)
            }
            (
                Self::Rect { min, max },
                Self::Rect {
                    min: min2,
                    max: max2,
                },
            ) => rect_rect_intersection(min, max, min2, max2),
        }
    }

    /// Bounding rectangle as `(min, max)` corners.
    pub fn to_rect(&self) -> (Vec2, Vec2) {
        match *self {
            Self::Circle { position, radius } => (
                Vec2::new(position.x - radius, position.y - radius),
                Vec2::new(position.x + radius, position.y + radius),
            ),
            Self::Rect { min, max } => (min, max),
        }
    }

    /// Geometric center. Entities use this as their position.
    pub fn center(&self) -> Vec2 {
        match *self {
            Self::Circle { position, .. } => position,
            Self::Rect { min, max } => min.add(max.sub(min).mul(0.5)),
        }
    }

    /// Move this hitbox by a delta.
    pub fn translate(&mut self, delta: Vec2) {
        match self {
            Self::Circle { position, .. } => *position = position.add(delta),
            Self::Rect { min, max } => {
                *min = min.add(delta);
                *max = max.add(delta);
            }
        }
    }

    /// Move this hitbox so its center lands on `center`.
    pub fn set_center(&mut self, center: Vec2) {
        let delta = center.sub(self.center());
        self.translate(delta);
    }

    /// Check whether a point lies inside this hitbox.
    pub fn contains_point(&self, point: Vec2) -> bool {
        match *self {
            Self::Circle { position, radius } => point.distance(position) < radius,
            Self::Rect { min, max } => {
                point.x > min.x && point.y > min.y && point.x < max.x && point.y < max.y
            }
        }
    }

    /// Check whether a segment from `a` to `b` intersects this hitbox.
    pub fn intersects_line(&self, a: Vec2, b: Vec2) -> Option<LineIntersection> {
        match *self {
            Self::Circle { position, radius } => line_intersects_circle(a, b, position, radius),
            Self::Rect { min, max } => line_intersects_rect(a, b, min, max),
        }
    }

    /// Scale this hitbox in place around its center.
    pub fn scale(&mut self, scale: f32) {
        match self {
            Self::Circle { radius, .. } => *radius *= scale,
            Self::Rect { min, max } => {
                let center = min.add(max.sub(*min).mul(0.5));
                *min = min.sub(center).mul(scale).add(center);
                *max = max.sub(center).mul(scale).add(center);
            }
        }
    }
}
