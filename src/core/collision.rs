//! Collision Predicates
//!
//! Exact geometric tests between circles, rectangles, and line
//! segments. The spatial grid narrows candidates (broad-phase); these
//! functions decide the actual overlap and how to separate it.
//!
//! Separation is positional only: `Intersection` carries the direction
//! to push the second shape and the penetration depth. Axis ties
//! resolve to the x-axis.

use crate::core::vec2::Vec2;

/// Result of an overlap test: direction to separate along and
/// penetration depth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    /// Unit direction pointing from the first shape toward the second.
    pub dir: Vec2,
    /// Overlap depth along `dir`.
    pub pen: f32,
}

/// Result of a segment intersection test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineIntersection {
    /// Point where the segment first enters the shape.
    pub point: Vec2,
    /// Surface normal at the intersection point.
    pub normal: Vec2,
}

/// Check whether two circles overlap.
#[inline]
pub fn check_circle_circle(pos1: Vec2, r1: f32, pos2: Vec2, r2: f32) -> bool {
    let a = r1 + r2;
    let d = pos1.sub(pos2);
    a * a > d.length_squared()
}

/// Check whether a rectangle and a circle overlap.
pub fn check_rect_circle(min: Vec2, max: Vec2, pos: Vec2, rad: f32) -> bool {
    let cpt = pos.clamp(min, max);
    let dist_sq = pos.sub(cpt).length_squared();
    dist_sq < rad * rad
        || (pos.x >= min.x && pos.x <= max.x && pos.y >= min.y && pos.y <= max.y)
}

/// Check whether two rectangles overlap.
#[inline]
pub fn check_rect_rect(min1: Vec2, max1: Vec2, min2: Vec2, max2: Vec2) -> bool {
    min2.x < max1.x && min2.y < max1.y && min1.x < max2.x && min1.y < max2.y
}

/// Overlap between two circles.
///
/// Returns the direction from the first circle toward the second and
/// the penetration depth, or `None` when they do not overlap.
pub fn circle_circle_intersection(
    pos0: Vec2,
    rad0: f32,
    pos1: Vec2,
    rad1: f32,
) -> Option<Intersection> {
    let r = rad0 + rad1;
    let to_p1 = pos1.sub(pos0);
    let dist_sq = to_p1.length_squared();
    if dist_sq < r * r {
        let dist = dist_sq.sqrt();
        Some(Intersection {
            dir: if dist > 1e-5 {
                to_p1.div(dist)
            } else {
                Vec2::RIGHT
            },
            pen: r - dist,
        })
    } else {
        None
    }
}

/// Overlap between a rectangle and a circle.
pub fn rect_circle_intersection(
    min: Vec2,
    max: Vec2,
    pos: Vec2,
    radius: f32,
) -> Option<Intersection> {
    if pos.x >= min.x && pos.x <= max.x && pos.y >= min.y && pos.y <= max.y {
        // Circle center inside the rect: push out along the axis with
        // the least remaining overlap. Equal overlaps resolve to x.
        let e = max.sub(min).mul(0.5);
        let c = min.add(e);
        let p = pos.sub(c);
        let xp = p.x.abs() - e.x - radius;
        let yp = p.y.abs() - e.y - radius;
        if xp >= yp {
            return Some(Intersection {
                dir: Vec2::new(if p.x > 0.0 { 1.0 } else { -1.0 }, 0.0),
                pen: -xp,
            });
        }
        return Some(Intersection {
            dir: Vec2::new(0.0, if p.y > 0.0 { 1.0 } else { -1.0 }),
            pen: -yp,
        });
    }

    let cpt = pos.clamp(min, max);
    let dir = pos.sub(cpt);
    let dist_sq = dir.length_squared();
    if dist_sq < radius * radius {
        let dist = dist_sq.sqrt();
        Some(Intersection {
            dir: if dist > 1e-4 { dir.div(dist) } else { Vec2::RIGHT },
            pen: radius - dist,
        })
    } else {
        None
    }
}

/// Overlap between two rectangles.
pub fn rect_rect_intersection(
    min0: Vec2,
    max0: Vec2,
    min1: Vec2,
    max1: Vec2,
) -> Option<Intersection> {
    let e0 = max0.sub(min0).mul(0.5);
    let c0 = min0.add(e0);
    let e1 = max1.sub(min1).mul(0.5);
    let c1 = min1.add(e1);
    let n = c1.sub(c0);
    let xo = e0.x + e1.x - n.x.abs();
    if xo > 0.0 {
        let yo = e0.y + e1.y - n.y.abs();
        if yo > 0.0 {
            // Equal overlaps resolve to the x-axis.
            if xo <= yo {
                return Some(Intersection {
                    dir: Vec2::new(if n.x < 0.0 { -1.0 } else { 1.0 }, 0.0),
                    pen: xo,
                });
            }
            return Some(Intersection {
                dir: Vec2::new(0.0, if n.y < 0.0 { -1.0 } else { 1.0 }),
                pen: yo,
            });
        }
    }
    None
}

/// Intersection of a segment with a circle.
///
/// Returns the entry point and normal, or `None` if the segment misses.
pub fn line_intersects_circle(s0: Vec2, s1: Vec2, pos: Vec2, rad: f32) -> Option<LineIntersection> {
    let mut d = s1.sub(s0);
    let len = d.length().max(1e-6);
    d = d.div(len);
    let m = s0.sub(pos);
    let b = m.dot(d);
    let c = m.dot(m) - rad * rad;
    if c > 0.0 && b > 0.0 {
        return None;
    }
    let disc_sq = b * b - c;
    if disc_sq < 0.0 {
        return None;
    }
    let disc = disc_sq.sqrt();
    let mut t = -b - disc;
    if t < 0.0 {
        t = -b + disc;
    }
    if t <= len {
        let point = s0.add(d.mul(t));
        Some(LineIntersection {
            point,
            normal: point.sub(pos).normalize(),
        })
    } else {
        None
    }
}

/// Intersection of a segment with a rectangle (slab method).
pub fn line_intersects_rect(s0: Vec2, s1: Vec2, min: Vec2, max: Vec2) -> Option<LineIntersection> {
    let mut tmin: f32 = 0.0;
    let mut tmax = f32::MAX;
    const EPS: f32 = 1e-5;
    let r = s0;
    let mut d = s1.sub(s0);
    let dist = d.length();
    d = if dist > EPS { d.div(dist) } else { Vec2::RIGHT };

    let mut abs_dx = d.x.abs();
    let mut abs_dy = d.y.abs();

    if abs_dx < EPS {
        d.x = EPS * 2.0;
        abs_dx = d.x;
    }
    if abs_dy < EPS {
        d.y = EPS * 2.0;
        abs_dy = d.y;
    }

    if abs_dx > EPS {
        let tx1 = (min.x - r.x) / d.x;
        let tx2 = (max.x - r.x) / d.x;
        tmin = tmin.max(tx1.min(tx2));
        tmax = tmax.min(tx1.max(tx2));
        if tmin > tmax {
            return None;
        }
    }
    if abs_dy > EPS {
        let ty1 = (min.y - r.y) / d.y;
        let ty2 = (max.y - r.y) / d.y;
        tmin = tmin.max(ty1.min(ty2));
        tmax = tmax.min(ty1.max(ty2));
        if tmin > tmax {
            return None;
        }
    }
    if tmin > dist {
        return None;
    }

    let point = s0.add(d.mul(tmin));
    let c = min.add(max.sub(min).mul(0.5));
    let p0 = point.sub(c);
    let d0 = min.sub(max).mul(0.5);

    let x = p0.x / d0.x.abs() * 1.001;
    let y = p0.y / d0.y.abs() * 1.001;
    let normal = Vec2::new(
        if x < 0.0 { x.ceil() } else { x.floor() },
        if y < 0.0 { y.ceil() } else { y.floor() },
    )
    .normalize_or(Vec2::RIGHT);

    Some(LineIntersection { point, normal })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circle_circle_overlap() {
        // distance 1.0, combined radius 1.2
        assert!(check_circle_circle(
            Vec2::ZERO,
            0.6,
            Vec2::new(1.0, 0.0),
            0.6
        ));
        assert!(!check_circle_circle(
            Vec2::ZERO,
            0.6,
            Vec2::new(2.0, 0.0),
            0.6
        ));
    }

    #[test]
    fn test_circle_circle_intersection_depth() {
        let ix = circle_circle_intersection(Vec2::ZERO, 1.0, Vec2::new(1.5, 0.0), 1.0).unwrap();
        assert!((ix.pen - 0.5).abs() < 1e-6);
        assert_eq!(ix.dir, Vec2::RIGHT);
    }

    #[test]
    fn test_circle_circle_no_overlap_is_none() {
        assert!(circle_circle_intersection(Vec2::ZERO, 1.0, Vec2::new(3.0, 0.0), 1.0).is_none());
        // touching exactly does not count as overlap
        assert!(circle_circle_intersection(Vec2::ZERO, 1.0, Vec2::new(2.0, 0.0), 1.0).is_none());
    }

    #[test]
    fn test_coincident_circles_fall_back_to_x_axis() {
        let ix = circle_circle_intersection(Vec2::ZERO, 1.0, Vec2::ZERO, 1.0).unwrap();
        assert_eq!(ix.dir, Vec2::RIGHT);
        assert!((ix.pen - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_rect_circle() {
        let min = Vec2::ZERO;
        let max = Vec2::new(10.0, 10.0);
        assert!(check_rect_circle(min, max, Vec2::new(5.0, 5.0), 1.0));
        assert!(check_rect_circle(min, max, Vec2::new(11.0, 5.0), 1.5));
        assert!(!check_rect_circle(min, max, Vec2::new(15.0, 5.0), 1.0));
    }

    #[test]
    fn test_rect_rect_tie_prefers_x_axis() {
        // Two unit squares overlapping equally on both axes.
        let ix = rect_rect_intersection(
            Vec2::ZERO,
            Vec2::new(2.0, 2.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(3.0, 3.0),
        )
        .unwrap();
        assert_eq!(ix.dir, Vec2::RIGHT);
        assert!((ix.pen - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_rect_rect_least_overlap_axis() {
        // Deep x overlap, shallow y overlap: separate along y.
        let ix = rect_rect_intersection(
            Vec2::ZERO,
            Vec2::new(10.0, 2.0),
            Vec2::new(1.0, 1.5),
            Vec2::new(9.0, 3.5),
        )
        .unwrap();
        assert_eq!(ix.dir.x, 0.0);
        assert_eq!(ix.dir.y, 1.0);
    }

    #[test]
    fn test_line_intersects_circle() {
        let hit = line_intersects_circle(
            Vec2::new(-5.0, 0.0),
            Vec2::new(5.0, 0.0),
            Vec2::ZERO,
            1.0,
        )
        .unwrap();
        assert!((hit.point.x - -1.0).abs() < 1e-4);
        assert!(hit.point.y.abs() < 1e-4);

        assert!(line_intersects_circle(
            Vec2::new(-5.0, 3.0),
            Vec2::new(5.0, 3.0),
            Vec2::ZERO,
            1.0
        )
        .is_none());
    }

    #[test]
    fn test_line_intersects_rect() {
        let hit = line_intersects_rect(
            Vec2::new(-5.0, 5.0),
            Vec2::new(5.0, 5.0),
            Vec2::ZERO,
            Vec2::new(10.0, 10.0),
        )
        .unwrap();
        assert!((hit.point.x).abs() < 1e-3);
        assert!((hit.normal.x - -1.0).abs() < 1e-3);
    }
}
