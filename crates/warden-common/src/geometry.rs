//! 2D geometry helpers shared by perception and the spatial world.
//!
//! Angles exposed by this module are in degrees, measured counter-clockwise
//! from +X, matching how sight cones are authored.

use glam::Vec2;

/// Rays shorter than this are treated as degenerate.
const EPSILON: f32 = 1e-6;

/// Heading of a direction vector in degrees (`atan2(y, x)`).
#[must_use]
pub fn heading_degrees(direction: Vec2) -> f32 {
    direction.y.atan2(direction.x).to_degrees()
}

/// Heading in degrees from `from` towards `to`.
#[must_use]
pub fn heading_between(from: Vec2, to: Vec2) -> f32 {
    heading_degrees(to - from)
}

/// Unit direction vector for a heading in degrees.
#[must_use]
pub fn direction_from_degrees(degrees: f32) -> Vec2 {
    let radians = degrees.to_radians();
    Vec2::new(radians.cos(), radians.sin())
}

/// Offset from `target` to `origin` (`origin - target`).
///
/// A negative `x` means the target lies to the right of the origin.
#[must_use]
pub fn target_offset(origin: Vec2, target: Vec2) -> Vec2 {
    origin - target
}

/// Distance along a ray to the first intersection with a circle.
///
/// `direction` must be normalized. A ray starting inside the circle hits at
/// distance zero.
#[must_use]
pub fn ray_circle_distance(origin: Vec2, direction: Vec2, center: Vec2, radius: f32) -> Option<f32> {
    let to_origin = origin - center;
    let c = to_origin.length_squared() - radius * radius;
    if c <= 0.0 {
        return Some(0.0);
    }

    let b = to_origin.dot(direction);
    if b > 0.0 {
        // Pointing away and outside.
        return None;
    }

    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }

    Some(-b - discriminant.sqrt())
}

/// Distance along a ray to its intersection with the segment `a..b`.
///
/// `direction` must be normalized. Parallel segments never intersect.
#[must_use]
pub fn ray_segment_distance(origin: Vec2, direction: Vec2, a: Vec2, b: Vec2) -> Option<f32> {
    let edge = b - a;
    let denom = direction.perp_dot(edge);
    if denom.abs() < EPSILON {
        return None;
    }

    let to_start = a - origin;
    let t = to_start.perp_dot(edge) / denom;
    let u = to_start.perp_dot(direction) / denom;

    if t >= 0.0 && (0.0..=1.0).contains(&u) {
        Some(t)
    } else {
        None
    }
}
