//! Field-of-view perception.
//!
//! Each fixed tick an agent sweeps rays across its sight cone and reports the
//! first target it can see. Rays are cast at fixed angular increments from
//! the low edge of the cone to the high edge (inclusive). Along each ray the
//! hits are walked nearest first: a blocking collider ends the sample unless
//! wall penetration is enabled, and a player-tagged collider ends it with a
//! sighting if it carries a target handle.

use glam::Vec2;
use warden_common::{direction_from_degrees, heading_between, TargetHandle};

use crate::world::SpatialQuery;

/// Angle between consecutive sight rays in degrees.
pub const SWEEP_STEP_DEGREES: f32 = 2.5;

/// Half-width of a directional sight cone in degrees.
pub const CONE_HALF_ANGLE_DEGREES: f32 = 45.0;

/// Angular range swept by a scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SightCone {
    /// Low edge in degrees
    pub min_degrees: f32,
    /// High edge in degrees
    pub max_degrees: f32,
}

impl SightCone {
    /// All-around sight.
    #[must_use]
    pub const fn full() -> Self {
        Self {
            min_degrees: 0.0,
            max_degrees: 360.0,
        }
    }

    /// Cone of ±45° around `heading_degrees`.
    #[must_use]
    pub fn around(heading_degrees: f32) -> Self {
        Self {
            min_degrees: heading_degrees - CONE_HALF_ANGLE_DEGREES,
            max_degrees: heading_degrees + CONE_HALF_ANGLE_DEGREES,
        }
    }

    /// Picks the cone for an agent.
    #[must_use]
    pub fn for_agent(directional: bool, heading_degrees: f32) -> Self {
        if directional {
            Self::around(heading_degrees)
        } else {
            Self::full()
        }
    }

    /// Number of rays cast for this cone.
    #[must_use]
    pub fn sample_count(&self) -> usize {
        let span = (self.max_degrees - self.min_degrees).max(0.0);
        (span / SWEEP_STEP_DEGREES).floor() as usize + 1
    }

    /// Ray angles in sweep order.
    pub fn angles(&self) -> impl Iterator<Item = f32> {
        let min = self.min_degrees;
        (0..self.sample_count()).map(move |i| min + i as f32 * SWEEP_STEP_DEGREES)
    }
}

/// Per-agent scan parameters.
#[derive(Debug, Clone, Copy)]
pub struct SightParams<'a> {
    /// Ray length
    pub max_distance: f32,
    /// Substring identifying a player collider tag
    pub player_tag: &'a str,
    /// Tags that block sight
    pub blocking_tags: &'a [String],
    /// Ignore blocking colliders
    pub look_behind_walls: bool,
}

impl SightParams<'_> {
    fn blocks(&self, tag: &str) -> bool {
        !self.look_behind_walls && self.blocking_tags.iter().any(|t| t == tag)
    }
}

/// A successful scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sighting {
    /// Target that was seen
    pub target: TargetHandle,
    /// Angle of the ray that saw it, in degrees
    pub angle_degrees: f32,
    /// Distance along that ray
    pub distance: f32,
}

/// Heading the agent is looking along.
///
/// Uses the direction to the sighted target when its position resolves,
/// otherwise the direction to `destination`, otherwise 0°.
pub fn reference_heading<S>(
    spatial: &S,
    origin: Vec2,
    destination: Option<Vec2>,
    sighted: Option<TargetHandle>,
) -> f32
where
    S: SpatialQuery + ?Sized,
{
    let mut heading = destination.map_or(0.0, |d| heading_between(origin, d));

    if let Some(position) = sighted.and_then(|t| spatial.target_position(t)) {
        heading = heading_between(origin, position);
    }

    heading
}

/// Sweeps `cone` from `origin` and returns the first target seen.
pub fn scan_for_target<S>(spatial: &S, origin: Vec2, cone: SightCone, params: &SightParams<'_>) -> Option<Sighting>
where
    S: SpatialQuery + ?Sized,
{
    for angle in cone.angles() {
        let direction = direction_from_degrees(angle);

        for hit in spatial.cast_ray(origin, direction, params.max_distance) {
            if params.blocks(&hit.tag) {
                break;
            }

            if hit.tag.contains(params.player_tag) {
                if let Some(target) = hit.target {
                    return Some(Sighting {
                        target,
                        angle_degrees: angle,
                        distance: hit.distance,
                    });
                }
                break;
            }
        }
    }

    None
}
