//! Facing and attachment mirroring.
//!
//! Each fixed tick the agent turns towards its active target (the chased
//! target when following, the patrol destination otherwise) by flipping its
//! sprite horizontally. Attached visuals are mirrored about the agent's local
//! origin so they keep the same offset magnitude on whichever side they land.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// A visual element mounted on the agent (weapon, drop shadow).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    /// Local offset from the agent origin.
    pub offset: Vec2,
    /// Whether the attachment sprite is mirrored.
    pub flip_x: bool,
    /// Whether the attachment is drawn.
    pub visible: bool,
}

impl Attachment {
    /// Creates a visible, unflipped attachment at the given offset.
    #[must_use]
    pub const fn new(offset: Vec2) -> Self {
        Self {
            offset,
            flip_x: false,
            visible: true,
        }
    }

    /// Mirrors a held weapon: it sits on the side the agent faces.
    pub fn mirror_weapon(&mut self, faces_right: bool) {
        self.flip_x = !faces_right;
        let x = self.offset.x.abs();
        self.offset.x = if faces_right { x } else { -x };
    }

    /// Mirrors a drop shadow: it trails on the side opposite the facing.
    pub fn mirror_shadow(&mut self, faces_right: bool) {
        self.flip_x = faces_right;
        let x = self.offset.x.abs();
        self.offset.x = if faces_right { -x } else { x };
    }
}

/// Sight cone indicator drawn around a patrolling agent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SightIndicator {
    /// Outer radius of the indicator.
    pub outer_radius: f32,
    /// Z rotation in degrees (heading minus 90, the indicator art points up).
    pub rotation_degrees: f32,
}

impl SightIndicator {
    /// Builds an indicator for a heading in degrees.
    #[must_use]
    pub fn for_heading(outer_radius: f32, heading_degrees: f32) -> Self {
        Self {
            outer_radius,
            rotation_degrees: heading_degrees - 90.0,
        }
    }
}

/// Everything the presentation layer needs to draw the agent this tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    /// Main sprite horizontal flip.
    pub flip_x: bool,
    /// Weapon attachment, if mounted.
    pub weapon: Option<Attachment>,
    /// Shadow attachment, if mounted.
    pub shadow: Option<Attachment>,
    /// Whether the agent's own light is on.
    pub self_light: bool,
    /// Sight indicator, if enabled.
    pub sight_indicator: Option<SightIndicator>,
}

/// Returns true when a target at `offset` (agent minus target) lies to the right.
#[must_use]
pub fn faces_right(offset: Vec2) -> bool {
    offset.x < 0.0
}

/// Applies the facing derived from `offset` to the mounted attachments and
/// returns the sprite flip.
pub fn orient(offset: Vec2, weapon: Option<&mut Attachment>, shadow: Option<&mut Attachment>) -> bool {
    let right = faces_right(offset);

    if let Some(weapon) = weapon {
        weapon.mirror_weapon(right);
    }
    if let Some(shadow) = shadow {
        shadow.mirror_shadow(right);
    }

    right
}
