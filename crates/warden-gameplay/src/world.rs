//! World interfaces consumed by enemy agents.
//!
//! The engine's physics, navmesh, animation and UI systems stay outside this
//! crate. Agents only see them through the narrow traits below:
//! - [`SpatialQuery`]: ray casts and live target positions
//! - [`AgentBody`]: the per-agent movement, animation, impulse, health-bar and
//!   visual sinks
//! - [`PlayerDamage`]: the outgoing attack channel towards the player
//!
//! Mock implementations are provided for tests and headless harnesses.

use std::collections::HashMap;

use glam::Vec2;
use warden_common::{ray_circle_distance, ray_segment_distance, TargetHandle};

use crate::orientation::Pose;

/// A single intersection along a ray.
#[derive(Debug, Clone, PartialEq)]
pub struct RayHit {
    /// Distance from the ray origin.
    pub distance: f32,
    /// Tag of the collider that was hit.
    pub tag: String,
    /// Handle of the detectable body behind the collider, if any.
    pub target: Option<TargetHandle>,
}

/// Spatial queries against the physics world.
pub trait SpatialQuery {
    /// Casts a ray and returns every hit within `max_distance`, nearest first.
    fn cast_ray(&self, origin: Vec2, direction: Vec2, max_distance: f32) -> Vec<RayHit>;
    /// Current position of a target, or `None` if it no longer exists.
    fn target_position(&self, target: TargetHandle) -> Option<Vec2>;
}

/// Navigation agent driving the enemy's locomotion.
pub trait MovementSink {
    /// Current world position of the agent.
    fn position(&self) -> Vec2;
    /// Sets the navigation destination.
    fn set_destination(&mut self, destination: Vec2);
    /// Sets the navigation speed.
    fn set_speed(&mut self, speed: f32);
    /// Current navigation velocity.
    fn current_velocity(&self) -> Vec2;
}

/// Animation state machine parameters.
pub trait AnimationSink {
    /// Sets a boolean parameter.
    fn set_bool(&mut self, name: &str, value: bool);
    /// Fires a trigger parameter.
    fn fire_trigger(&mut self, name: &str);
}

/// Rigid body used for knockback.
pub trait ImpulseSink {
    /// Applies an instantaneous impulse.
    fn apply_impulse(&mut self, impulse: Vec2);
    /// Overwrites the body velocity.
    fn set_velocity(&mut self, velocity: Vec2);
}

/// Health bar bound to the agent.
pub trait HealthDisplay {
    /// Sets the displayed health fraction (0.0-1.0).
    fn set_health_fraction(&mut self, fraction: f32);
}

/// Sprite, attachment and light presentation.
pub trait VisualSink {
    /// Applies the pose computed this tick.
    fn apply_pose(&mut self, pose: &Pose);
}

/// Everything an agent owns in the engine.
pub trait AgentBody: MovementSink + AnimationSink + ImpulseSink + HealthDisplay + VisualSink {}

impl<T> AgentBody for T where T: MovementSink + AnimationSink + ImpulseSink + HealthDisplay + VisualSink {}

/// Receiver of enemy melee hits on the player.
pub trait PlayerDamage {
    /// Applies `amount` points of damage to the player.
    fn apply_damage_to_player(&mut self, amount: f32);
}

/// Shape of a mock collider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockShape {
    /// Circle collider.
    Circle {
        /// Center
        center: Vec2,
        /// Radius
        radius: f32,
    },
    /// Thin wall segment.
    Segment {
        /// Start point
        a: Vec2,
        /// End point
        b: Vec2,
    },
}

/// Collider registered in a [`MockSpatial`].
#[derive(Debug, Clone, PartialEq)]
pub struct MockCollider {
    /// Collider geometry
    pub shape: MockShape,
    /// Collider tag
    pub tag: String,
    /// Target handle for detectable bodies
    pub target: Option<TargetHandle>,
}

/// Mock spatial world for testing.
#[derive(Debug, Default)]
pub struct MockSpatial {
    colliders: Vec<MockCollider>,
    targets: HashMap<TargetHandle, Vec2>,
    ray_count: std::cell::Cell<usize>,
}

impl MockSpatial {
    /// Creates an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a wall segment with the given tag.
    pub fn add_wall(&mut self, a: Vec2, b: Vec2, tag: &str) {
        self.colliders.push(MockCollider {
            shape: MockShape::Segment { a, b },
            tag: tag.to_string(),
            target: None,
        });
    }

    /// Adds a circular obstacle with the given tag.
    pub fn add_circle(&mut self, center: Vec2, radius: f32, tag: &str) {
        self.colliders.push(MockCollider {
            shape: MockShape::Circle { center, radius },
            tag: tag.to_string(),
            target: None,
        });
    }

    /// Adds a detectable target body and returns its handle.
    pub fn add_target(&mut self, position: Vec2, radius: f32, tag: &str) -> TargetHandle {
        let handle = TargetHandle::new();
        self.colliders.push(MockCollider {
            shape: MockShape::Circle {
                center: position,
                radius,
            },
            tag: tag.to_string(),
            target: Some(handle),
        });
        self.targets.insert(handle, position);
        handle
    }

    /// Moves a target body.
    pub fn move_target(&mut self, handle: TargetHandle, position: Vec2) {
        if let Some(pos) = self.targets.get_mut(&handle) {
            *pos = position;
        }
        for collider in &mut self.colliders {
            if collider.target == Some(handle) {
                if let MockShape::Circle { center, .. } = &mut collider.shape {
                    *center = position;
                }
            }
        }
    }

    /// Removes a target body entirely, invalidating its handle.
    pub fn remove_target(&mut self, handle: TargetHandle) {
        self.targets.remove(&handle);
        self.colliders.retain(|c| c.target != Some(handle));
    }

    /// Number of rays cast so far.
    #[must_use]
    pub fn ray_count(&self) -> usize {
        self.ray_count.get()
    }
}

impl SpatialQuery for MockSpatial {
    fn cast_ray(&self, origin: Vec2, direction: Vec2, max_distance: f32) -> Vec<RayHit> {
        self.ray_count.set(self.ray_count.get() + 1);

        let mut hits: Vec<RayHit> = self
            .colliders
            .iter()
            .filter_map(|collider| {
                let distance = match collider.shape {
                    MockShape::Circle { center, radius } => {
                        ray_circle_distance(origin, direction, center, radius)
                    },
                    MockShape::Segment { a, b } => ray_segment_distance(origin, direction, a, b),
                }?;
                (distance <= max_distance).then(|| RayHit {
                    distance,
                    tag: collider.tag.clone(),
                    target: collider.target,
                })
            })
            .collect();

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    fn target_position(&self, target: TargetHandle) -> Option<Vec2> {
        self.targets.get(&target).copied()
    }
}

/// Mock agent body recording every command it receives.
#[derive(Debug, Default)]
pub struct MockBody {
    /// Current position
    pub position: Vec2,
    /// Current velocity
    pub velocity: Vec2,
    /// Every destination issued, oldest first
    pub destinations: Vec<Vec2>,
    /// Last speed set
    pub speed: f32,
    /// Animation booleans
    pub bools: HashMap<String, bool>,
    /// Fired animation triggers, oldest first
    pub triggers: Vec<String>,
    /// Applied impulses, oldest first
    pub impulses: Vec<Vec2>,
    /// Velocity overwrites, oldest first
    pub velocity_sets: Vec<Vec2>,
    /// Last displayed health fraction
    pub health_fraction: Option<f32>,
    /// Last applied pose
    pub pose: Option<Pose>,
}

impl MockBody {
    /// Creates a body at the given position.
    #[must_use]
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Last destination issued.
    #[must_use]
    pub fn last_destination(&self) -> Option<Vec2> {
        self.destinations.last().copied()
    }

    /// Number of times a trigger was fired.
    #[must_use]
    pub fn trigger_count(&self, name: &str) -> usize {
        self.triggers.iter().filter(|t| t.as_str() == name).count()
    }

    /// Current value of an animation boolean.
    #[must_use]
    pub fn bool_value(&self, name: &str) -> Option<bool> {
        self.bools.get(name).copied()
    }
}

impl MovementSink for MockBody {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn set_destination(&mut self, destination: Vec2) {
        self.destinations.push(destination);
    }

    fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    fn current_velocity(&self) -> Vec2 {
        self.velocity
    }
}

impl AnimationSink for MockBody {
    fn set_bool(&mut self, name: &str, value: bool) {
        self.bools.insert(name.to_string(), value);
    }

    fn fire_trigger(&mut self, name: &str) {
        self.triggers.push(name.to_string());
    }
}

impl ImpulseSink for MockBody {
    fn apply_impulse(&mut self, impulse: Vec2) {
        self.impulses.push(impulse);
        self.velocity += impulse;
    }

    fn set_velocity(&mut self, velocity: Vec2) {
        self.velocity_sets.push(velocity);
        self.velocity = velocity;
    }
}

impl HealthDisplay for MockBody {
    fn set_health_fraction(&mut self, fraction: f32) {
        self.health_fraction = Some(fraction);
    }
}

impl VisualSink for MockBody {
    fn apply_pose(&mut self, pose: &Pose) {
        self.pose = Some(*pose);
    }
}

/// Mock player recording received damage.
#[derive(Debug, Default)]
pub struct MockPlayer {
    /// Damage amounts received, oldest first
    pub hits: Vec<f32>,
}

impl PlayerDamage for MockPlayer {
    fn apply_damage_to_player(&mut self, amount: f32) {
        self.hits.push(amount);
    }
}
