//! Combat primitives for enemy agents.
//!
//! - [`Health`]: clamped health pool
//! - [`KnockbackStage`]: the two delayed stages of a knockback
//! - [`Regeneration`]: passive healing on a fixed interval with a hit cooldown
//! - [`AttackGate`]: melee cooldown while the player stays in contact

use glam::Vec2;
use serde::{Deserialize, Serialize};

// ============================================================================
// Health
// ============================================================================

/// Result of a health change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthChange {
    /// Health before the change
    pub previous: f32,
    /// Health after clamping
    pub current: f32,
}

impl HealthChange {
    /// Returns true if this change emptied the pool.
    #[must_use]
    pub fn is_lethal(&self) -> bool {
        self.previous > 0.0 && self.current <= 0.0
    }
}

/// Health pool clamped to `[0, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Health {
    current: f32,
    max: f32,
}

impl Health {
    /// Creates a full pool.
    #[must_use]
    pub fn new(max: f32) -> Self {
        let max = max.max(0.0);
        Self { current: max, max }
    }

    /// Current health.
    #[must_use]
    pub const fn current(&self) -> f32 {
        self.current
    }

    /// Maximum health.
    #[must_use]
    pub const fn max(&self) -> f32 {
        self.max
    }

    /// Current health as a fraction of the maximum (0.0-1.0).
    #[must_use]
    pub fn fraction(&self) -> f32 {
        if self.current > 0.0 && self.max > 0.0 {
            self.current / self.max
        } else {
            0.0
        }
    }

    /// Returns true if no health is left.
    #[must_use]
    pub fn is_depleted(&self) -> bool {
        self.current <= 0.0
    }

    /// Adds `delta` (negative hurts) and clamps the result.
    pub fn apply(&mut self, delta: f32) -> HealthChange {
        let previous = self.current;
        let next = previous + delta;
        // NaN deltas leave the pool unchanged.
        if !next.is_nan() {
            self.current = next.clamp(0.0, self.max);
        }
        HealthChange {
            previous,
            current: self.current,
        }
    }
}

// ============================================================================
// Knockback
// ============================================================================

/// Delayed stages of a knockback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KnockbackStage {
    /// Push the agent away from the attacker.
    Impulse {
        /// Attacker position when the hit landed
        attacker: Vec2,
        /// Impulse magnitude
        force: f32,
    },
    /// Stop the sliding body.
    Settle,
}

/// Impulse pushing a body at `position` away from `attacker`.
///
/// Coincident positions produce no impulse.
#[must_use]
pub fn knockback_impulse(position: Vec2, attacker: Vec2, force: f32) -> Vec2 {
    (position - attacker).normalize_or_zero() * force
}

// ============================================================================
// Regeneration
// ============================================================================

/// Passive healing clock.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Regeneration {
    increment_timer: f32,
    cooldown_timer: f32,
}

impl Regeneration {
    /// Creates a clock with both timers at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            increment_timer: 0.0,
            cooldown_timer: 0.0,
        }
    }

    /// Seconds since the last hit cooldown reset.
    #[must_use]
    pub const fn cooldown_elapsed(&self) -> f32 {
        self.cooldown_timer
    }

    /// Advances both timers.
    ///
    /// On every `interval` boundary a pending hit mark resets the cooldown
    /// and is consumed; otherwise, once the cooldown reaches `cooldown`, it
    /// restarts and the call returns true to request one healing step.
    pub fn tick(&mut self, dt: f32, interval: f32, cooldown: f32, being_attacked: &mut bool) -> bool {
        self.increment_timer += dt;
        self.cooldown_timer += dt;

        if self.increment_timer < interval {
            return false;
        }
        self.increment_timer = 0.0;

        if *being_attacked {
            self.cooldown_timer = 0.0;
            *being_attacked = false;
            return false;
        }

        if self.cooldown_timer >= cooldown {
            self.cooldown_timer = 0.0;
            return true;
        }

        false
    }
}

// ============================================================================
// Contact attacks
// ============================================================================

/// Melee cooldown while the player stays in contact.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AttackGate {
    last_attack: Option<f64>,
}

impl AttackGate {
    /// Starts the cooldown at `now`.
    pub fn arm(&mut self, now: f64) {
        self.last_attack = Some(now);
    }

    /// Returns the gate to idle.
    pub fn disarm(&mut self) {
        self.last_attack = None;
    }

    /// Time of the last strike or arming, `None` when idle.
    #[must_use]
    pub const fn last_attack(&self) -> Option<f64> {
        self.last_attack
    }

    /// Returns true and restarts the cooldown if a strike is allowed at `now`.
    pub fn try_strike(&mut self, now: f64, cooldown: f32) -> bool {
        match self.last_attack {
            Some(last) if now >= last + f64::from(cooldown) => {
                self.last_attack = Some(now);
                true
            },
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_health_clamps() {
        let mut health = Health::new(100.0);
        let change = health.apply(50.0);
        assert_eq!(change.current, 100.0);

        let change = health.apply(-130.0);
        assert_eq!(change.previous, 100.0);
        assert_eq!(change.current, 0.0);
        assert!(change.is_lethal());
        assert!(health.is_depleted());
        assert_eq!(health.fraction(), 0.0);

        // Already empty, not lethal a second time.
        assert!(!health.apply(-5.0).is_lethal());
    }

    #[test]
    fn test_health_fraction() {
        let mut health = Health::new(40.0);
        health.apply(-10.0);
        assert!((health.fraction() - 0.75).abs() < f32::EPSILON);
    }

    #[test]
    fn test_health_ignores_nan() {
        let mut health = Health::new(10.0);
        health.apply(f32::NAN);
        assert_eq!(health.current(), 10.0);
    }

    #[test]
    fn test_knockback_direction() {
        let impulse = knockback_impulse(Vec2::new(2.0, 0.0), Vec2::ZERO, 5.0);
        assert_eq!(impulse, Vec2::new(5.0, 0.0));
        assert_eq!(knockback_impulse(Vec2::ONE, Vec2::ONE, 5.0), Vec2::ZERO);
    }

    #[test]
    fn test_regeneration_waits_for_cooldown() {
        let mut regen = Regeneration::new();
        let mut hit = false;

        // interval 1s, cooldown 3s
        assert!(!regen.tick(1.0, 1.0, 3.0, &mut hit));
        assert!(!regen.tick(1.0, 1.0, 3.0, &mut hit));
        assert!(regen.tick(1.0, 1.0, 3.0, &mut hit));
        assert_eq!(regen.cooldown_elapsed(), 0.0);
    }

    #[test]
    fn test_regeneration_hit_resets_cooldown() {
        let mut regen = Regeneration::new();
        let mut hit = false;

        regen.tick(1.0, 1.0, 2.0, &mut hit);
        hit = true;
        assert!(!regen.tick(1.0, 1.0, 2.0, &mut hit));
        assert!(!hit);
        assert_eq!(regen.cooldown_elapsed(), 0.0);

        assert!(!regen.tick(1.0, 1.0, 2.0, &mut hit));
        assert!(regen.tick(1.0, 1.0, 2.0, &mut hit));
    }

    #[test]
    fn test_attack_gate() {
        let mut gate = AttackGate::default();
        assert!(!gate.try_strike(10.0, 1.0));

        gate.arm(2.0);
        assert!(!gate.try_strike(2.5, 1.0));
        assert!(gate.try_strike(3.0, 1.0));
        assert_eq!(gate.last_attack(), Some(3.0));
        assert!(!gate.try_strike(3.5, 1.0));

        gate.disarm();
        assert!(!gate.try_strike(100.0, 1.0));
    }

    #[test]
    fn test_attack_gate_late_in_session() {
        let mut gate = AttackGate::default();
        gate.arm(500_000.0);
        assert!(!gate.try_strike(500_000.99, 1.0));
        assert!(gate.try_strike(500_001.0, 1.0));
    }

    proptest! {
        #[test]
        fn prop_health_stays_in_range(
            max in 1.0f32..500.0,
            deltas in proptest::collection::vec(-300.0f32..300.0, 0..40),
        ) {
            let mut health = Health::new(max);
            for delta in deltas {
                health.apply(delta);
                prop_assert!(health.current() >= 0.0);
                prop_assert!(health.current() <= max);
            }
        }
    }
}
