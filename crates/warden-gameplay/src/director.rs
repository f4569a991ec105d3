//! Game director.
//!
//! Publisher side of the event bus: player stat broadcasts, enemy stops and
//! camera shakes. Also owns the simulation time scale used for slow motion
//! and pause.

use std::rc::Rc;

use glam::Vec2;
use tracing::{debug, info};

use crate::config::SimulationConfig;
use crate::events::{EventBus, GameEvent};
use crate::schedule::{TimerHandle, Timeline};
use crate::world::PlayerDamage;

/// Time scale outside slow motion and pause.
pub const NORMAL_TIME_SCALE: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
enum DirectorEffect {
    EndSlowMotion { shake: bool },
}

/// Publishes game-state events and controls time.
#[derive(Debug)]
pub struct GameDirector {
    bus: Rc<EventBus>,
    config: SimulationConfig,
    time_scale: f32,
    fixed_delta: f32,
    timeline: Timeline<DirectorEffect>,
    slow_motion: Option<TimerHandle>,
}

impl GameDirector {
    /// Creates a director publishing on `bus`.
    #[must_use]
    pub fn new(bus: Rc<EventBus>, config: SimulationConfig) -> Self {
        let fixed_delta = config.base_fixed_delta;
        Self {
            bus,
            config,
            time_scale: NORMAL_TIME_SCALE,
            fixed_delta,
            timeline: Timeline::new(),
            slow_motion: None,
        }
    }

    /// Director configuration.
    #[must_use]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Bus this director publishes on.
    #[must_use]
    pub fn bus(&self) -> &Rc<EventBus> {
        &self.bus
    }

    // === Broadcasts ===

    /// Broadcasts a player stamina change.
    pub fn change_player_stamina(&self, stamina: f32) {
        debug!("Player stamina {:+}", stamina);
        self.bus.publish(&GameEvent::AffectStamina { stamina });
    }

    /// Broadcasts a player health change.
    pub fn affect_player_health(&self, health: f32) {
        debug!("Player health {:+}", health);
        self.bus.publish(&GameEvent::AffectHealth { health });
    }

    /// Broadcasts an enemy hit on the player. `damage` is a health delta.
    pub fn attack_player(&self, damage: f32) {
        debug!("Applying {} to player", damage);
        self.bus.publish(&GameEvent::AttackPlayer { damage });
    }

    /// Broadcasts a camera shake with the configured duration and intensity.
    pub fn shake_camera(&self) {
        self.bus.publish(&GameEvent::ShakeCamera {
            duration: self.config.shake_duration,
            intensity: self.config.shake_intensity,
        });
    }

    /// Orders every enemy to stop.
    pub fn stop_enemies(&self, is_player_dead: bool) {
        info!("Stopping all enemies (player dead: {})", is_player_dead);
        self.bus.publish(&GameEvent::StopEnemies { is_player_dead });
    }

    // === Time control ===

    /// Current time scale.
    #[must_use]
    pub const fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Current fixed tick length in scaled seconds.
    #[must_use]
    pub const fn fixed_delta(&self) -> f32 {
        self.fixed_delta
    }

    /// Returns true while paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.time_scale == 0.0
    }

    /// Returns true while a slow motion effect is running.
    #[must_use]
    pub fn in_slow_motion(&self) -> bool {
        self.slow_motion.is_some()
    }

    /// Slows time for `duration` scaled seconds, optionally shaking the
    /// camera afterwards. A running effect is replaced.
    pub fn create_slow_motion(&mut self, duration: f32, should_shake: bool) {
        if let Some(previous) = self.slow_motion.take() {
            self.timeline.cancel(previous);
        }

        self.set_time_scale(self.config.slow_motion_time_scale);
        self.slow_motion = Some(
            self.timeline
                .schedule(duration, DirectorEffect::EndSlowMotion { shake: should_shake }),
        );
        info!("Slow motion x{} for {}s", self.time_scale, duration);
    }

    /// Slow motion with the configured duration and shake setting.
    pub fn create_default_slow_motion(&mut self) {
        self.create_slow_motion(
            self.config.slow_motion_duration,
            self.config.can_shake_camera_after_hit,
        );
    }

    /// Freezes simulation time.
    pub fn pause(&mut self) {
        self.time_scale = 0.0;
        info!("Game paused");
    }

    /// Restores normal time.
    pub fn resume(&mut self) {
        self.time_scale = NORMAL_TIME_SCALE;
        info!("Game resumed");
    }

    fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale;
        self.fixed_delta = self.config.base_fixed_delta * scale;
    }

    /// Advances pending time effects by `scaled_dt`.
    pub fn tick(&mut self, scaled_dt: f32) {
        for (handle, effect) in self.timeline.advance(scaled_dt) {
            match effect {
                DirectorEffect::EndSlowMotion { shake } => {
                    if self.slow_motion == Some(handle) {
                        self.slow_motion = None;
                    }
                    self.time_scale = NORMAL_TIME_SCALE;
                    self.fixed_delta = self.config.base_fixed_delta;
                    debug!("Slow motion over");
                    if shake {
                        self.shake_camera();
                    }
                },
            }
        }
    }

    /// Offset from `target` to `origin`. Negative `x` means the target lies
    /// to the right.
    #[must_use]
    pub fn target_offset(&self, origin: Vec2, target: Vec2) -> Vec2 {
        warden_common::target_offset(origin, target)
    }
}

impl PlayerDamage for GameDirector {
    fn apply_damage_to_player(&mut self, amount: f32) {
        self.attack_player(-amount);
    }
}
