//! Agent and simulation configuration.
//!
//! [`AgentConfig`] is the stat block shared by every enemy of one kind and is
//! normally loaded through the roster. [`BehaviorSettings`] holds per-instance
//! tunables. [`SimulationConfig`] carries the director's time and camera
//! settings and can be loaded from and saved to a TOML file.

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use warden_common::{WardenError, WardenResult};

/// Default configuration file name.
pub const CONFIG_FILE: &str = "warden.toml";

/// Stat block for one kind of enemy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Kind name, unique within a roster
    pub name: String,
    /// Maximum health
    pub overall_health: f32,
    /// Navigation speed while patrolling
    pub patrol_speed: f32,
    /// Navigation speed while chasing
    pub follow_speed: f32,
    /// Length of each sight ray
    pub max_sight_radius: f32,
    /// Damage dealt per melee hit
    pub damage: f32,
    /// Seconds between melee hits while in contact
    pub attack_cooldown: f32,
    /// Health restored per regeneration step
    pub health_regeneration_rate: f32,
    /// Seconds without being hit before regeneration resumes
    pub regenerate_health_cooldown_when_hit: f32,
    /// Interval of the stat increment step in seconds
    pub increment_every_seconds: f32,
    /// Seconds of continuous sighting required before chasing
    pub follow_after_locked_sighting_for_seconds: f32,
    /// Outer radius of the sight indicator
    pub patrol_radius: f32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "Grunt".to_string(),
            overall_health: 100.0,
            patrol_speed: 1.5,
            follow_speed: 3.0,
            max_sight_radius: 5.0,
            damage: 10.0,
            attack_cooldown: 1.0,
            health_regeneration_rate: 1.0,
            regenerate_health_cooldown_when_hit: 3.0,
            increment_every_seconds: 1.0,
            follow_after_locked_sighting_for_seconds: 0.5,
            patrol_radius: 3.0,
        }
    }
}

impl AgentConfig {
    /// Checks that every value is usable.
    pub fn validate(&self) -> WardenResult<()> {
        if self.name.trim().is_empty() {
            return Err(WardenError::invalid_config("name", "must not be blank"));
        }
        if self.overall_health.is_nan() || self.overall_health <= 0.0 {
            return Err(WardenError::invalid_config(
                "overall_health",
                format!("must be positive, got {}", self.overall_health),
            ));
        }
        if self.increment_every_seconds.is_nan() || self.increment_every_seconds <= 0.0 {
            return Err(WardenError::invalid_config(
                "increment_every_seconds",
                format!("must be positive, got {}", self.increment_every_seconds),
            ));
        }

        let non_negative = [
            ("patrol_speed", self.patrol_speed),
            ("follow_speed", self.follow_speed),
            ("max_sight_radius", self.max_sight_radius),
            ("damage", self.damage),
            ("attack_cooldown", self.attack_cooldown),
            ("health_regeneration_rate", self.health_regeneration_rate),
            (
                "regenerate_health_cooldown_when_hit",
                self.regenerate_health_cooldown_when_hit,
            ),
            (
                "follow_after_locked_sighting_for_seconds",
                self.follow_after_locked_sighting_for_seconds,
            ),
            ("patrol_radius", self.patrol_radius),
        ];
        for (field, value) in non_negative {
            if value.is_nan() || value < 0.0 {
                return Err(WardenError::invalid_config(
                    field,
                    format!("must be non-negative, got {value}"),
                ));
            }
        }

        Ok(())
    }
}

/// Movement capabilities of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    /// May move at all
    pub can_move: bool,
    /// May chase a sighted target
    pub can_follow: bool,
    /// May walk its patrol route
    pub can_patrol: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            can_move: true,
            can_follow: true,
            can_patrol: true,
        }
    }
}

impl Capabilities {
    /// Every capability disabled.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            can_move: false,
            can_follow: false,
            can_patrol: false,
        }
    }
}

/// How the `is_attacking` flag behaves around a melee strike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AttackFlagPolicy {
    /// The flag is cleared whenever a strike lands.
    #[default]
    ClearOnStrike,
    /// The flag is raised on a strike and held until the attack animation
    /// reports completion.
    HoldUntilReset,
}

/// Per-instance behavior tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorSettings {
    /// Capabilities at spawn
    pub capabilities: Capabilities,
    /// Tags that block sight unless `look_behind_walls` is set
    pub blocking_tags: Vec<String>,
    /// Substring identifying the player collider tag
    pub player_tag: String,
    /// Tag of patrol point trigger volumes
    pub patrol_point_tag: String,
    /// Ignore blocking colliders when scanning
    pub look_behind_walls: bool,
    /// Restrict the scan to a cone around the current heading
    pub sight_in_moving_direction: bool,
    /// Stand-off distance kept from a chased target
    pub closest_radius_to_player: f32,
    /// Seconds to hold position after losing sight of the target
    pub wait_after_chase_end_duration: f32,
    /// Seconds to pause at each reached patrol point
    pub patrol_stop_to_look_duration: f32,
    /// Show the agent's own light
    pub enable_self_lamp: bool,
    /// Show the sight indicator
    pub enable_sight_lamp: bool,
    /// Local offset of the weapon attachment, if any
    pub weapon_offset: Option<Vec2>,
    /// Local offset of the drop shadow, if any
    pub shadow_offset: Option<Vec2>,
    /// Delay before the knockback impulse
    pub knockback_delay: f32,
    /// Delay between the impulse and the velocity reset
    pub knockback_settle_delay: f32,
    /// Attack flag handling
    pub attack_flag_policy: AttackFlagPolicy,
}

impl Default for BehaviorSettings {
    fn default() -> Self {
        Self {
            capabilities: Capabilities::default(),
            blocking_tags: vec!["Wall".to_string()],
            player_tag: "Player".to_string(),
            patrol_point_tag: "PatrolPoint".to_string(),
            look_behind_walls: false,
            sight_in_moving_direction: false,
            closest_radius_to_player: 0.3,
            wait_after_chase_end_duration: 1.0,
            patrol_stop_to_look_duration: 1.0,
            enable_self_lamp: true,
            enable_sight_lamp: true,
            weapon_offset: None,
            shadow_offset: None,
            knockback_delay: 0.1,
            knockback_settle_delay: 0.15,
            attack_flag_policy: AttackFlagPolicy::ClearOnStrike,
        }
    }
}

impl BehaviorSettings {
    /// Returns true if `tag` blocks line of sight.
    #[must_use]
    pub fn is_blocking(&self, tag: &str) -> bool {
        self.blocking_tags.iter().any(|t| t == tag)
    }
}

/// Director and timing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    // === Tags ===
    /// Player collider tag
    pub player_tag: String,
    /// Tag of static pushables that trigger pressure plates
    pub static_tag: String,

    // === Time ===
    /// Unscaled fixed tick length in seconds
    pub base_fixed_delta: f32,
    /// Time scale applied during slow motion (0.0 - 1.0)
    pub slow_motion_time_scale: f32,
    /// Default slow motion duration in scaled seconds
    pub slow_motion_duration: f32,

    // === Camera ===
    /// Shake the camera after slow motion triggered by a hit
    pub can_shake_camera_after_hit: bool,
    /// Camera shake duration
    pub shake_duration: f32,
    /// Camera shake intensity
    pub shake_intensity: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            player_tag: "Player".to_string(),
            static_tag: "Static".to_string(),
            base_fixed_delta: 0.02,
            slow_motion_time_scale: 0.05,
            slow_motion_duration: 0.2,
            can_shake_camera_after_hit: false,
            shake_duration: 1.0,
            shake_intensity: 1.0,
        }
    }
}

impl SimulationConfig {
    /// Load configuration from a file, falling back to defaults.
    #[must_use]
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        match fs::File::open(path) {
            Ok(mut file) => {
                let mut contents = String::new();
                if let Err(e) = file.read_to_string(&mut contents) {
                    warn!("Failed to read config file: {e}");
                    return Self::default();
                }

                match toml::from_str::<Self>(&contents) {
                    Ok(mut config) => {
                        config.validate();
                        info!("Loaded config from {}", path.display());
                        config
                    },
                    Err(e) => {
                        warn!("Failed to parse config file: {e}");
                        Self::default()
                    },
                }
            },
            Err(e) => {
                warn!("Failed to open config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a file as pretty TOML.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> WardenResult<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| WardenError::Serialization(e.to_string()))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        self.base_fixed_delta = self.base_fixed_delta.clamp(0.001, 0.5);
        self.slow_motion_time_scale = self.slow_motion_time_scale.clamp(0.0, 1.0);
        self.slow_motion_duration = self.slow_motion_duration.max(0.0);
        self.shake_duration = self.shake_duration.max(0.0);
        self.shake_intensity = self.shake_intensity.max(0.0);
    }
}
