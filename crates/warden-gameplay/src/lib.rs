//! # Warden Gameplay
//!
//! Enemy agent behavior for Warden.
//!
//! This crate provides the per-enemy decision loop and the game-wide state
//! plumbing around it:
//! - Perception by field-of-view ray sweeps
//! - Patrol, chase and chase-end wait movement modes
//! - Health, knockback, regeneration and contact attacks
//! - Facing and attachment mirroring
//! - Event bus and game director (stops, camera shake, slow motion, pause)
//! - Objective tracking and pressure plates
//! - Roster and configuration loading
//! - Simulation loop owning the agents

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod agent;
pub mod combat;
pub mod config;
pub mod director;
pub mod events;
pub mod objective;
pub mod orientation;
pub mod patrol;
pub mod perception;
pub mod roster;
pub mod schedule;
pub mod simulation;
pub mod world;

#[cfg(test)]
mod scenario_tests;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::agent::*;
    pub use crate::combat::*;
    pub use crate::config::*;
    pub use crate::director::*;
    pub use crate::events::*;
    pub use crate::objective::*;
    pub use crate::orientation::*;
    pub use crate::patrol::*;
    pub use crate::perception::*;
    pub use crate::roster::*;
    pub use crate::schedule::*;
    pub use crate::simulation::*;
    pub use crate::world::*;
}

pub use prelude::*;
