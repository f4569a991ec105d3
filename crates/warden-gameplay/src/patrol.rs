//! Patrol routes.
//!
//! A route is a cyclic list of points. The agent walks towards the point under
//! the cursor until its trigger volume reports a collision, pauses there for a
//! look-around, then advances the cursor. Movement towards the new point is
//! issued on the following tick.

use glam::Vec2;
use tracing::{debug, warn};

/// What the agent should do this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PatrolStep {
    /// The route has no points.
    NoRoute,
    /// Walk towards the point.
    MoveTo(Vec2),
    /// Stay in place while pausing at a reached point.
    Hold,
    /// The pause finished and the cursor moved to a new point.
    Advanced(Vec2),
}

/// Cyclic patrol route with cursor and pause state.
#[derive(Debug, Clone, Default)]
pub struct PatrolRoute {
    points: Vec<Vec2>,
    cursor: Option<usize>,
    has_collided: bool,
    pause_started: bool,
    pause_timer: f32,
    warned_empty: bool,
}

impl PatrolRoute {
    /// Creates a route over `points`.
    #[must_use]
    pub fn new(points: Vec<Vec2>) -> Self {
        Self {
            points,
            ..Self::default()
        }
    }

    /// Route points.
    #[must_use]
    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    /// Returns true if the route has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Index of the targeted point, `None` before the first patrol step.
    #[must_use]
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Point under the cursor.
    #[must_use]
    pub fn current_point(&self) -> Option<Vec2> {
        self.cursor.and_then(|i| self.points.get(i).copied())
    }

    /// Records that the agent reached a patrol point trigger.
    pub fn mark_collided(&mut self) {
        self.has_collided = true;
    }

    /// Returns true while a reached point has not been left yet.
    #[must_use]
    pub fn has_collided(&self) -> bool {
        self.has_collided
    }

    /// Returns true while pausing at a reached point.
    #[must_use]
    pub fn is_pausing(&self) -> bool {
        self.pause_started
    }

    /// Seconds spent pausing at the current point.
    #[must_use]
    pub fn pause_elapsed(&self) -> f32 {
        self.pause_timer
    }

    /// Advances the pause timer.
    pub fn tick(&mut self, dt: f32) {
        if self.pause_started {
            self.pause_timer += dt;
        }
    }

    /// Runs one patrol decision with the given look-around duration.
    pub fn step(&mut self, pause_duration: f32) -> PatrolStep {
        if self.points.is_empty() {
            if self.warned_empty {
                debug!("Patrol route is empty");
            } else {
                warn!("Patrol route is empty, agent will not patrol");
                self.warned_empty = true;
            }
            return PatrolStep::NoRoute;
        }

        let len = self.points.len();
        let cursor = match self.cursor {
            Some(i) if i < len => i,
            _ => 0,
        };
        self.cursor = Some(cursor);

        if !self.has_collided {
            return PatrolStep::MoveTo(self.points[cursor]);
        }

        if !self.pause_started {
            debug!("Reached patrol point {}, pausing", cursor);
            self.pause_timer = 0.0;
            self.pause_started = true;
        }

        if pause_duration <= 0.0 || self.pause_timer >= pause_duration {
            let next = (cursor + 1) % len;
            self.cursor = Some(next);
            self.has_collided = false;
            self.pause_started = false;
            debug!("Patrol moving on to point {}", next);
            return PatrolStep::Advanced(self.points[next]);
        }

        PatrolStep::Hold
    }
}
