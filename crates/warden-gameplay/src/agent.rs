//! Enemy agent behavior controller.
//!
//! One [`EnemyAgent`] drives one enemy body. The owning loop calls
//! [`EnemyAgent::fixed_tick`] for perception, mode selection, movement and
//! orientation, then [`EnemyAgent::tick`] for timers, regeneration and
//! scheduled knockback stages. Damage and contact triggers arrive through
//! direct calls; game-wide stops arrive through the event bus via an
//! [`AgentInbox`].

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use glam::Vec2;
use tracing::{debug, info, warn};
use warden_common::{AgentId, SubscriptionId, TargetHandle};

use crate::combat::{knockback_impulse, AttackGate, Health, KnockbackStage, Regeneration};
use crate::config::{AgentConfig, AttackFlagPolicy, BehaviorSettings, Capabilities};
use crate::events::{EventBus, EventBusError, EventHandler, EventKind, GameEvent};
use crate::objective::ObjectiveTracker;
use crate::orientation::{orient, Attachment, Pose, SightIndicator};
use crate::patrol::{PatrolRoute, PatrolStep};
use crate::perception::{reference_heading, scan_for_target, SightCone, SightParams};
use crate::schedule::{TimerHandle, Timeline};
use crate::world::{AgentBody, PlayerDamage, SpatialQuery};

/// Animation bool: the agent is walking.
pub const ANIM_IS_MOVING: &str = "isMoving";
/// Animation trigger: the agent was hit.
pub const ANIM_TAKE_DAMAGE: &str = "takeDamage";
/// Animation trigger: the agent died.
pub const ANIM_IS_DEAD: &str = "isDead";
/// Animation trigger: the agent strikes the player.
pub const ANIM_ATTACK: &str = "attack";

/// Mutable per-agent state.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentState {
    /// Id reported to the objective tracker on death
    pub id: AgentId,
    /// Health pool
    pub health: Health,
    /// Movement capabilities
    pub capabilities: Capabilities,
    /// Terminal death flag
    pub is_dead: bool,
    /// Target found by the latest scan
    pub sighted_target: Option<TargetHandle>,
    /// Whether the latest scan found a target
    pub can_see_target: bool,
    /// Seconds of continuous sighting
    pub last_locked_sight_timer: f32,
    /// Walking the patrol route this tick
    pub is_patrolling: bool,
    /// Chasing a sighted target this tick
    pub is_following: bool,
    /// Holding position after losing sight
    pub is_waiting_after_chase_end: bool,
    /// Seconds spent in the chase-end wait
    pub wait_after_chase_end_timer: f32,
    /// Body velocity is non-zero
    pub is_moving: bool,
    /// Attack animation in progress
    pub is_attacking: bool,
    /// Hit since the last regeneration step
    pub is_being_attacked: bool,
    /// Current patrol destination
    pub destination: Option<Vec2>,
}

impl AgentState {
    fn new(id: AgentId, max_health: f32, capabilities: Capabilities) -> Self {
        Self {
            id,
            health: Health::new(max_health),
            capabilities,
            is_dead: false,
            sighted_target: None,
            can_see_target: false,
            last_locked_sight_timer: 0.0,
            is_patrolling: false,
            is_following: false,
            is_waiting_after_chase_end: false,
            wait_after_chase_end_timer: 0.0,
            is_moving: false,
            is_attacking: false,
            is_being_attacked: false,
            destination: None,
        }
    }
}

/// What is driving the agent's movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentMode {
    /// Not moving on its own
    Idle,
    /// Walking the patrol route
    Patrolling,
    /// Chasing a target
    Following,
    /// Holding position after losing sight
    Waiting,
    /// Dead
    Dead,
}

/// Behavior controller for one enemy.
#[derive(Debug)]
pub struct EnemyAgent<B> {
    state: AgentState,
    config: Rc<AgentConfig>,
    settings: BehaviorSettings,
    body: B,
    route: PatrolRoute,
    regen: Regeneration,
    gate: AttackGate,
    timeline: Timeline<KnockbackStage>,
    knockback: Option<TimerHandle>,
    weapon: Option<Attachment>,
    shadow: Option<Attachment>,
    pose: Pose,
    subscription: Option<SubscriptionId>,
    inbox: Option<Rc<AgentInbox<B>>>,
}

impl<B: AgentBody> EnemyAgent<B> {
    /// Creates an agent at full health with the configured capabilities.
    pub fn new(id: impl Into<AgentId>, config: Rc<AgentConfig>, settings: BehaviorSettings, body: B) -> Self {
        let id = id.into();
        if id.is_blank() {
            warn!("Enemy agent created with a blank id, its death cannot be tracked");
        }

        Self {
            state: AgentState::new(id, config.overall_health, settings.capabilities),
            weapon: settings.weapon_offset.map(Attachment::new),
            shadow: settings.shadow_offset.map(Attachment::new),
            config,
            settings,
            body,
            route: PatrolRoute::default(),
            regen: Regeneration::new(),
            gate: AttackGate::default(),
            timeline: Timeline::new(),
            knockback: None,
            pose: Pose::default(),
            subscription: None,
            inbox: None,
        }
    }

    /// Sets the patrol route.
    #[must_use]
    pub fn with_route(mut self, points: Vec<Vec2>) -> Self {
        self.set_route(points);
        self
    }

    /// Replaces the patrol route, resetting the cursor.
    pub fn set_route(&mut self, points: Vec<Vec2>) {
        self.route = PatrolRoute::new(points);
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Subscribes `handler` to game-wide stops and publishes the initial
    /// health.
    ///
    /// `handler` must forward events to this agent, see [`attach_agent`].
    pub fn on_create(
        &mut self,
        bus: &EventBus,
        handler: Weak<dyn EventHandler>,
    ) -> Result<SubscriptionId, EventBusError> {
        let id = bus.subscribe(&[EventKind::StopEnemies], handler)?;
        self.subscription = Some(id);
        self.body.set_health_fraction(self.state.health.fraction());
        info!(
            "Agent '{}' ({}) spawned with {} health",
            self.state.id,
            self.config.name,
            self.state.health.current()
        );
        Ok(id)
    }

    /// Drops the bus subscription and any pending continuation.
    pub fn on_destroy(&mut self, bus: &EventBus) {
        if let Some(id) = self.subscription.take() {
            if let Err(e) = bus.unsubscribe(id) {
                debug!("Agent '{}' unsubscribe: {e}", self.state.id);
            }
        }
        self.inbox = None;
        self.timeline.clear();
        self.knockback = None;
        info!("Agent '{}' destroyed", self.state.id);
    }

    /// Returns true while subscribed to the bus.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    // ========================================================================
    // Fixed tick: perception, mode, movement, orientation
    // ========================================================================

    /// Runs one fixed step.
    pub fn fixed_tick<S: SpatialQuery + ?Sized>(&mut self, spatial: &S) {
        self.drain_inbox();
        self.state.is_moving = self.body.current_velocity().length_squared() > 0.0;
        self.body.set_health_fraction(self.state.health.fraction());

        if self.state.is_dead {
            return;
        }

        let was_visible = self.state.can_see_target;
        self.perceive(spatial);
        let visible = self.state.can_see_target;

        let caps = self.state.capabilities;
        self.state.is_patrolling = caps.can_move && caps.can_patrol && !visible;
        self.state.is_following = caps.can_move && caps.can_follow && visible && self.state.sighted_target.is_some();

        self.body
            .set_bool(ANIM_IS_MOVING, self.state.is_moving && !self.state.is_attacking);

        if !caps.can_move {
            return;
        }

        let wait_duration = self.settings.wait_after_chase_end_duration;
        if wait_duration > 0.0 && was_visible && !visible {
            debug!("Agent '{}' lost sight, waiting {}s", self.state.id, wait_duration);
            self.state.wait_after_chase_end_timer = 0.0;
            self.state.is_waiting_after_chase_end = true;
        }
        if visible {
            self.state.is_waiting_after_chase_end = false;
        }

        if self.state.is_waiting_after_chase_end {
            self.continue_chase_end_wait();
        } else {
            if self.state.is_patrolling {
                self.patrol();
            }
            if self.state.is_following {
                self.follow(spatial);
            }
        }

        self.update_pose(spatial);
    }

    fn perceive<S: SpatialQuery + ?Sized>(&mut self, spatial: &S) {
        let origin = self.body.position();
        let heading = reference_heading(spatial, origin, self.state.destination, self.state.sighted_target);
        let cone = SightCone::for_agent(self.settings.sight_in_moving_direction, heading);
        let params = SightParams {
            max_distance: self.config.max_sight_radius,
            player_tag: &self.settings.player_tag,
            blocking_tags: &self.settings.blocking_tags,
            look_behind_walls: self.settings.look_behind_walls,
        };

        // A sighting whose body no longer resolves is not visible.
        let sighting = scan_for_target(spatial, origin, cone, &params)
            .filter(|s| spatial.target_position(s.target).is_some());

        match sighting {
            Some(sighting) => {
                self.state.sighted_target = Some(sighting.target);
                self.state.can_see_target = true;
            },
            None => {
                self.state.sighted_target = None;
                self.state.can_see_target = false;
                self.state.last_locked_sight_timer = 0.0;
            },
        }
    }

    fn continue_chase_end_wait(&mut self) {
        if self.state.wait_after_chase_end_timer >= self.settings.wait_after_chase_end_duration {
            debug!("Agent '{}' chase-end wait over", self.state.id);
            self.state.is_waiting_after_chase_end = false;
        } else {
            let here = self.body.position();
            self.body.set_destination(here);
        }
    }

    fn patrol(&mut self) {
        let step = self.route.step(self.settings.patrol_stop_to_look_duration);
        if step == PatrolStep::NoRoute {
            return;
        }

        self.body.set_speed(self.config.patrol_speed);
        self.state.destination = self.route.current_point();

        match step {
            PatrolStep::MoveTo(point) => self.body.set_destination(point),
            PatrolStep::Hold => {
                let here = self.body.position();
                self.body.set_destination(here);
            },
            PatrolStep::Advanced(_) | PatrolStep::NoRoute => {},
        }
    }

    fn follow<S: SpatialQuery + ?Sized>(&mut self, spatial: &S) {
        let Some(target) = self.state.sighted_target else {
            debug!("Agent '{}' has no target to follow", self.state.id);
            return;
        };

        self.body.set_speed(self.config.follow_speed);

        if self.state.last_locked_sight_timer < self.config.follow_after_locked_sighting_for_seconds {
            return;
        }

        let Some(target_position) = spatial.target_position(target) else {
            return;
        };

        let here = self.body.position();
        if here.distance(target_position) >= self.settings.closest_radius_to_player {
            self.body.set_destination(target_position);
        } else {
            self.body.set_destination(here);
        }
    }

    fn update_pose<S: SpatialQuery + ?Sized>(&mut self, spatial: &S) {
        let origin = self.body.position();

        let active_target = if self.state.is_following {
            self.state
                .sighted_target
                .and_then(|t| spatial.target_position(t))
        } else if self.state.is_patrolling {
            self.state.destination
        } else {
            None
        };
        let offset = active_target.map_or(Vec2::ZERO, |target| origin - target);

        let flip_x = orient(offset, self.weapon.as_mut(), self.shadow.as_mut());

        let sight_indicator = self.settings.enable_sight_lamp.then(|| {
            let heading = reference_heading(spatial, origin, self.state.destination, self.state.sighted_target);
            SightIndicator::for_heading(self.config.patrol_radius, heading)
        });

        self.pose = Pose {
            flip_x,
            weapon: self.weapon,
            shadow: self.shadow,
            self_light: self.settings.enable_self_lamp,
            sight_indicator,
        };
        self.body.apply_pose(&self.pose);
    }

    // ========================================================================
    // Tick: timers, regeneration, continuations
    // ========================================================================

    /// Advances timers by `dt` seconds of scaled time.
    pub fn tick(&mut self, dt: f32, objectives: &mut dyn ObjectiveTracker) {
        if self.state.is_dead {
            return;
        }

        self.route.tick(dt);
        if self.state.is_waiting_after_chase_end {
            self.state.wait_after_chase_end_timer += dt;
        }
        // Only continuous sighting counts towards the lock.
        if self.state.capabilities.can_follow && self.state.can_see_target {
            self.state.last_locked_sight_timer += dt;
        }

        let heal = self.regen.tick(
            dt,
            self.config.increment_every_seconds,
            self.config.regenerate_health_cooldown_when_hit,
            &mut self.state.is_being_attacked,
        );
        if heal {
            self.affect_health(self.config.health_regeneration_rate, objectives);
        }

        for (handle, stage) in self.timeline.advance(dt) {
            self.run_knockback_stage(handle, stage);
        }
    }

    fn run_knockback_stage(&mut self, handle: TimerHandle, stage: KnockbackStage) {
        if self.knockback != Some(handle) {
            debug!("Ignoring knockback stage from a replaced hit");
            return;
        }

        match stage {
            KnockbackStage::Impulse { attacker, force } => {
                let impulse = knockback_impulse(self.body.position(), attacker, force);
                self.body.apply_impulse(impulse);
                self.knockback = Some(
                    self.timeline
                        .schedule(self.settings.knockback_settle_delay, KnockbackStage::Settle),
                );
            },
            KnockbackStage::Settle => {
                self.body.set_velocity(Vec2::ZERO);
                self.knockback = None;
            },
        }
    }

    // ========================================================================
    // Combat
    // ========================================================================

    /// Takes a hit from an attacker at `attacker_position`.
    pub fn receive_attack(
        &mut self,
        damage: f32,
        attacker_position: Vec2,
        knockback_force: f32,
        objectives: &mut dyn ObjectiveTracker,
    ) {
        if self.state.is_dead {
            debug!("Agent '{}' is dead, ignoring attack", self.state.id);
            return;
        }

        self.body.fire_trigger(ANIM_TAKE_DAMAGE);
        self.affect_health(-damage, objectives);
        self.state.is_being_attacked = true;

        if let Some(previous) = self.knockback.take() {
            self.timeline.cancel(previous);
        }

        if !self.state.is_dead {
            self.knockback = Some(self.timeline.schedule(
                self.settings.knockback_delay,
                KnockbackStage::Impulse {
                    attacker: attacker_position,
                    force: knockback_force,
                },
            ));
        }
    }

    /// Changes health by `delta` (negative hurts). Death is terminal.
    pub fn affect_health(&mut self, delta: f32, objectives: &mut dyn ObjectiveTracker) {
        if self.state.is_dead {
            return;
        }

        let change = self.state.health.apply(delta);
        self.body.set_health_fraction(self.state.health.fraction());
        debug!(
            "Agent '{}' health {} -> {}",
            self.state.id, change.previous, change.current
        );

        if self.state.health.is_depleted() {
            self.die(objectives);
        }
    }

    fn die(&mut self, objectives: &mut dyn ObjectiveTracker) {
        self.state.is_dead = true;
        self.state.is_following = false;
        self.state.is_patrolling = false;
        self.state.is_waiting_after_chase_end = false;
        self.root();
        self.body.fire_trigger(ANIM_IS_DEAD);
        self.timeline.clear();
        self.knockback = None;
        objectives.notify_collected(self.state.id.as_str());
        info!("Agent '{}' died", self.state.id);
    }

    /// Stops the body in place.
    pub fn root(&mut self) {
        self.body.set_speed(0.0);
        self.body.set_velocity(Vec2::ZERO);
    }

    // ========================================================================
    // Contact triggers
    // ========================================================================

    /// A collider with `tag` entered the agent's trigger volume at `now`.
    pub fn contact_enter(&mut self, tag: &str, now: f64) {
        if tag == self.settings.patrol_point_tag {
            debug!("Agent '{}' reached a patrol point", self.state.id);
            self.route.mark_collided();
        } else if tag == self.settings.player_tag
            && self.state.capabilities.can_follow
            && self.state.can_see_target
        {
            self.gate.arm(now);
        }
    }

    /// A collider with `tag` stays in contact at `now`. Returns true if the
    /// agent struck the player.
    pub fn contact_stay(&mut self, tag: &str, now: f64, player: &mut dyn PlayerDamage) -> bool {
        if tag != self.settings.player_tag || self.state.is_dead {
            return false;
        }

        if !self.gate.try_strike(now, self.config.attack_cooldown) || !self.state.capabilities.can_move {
            return false;
        }

        self.state.is_attacking = match self.settings.attack_flag_policy {
            AttackFlagPolicy::ClearOnStrike => false,
            AttackFlagPolicy::HoldUntilReset => true,
        };
        self.body.fire_trigger(ANIM_ATTACK);
        player.apply_damage_to_player(self.config.damage);
        debug!("Agent '{}' hit the player for {}", self.state.id, self.config.damage);

        // The hit may have ended the game while this agent was borrowed.
        self.drain_inbox();
        true
    }

    /// A collider with `tag` left the trigger volume.
    pub fn contact_exit(&mut self, tag: &str) {
        if tag == self.settings.player_tag {
            self.gate.disarm();
        }
    }

    /// Called by the animation layer when the attack animation ends.
    pub fn reset_attack(&mut self) {
        self.state.is_attacking = false;
    }

    // ========================================================================
    // Capabilities and visuals
    // ========================================================================

    fn drain_inbox(&mut self) {
        let Some(inbox) = self.inbox.as_ref() else {
            return;
        };
        for event in inbox.take_pending() {
            self.handle_event(&event);
        }
    }

    fn handle_event(&mut self, event: &GameEvent) {
        if let GameEvent::StopEnemies { is_player_dead } = event {
            debug!(
                "Agent '{}' stopping (player dead: {})",
                self.state.id, is_player_dead
            );
            self.stop_movement();
        }
    }

    fn stop_movement(&mut self) {
        self.state.capabilities = Capabilities::none();
        self.body.set_bool(ANIM_IS_MOVING, false);
    }

    /// Replaces the movement capabilities.
    pub fn set_capabilities(&mut self, capabilities: Capabilities) {
        self.state.capabilities = capabilities;
    }

    /// Hides the weapon attachment.
    pub fn hide_attachment(&mut self) {
        self.set_weapon_visible(false);
    }

    /// Shows the weapon attachment.
    pub fn show_attachment(&mut self) {
        self.set_weapon_visible(true);
    }

    fn set_weapon_visible(&mut self, visible: bool) {
        if let Some(weapon) = self.weapon.as_mut() {
            weapon.visible = visible;
            self.pose.weapon = Some(*weapon);
            self.body.apply_pose(&self.pose);
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Agent id.
    #[must_use]
    pub fn id(&self) -> &AgentId {
        &self.state.id
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &AgentState {
        &self.state
    }

    /// Shared stat block.
    #[must_use]
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Instance settings.
    #[must_use]
    pub fn settings(&self) -> &BehaviorSettings {
        &self.settings
    }

    /// Engine body.
    #[must_use]
    pub fn body(&self) -> &B {
        &self.body
    }

    /// Mutable engine body.
    pub fn body_mut(&mut self) -> &mut B {
        &mut self.body
    }

    /// Patrol route.
    #[must_use]
    pub fn route(&self) -> &PatrolRoute {
        &self.route
    }

    /// Current capabilities.
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.state.capabilities
    }

    /// Last pose applied to the body.
    #[must_use]
    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    /// Time of the last strike or contact, `None` when idle.
    #[must_use]
    pub fn last_player_attack_time(&self) -> Option<f64> {
        self.gate.last_attack()
    }

    /// Returns true while a knockback stage is pending.
    #[must_use]
    pub fn has_pending_knockback(&self) -> bool {
        self.knockback.is_some_and(|h| self.timeline.is_pending(h))
    }

    /// Returns true once the agent has died.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.state.is_dead
    }

    /// What drives the agent this tick.
    #[must_use]
    pub fn mode(&self) -> AgentMode {
        if self.state.is_dead {
            AgentMode::Dead
        } else if self.state.is_waiting_after_chase_end {
            AgentMode::Waiting
        } else if self.state.is_following {
            AgentMode::Following
        } else if self.state.is_patrolling && !self.route.is_empty() {
            AgentMode::Patrolling
        } else {
            AgentMode::Idle
        }
    }
}

/// Bus endpoint of a shared agent.
///
/// Events reach the agent immediately when it is free. While the agent is
/// borrowed they are queued and applied on its next fixed tick or right after
/// the strike that is holding the borrow.
pub struct AgentInbox<B> {
    agent: Weak<RefCell<EnemyAgent<B>>>,
    pending: RefCell<Vec<GameEvent>>,
}

impl<B> AgentInbox<B> {
    /// Number of events waiting for the agent.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    fn take_pending(&self) -> Vec<GameEvent> {
        std::mem::take(&mut *self.pending.borrow_mut())
    }
}

impl<B> fmt::Debug for AgentInbox<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentInbox")
            .field("pending", &self.pending_count())
            .finish()
    }
}

impl<B: AgentBody> EventHandler for AgentInbox<B> {
    fn handle(&self, event: &GameEvent) {
        let Some(agent) = self.agent.upgrade() else {
            return;
        };
        match agent.try_borrow_mut() {
            Ok(mut agent) => agent.handle_event(event),
            Err(_) => {
                debug!("Agent busy, queueing {:?}", event.kind());
                self.pending.borrow_mut().push(event.clone());
            },
        };
    }
}

/// Subscribes a shared agent to `bus` through a fresh [`AgentInbox`].
pub fn attach_agent<B: AgentBody + 'static>(
    agent: &Rc<RefCell<EnemyAgent<B>>>,
    bus: &EventBus,
) -> Result<SubscriptionId, EventBusError> {
    let inbox = Rc::new(AgentInbox {
        agent: Rc::downgrade(agent),
        pending: RefCell::new(Vec::new()),
    });
    let handler: Weak<dyn EventHandler> = Rc::downgrade(&inbox) as Weak<dyn EventHandler>;

    let mut shared = agent.borrow_mut();
    let id = shared.on_create(bus, handler)?;
    shared.inbox = Some(inbox);
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objective::ObjectiveLedger;
    use crate::world::{MockBody, MockPlayer, MockSpatial};

    const DT: f32 = 0.02;

    fn config() -> Rc<AgentConfig> {
        Rc::new(AgentConfig {
            name: "MeanSlime".to_string(),
            overall_health: 100.0,
            max_sight_radius: 6.0,
            follow_after_locked_sighting_for_seconds: 0.0,
            ..AgentConfig::default()
        })
    }

    fn agent_at(position: Vec2) -> EnemyAgent<MockBody> {
        EnemyAgent::new("slime-1", config(), BehaviorSettings::default(), MockBody::at(position))
    }

    #[test]
    fn test_new_agent_full_health() {
        let agent = agent_at(Vec2::ZERO);
        assert_eq!(agent.state().health.current(), 100.0);
        assert!(!agent.is_dead());
        assert_eq!(agent.capabilities(), Capabilities::default());
        assert_eq!(agent.mode(), AgentMode::Idle);
    }

    #[test]
    fn test_patrols_when_nothing_visible() {
        let world = MockSpatial::new();
        let mut agent = agent_at(Vec2::ZERO).with_route(vec![Vec2::new(3.0, 0.0), Vec2::new(3.0, 3.0)]);

        agent.fixed_tick(&world);

        assert!(agent.state().is_patrolling);
        assert_eq!(agent.mode(), AgentMode::Patrolling);
        assert_eq!(agent.body().last_destination(), Some(Vec2::new(3.0, 0.0)));
        assert_eq!(agent.body().speed, agent.config().patrol_speed);
        assert_eq!(agent.state().destination, Some(Vec2::new(3.0, 0.0)));
    }

    #[test]
    fn test_follows_visible_target() {
        let mut world = MockSpatial::new();
        let player = world.add_target(Vec2::new(3.0, 0.0), 0.4, "Player");
        let mut agent = agent_at(Vec2::ZERO);

        agent.fixed_tick(&world);

        assert_eq!(agent.state().sighted_target, Some(player));
        assert!(agent.state().is_following);
        assert!(!agent.state().is_patrolling);
        assert_eq!(agent.body().speed, agent.config().follow_speed);
        assert_eq!(agent.body().last_destination(), Some(Vec2::new(3.0, 0.0)));
        // Target to the right.
        assert!(agent.pose().flip_x);
    }

    #[test]
    fn test_holds_at_stand_off_radius() {
        let mut world = MockSpatial::new();
        world.add_target(Vec2::new(0.2, 0.0), 0.1, "Player");
        let mut agent = agent_at(Vec2::ZERO);

        agent.fixed_tick(&world);
        assert_eq!(agent.body().last_destination(), Some(Vec2::ZERO));
    }

    #[test]
    fn test_cannot_move_does_nothing() {
        let mut world = MockSpatial::new();
        world.add_target(Vec2::new(3.0, 0.0), 0.4, "Player");
        let mut agent = agent_at(Vec2::ZERO);
        agent.set_capabilities(Capabilities {
            can_move: false,
            ..Capabilities::default()
        });

        agent.fixed_tick(&world);

        assert!(agent.state().can_see_target);
        assert!(!agent.state().is_following);
        assert!(agent.body().destinations.is_empty());
    }

    #[test]
    fn test_stop_event_clears_capabilities() {
        let bus = EventBus::new();
        let agent = Rc::new(RefCell::new(agent_at(Vec2::ZERO)));
        attach_agent(&agent, &bus).expect("attach");
        assert_eq!(bus.subscriber_count(), 1);

        bus.publish(&GameEvent::StopEnemies { is_player_dead: true });

        let agent = agent.borrow();
        assert_eq!(agent.capabilities(), Capabilities::none());
        assert_eq!(agent.body().bool_value(ANIM_IS_MOVING), Some(false));
    }

    #[test]
    fn test_busy_agent_applies_queued_stop_on_fixed_tick() {
        let bus = EventBus::new();
        let world = MockSpatial::new();
        let agent = Rc::new(RefCell::new(agent_at(Vec2::ZERO)));
        attach_agent(&agent, &bus).expect("attach");

        {
            let _guard = agent.borrow_mut();
            assert_eq!(bus.publish(&GameEvent::StopEnemies { is_player_dead: false }), 1);
        }
        let inbox = agent.borrow().inbox.clone().expect("inbox");
        assert_eq!(inbox.pending_count(), 1);

        agent.borrow_mut().fixed_tick(&world);
        assert_eq!(agent.borrow().capabilities(), Capabilities::none());
        assert_eq!(inbox.pending_count(), 0);
    }

    /// Player stand-in that dies on the first hit and broadcasts the stop.
    struct FragilePlayer {
        bus: Rc<EventBus>,
    }

    impl PlayerDamage for FragilePlayer {
        fn apply_damage_to_player(&mut self, _amount: f32) {
            self.bus.publish(&GameEvent::StopEnemies { is_player_dead: true });
        }
    }

    #[test]
    fn test_stop_raised_by_own_strike_is_applied() {
        let bus = Rc::new(EventBus::new());
        let mut world = MockSpatial::new();
        world.add_target(Vec2::new(0.5, 0.0), 0.3, "Player");
        let agent = Rc::new(RefCell::new(agent_at(Vec2::ZERO)));
        attach_agent(&agent, &bus).expect("attach");
        let mut player = FragilePlayer { bus: Rc::clone(&bus) };

        agent.borrow_mut().fixed_tick(&world);
        agent.borrow_mut().contact_enter("Player", 0.0);
        assert!(agent.borrow_mut().contact_stay("Player", 1.0, &mut player));

        let agent = agent.borrow();
        assert_eq!(agent.capabilities(), Capabilities::none());
        assert_eq!(agent.body().bool_value(ANIM_IS_MOVING), Some(false));
    }

    #[test]
    fn test_on_destroy_unsubscribes() {
        let bus = EventBus::new();
        let agent = Rc::new(RefCell::new(agent_at(Vec2::ZERO)));
        attach_agent(&agent, &bus).expect("attach");

        agent.borrow_mut().on_destroy(&bus);
        assert_eq!(bus.subscriber_count(), 0);
        assert!(!agent.borrow().is_subscribed());
    }

    #[test]
    fn test_attack_schedules_knockback() {
        let mut ledger = ObjectiveLedger::new();
        let mut agent = agent_at(Vec2::new(1.0, 0.0));

        agent.receive_attack(10.0, Vec2::ZERO, 4.0, &mut ledger);

        assert_eq!(agent.state().health.current(), 90.0);
        assert!(agent.state().is_being_attacked);
        assert_eq!(agent.body().trigger_count(ANIM_TAKE_DAMAGE), 1);
        assert!(agent.has_pending_knockback());

        agent.tick(DT, &mut ledger);
        assert!(agent.body().impulses.is_empty());

        // 0.1 s impulse delay
        for _ in 0..5 {
            agent.tick(DT, &mut ledger);
        }
        assert_eq!(agent.body().impulses, vec![Vec2::new(4.0, 0.0)]);
        assert!(agent.body().velocity_sets.is_empty());

        // 0.15 s settle delay
        for _ in 0..8 {
            agent.tick(DT, &mut ledger);
        }
        assert_eq!(agent.body().velocity_sets, vec![Vec2::ZERO]);
        assert!(!agent.has_pending_knockback());
    }

    #[test]
    fn test_regeneration_after_cooldown() {
        let mut ledger = ObjectiveLedger::new();
        let mut agent = agent_at(Vec2::ZERO);
        agent.affect_health(-50.0, &mut ledger);

        // interval 1s, cooldown 3s, +1 per step
        for _ in 0..3 {
            agent.tick(1.0, &mut ledger);
        }
        assert_eq!(agent.state().health.current(), 51.0);
    }

    #[test]
    fn test_contact_attack_cycle() {
        let mut world = MockSpatial::new();
        world.add_target(Vec2::new(0.5, 0.0), 0.3, "Player");
        let mut player = MockPlayer::default();
        let mut agent = agent_at(Vec2::ZERO);
        agent.fixed_tick(&world);

        agent.contact_enter("Player", 2.0);
        assert_eq!(agent.last_player_attack_time(), Some(2.0));

        assert!(!agent.contact_stay("Player", 2.5, &mut player));
        assert!(agent.contact_stay("Player", 3.0, &mut player));
        assert!(!agent.contact_stay("Player", 3.5, &mut player));
        assert!(agent.contact_stay("Player", 4.0, &mut player));
        assert_eq!(player.hits, vec![10.0, 10.0]);
        assert_eq!(agent.body().trigger_count(ANIM_ATTACK), 2);

        agent.contact_exit("Player");
        assert_eq!(agent.last_player_attack_time(), None);
        assert!(!agent.contact_stay("Player", 10.0, &mut player));
    }

    #[test]
    fn test_contact_without_sight_does_not_arm() {
        let mut agent = agent_at(Vec2::ZERO);
        agent.contact_enter("Player", 1.0);
        assert_eq!(agent.last_player_attack_time(), None);
    }

    #[test]
    fn test_patrol_point_contact_marks_collision() {
        let mut agent = agent_at(Vec2::ZERO).with_route(vec![Vec2::X]);
        agent.contact_enter("PatrolPoint", 0.0);
        assert!(agent.route().has_collided());
    }

    #[test]
    fn test_attack_flag_policies() {
        let mut world = MockSpatial::new();
        world.add_target(Vec2::new(0.5, 0.0), 0.3, "Player");
        let mut player = MockPlayer::default();

        let settings = BehaviorSettings {
            attack_flag_policy: AttackFlagPolicy::HoldUntilReset,
            ..BehaviorSettings::default()
        };
        let mut agent = EnemyAgent::new("slime-2", config(), settings, MockBody::default());
        agent.fixed_tick(&world);
        agent.contact_enter("Player", 0.0);
        assert!(agent.contact_stay("Player", 1.0, &mut player));
        assert!(agent.state().is_attacking);

        agent.reset_attack();
        assert!(!agent.state().is_attacking);

        let mut default_agent = agent_at(Vec2::ZERO);
        default_agent.fixed_tick(&world);
        default_agent.contact_enter("Player", 0.0);
        assert!(default_agent.contact_stay("Player", 1.0, &mut player));
        assert!(!default_agent.state().is_attacking);
    }

    #[test]
    fn test_attachment_visibility() {
        let settings = BehaviorSettings {
            weapon_offset: Some(Vec2::new(0.3, 0.0)),
            ..BehaviorSettings::default()
        };
        let mut agent = EnemyAgent::new("knight", config(), settings, MockBody::default());

        agent.hide_attachment();
        let pose = agent.body().pose.expect("pose");
        assert_eq!(pose.weapon.map(|w| w.visible), Some(false));

        agent.show_attachment();
        let pose = agent.body().pose.expect("pose");
        assert_eq!(pose.weapon.map(|w| w.visible), Some(true));
    }

    #[test]
    fn test_sight_indicator_and_lights() {
        let world = MockSpatial::new();
        let mut agent = agent_at(Vec2::ZERO).with_route(vec![Vec2::new(0.0, 5.0)]);
        agent.fixed_tick(&world);

        let pose = agent.body().pose.expect("pose");
        assert!(pose.self_light);
        let indicator = pose.sight_indicator.expect("indicator");
        assert_eq!(indicator.outer_radius, agent.config().patrol_radius);
        assert!((indicator.rotation_degrees - 0.0).abs() < 1e-3);
    }

    #[test]
    fn test_is_moving_animation() {
        let world = MockSpatial::new();
        let mut agent = agent_at(Vec2::ZERO);
        agent.body_mut().velocity = Vec2::new(-1.0, 0.0);

        agent.fixed_tick(&world);
        assert!(agent.state().is_moving);
        assert_eq!(agent.body().bool_value(ANIM_IS_MOVING), Some(true));
    }
}
