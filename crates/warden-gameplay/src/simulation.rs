//! Simulation loop.
//!
//! Owns the event bus, the director, the collaborators and every live agent.
//! Each [`Simulation::step`] runs one fixed tick per agent (perception, mode,
//! movement, orientation), then one timer tick per agent, then the director's
//! time effects, and finally despawns agents that died during the step.

use std::cell::RefCell;
use std::rc::Rc;

use thiserror::Error;
use tracing::{debug, info, warn};
use warden_common::{AgentId, SubscriptionId, Vec2};

use crate::agent::{attach_agent, EnemyAgent};
use crate::config::{BehaviorSettings, SimulationConfig};
use crate::director::GameDirector;
use crate::events::{EventBus, EventBusError};
use crate::objective::{ObjectiveTracker, PressurePlate};
use crate::roster::EnemyRoster;
use crate::world::{AgentBody, SpatialQuery};

/// Simulation error types.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// An agent with this id is already live
    #[error("Agent already spawned: {0}")]
    DuplicateAgent(AgentId),
    /// No live agent with this id
    #[error("Unknown agent: {0}")]
    UnknownAgent(AgentId),
    /// The roster has no such kind
    #[error("Unknown enemy kind: {0}")]
    UnknownKind(String),
    /// The agent is borrowed elsewhere
    #[error("Agent busy: {0}")]
    AgentBusy(AgentId),
    /// Event bus failure
    #[error("Event bus error: {0}")]
    Bus(#[from] EventBusError),
}

/// Result type for simulation operations.
pub type SimulationResult<T> = Result<T, SimulationError>;

/// Shared handle to a live agent.
pub type SharedAgent<B> = Rc<RefCell<EnemyAgent<B>>>;

/// Outcome of one step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReport {
    /// Scaled seconds simulated
    pub scaled_dt: f32,
    /// Agents removed because they died
    pub despawned: Vec<AgentId>,
}

struct LiveAgent<B> {
    id: AgentId,
    agent: SharedAgent<B>,
    subscription: SubscriptionId,
}

/// Owning loop for a set of enemy agents.
pub struct Simulation<B, S, O> {
    bus: Rc<EventBus>,
    director: GameDirector,
    spatial: S,
    objectives: O,
    agents: Vec<LiveAgent<B>>,
    clock: f64,
    steps: u64,
}

impl<B, S, O> Simulation<B, S, O>
where
    B: AgentBody + 'static,
    S: SpatialQuery,
    O: ObjectiveTracker,
{
    /// Creates a simulation with a fresh bus.
    pub fn new(config: SimulationConfig, spatial: S, objectives: O) -> Self {
        let bus = Rc::new(EventBus::new());
        let director = GameDirector::new(Rc::clone(&bus), config);
        info!("Simulation started");
        Self {
            bus,
            director,
            spatial,
            objectives,
            agents: Vec::new(),
            clock: 0.0,
            steps: 0,
        }
    }

    // === Agents ===

    /// Adds an agent and subscribes it to the bus.
    pub fn spawn(&mut self, agent: EnemyAgent<B>) -> SimulationResult<SharedAgent<B>> {
        let id = agent.id().clone();
        if self.index_of(&id).is_some() {
            return Err(SimulationError::DuplicateAgent(id));
        }

        let shared = Rc::new(RefCell::new(agent));
        let subscription = attach_agent(&shared, &self.bus)?;
        self.agents.push(LiveAgent {
            id,
            agent: Rc::clone(&shared),
            subscription,
        });
        Ok(shared)
    }

    /// Builds an agent of a roster kind and spawns it.
    pub fn spawn_kind(
        &mut self,
        roster: &EnemyRoster,
        kind: &str,
        id: impl Into<AgentId>,
        settings: BehaviorSettings,
        body: B,
        route: Vec<Vec2>,
    ) -> SimulationResult<SharedAgent<B>> {
        let config = roster
            .get(kind)
            .ok_or_else(|| SimulationError::UnknownKind(kind.to_string()))?;
        self.spawn(EnemyAgent::new(id, config, settings, body).with_route(route))
    }

    /// Removes an agent, unsubscribing it from the bus.
    pub fn despawn(&mut self, id: &AgentId) -> SimulationResult<()> {
        let index = self
            .index_of(id)
            .ok_or_else(|| SimulationError::UnknownAgent(id.clone()))?;
        let live = self.agents.remove(index);
        match live.agent.try_borrow_mut() {
            Ok(mut agent) => agent.on_destroy(&self.bus),
            Err(_) => {
                warn!("Agent '{}' busy during despawn, dropping its subscription only", live.id);
                if let Err(e) = self.bus.unsubscribe(live.subscription) {
                    debug!("Agent '{}' unsubscribe: {e}", live.id);
                }
            },
        }
        Ok(())
    }

    /// Looks up a live agent.
    #[must_use]
    pub fn agent(&self, id: &AgentId) -> Option<SharedAgent<B>> {
        self.index_of(id).map(|i| Rc::clone(&self.agents[i].agent))
    }

    /// Ids of live agents in spawn order.
    pub fn agent_ids(&self) -> impl Iterator<Item = &AgentId> {
        self.agents.iter().map(|live| &live.id)
    }

    /// Number of live agents.
    #[must_use]
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    fn index_of(&self, id: &AgentId) -> Option<usize> {
        self.agents.iter().position(|live| &live.id == id)
    }

    fn with_agent<T>(&self, id: &AgentId, f: impl FnOnce(&mut EnemyAgent<B>) -> T) -> SimulationResult<T> {
        let index = self
            .index_of(id)
            .ok_or_else(|| SimulationError::UnknownAgent(id.clone()))?;
        let mut agent = self.agents[index]
            .agent
            .try_borrow_mut()
            .map_err(|_| SimulationError::AgentBusy(id.clone()))?;
        Ok(f(&mut agent))
    }

    // === Stepping ===

    /// Advances the simulation by `dt` real seconds.
    pub fn step(&mut self, dt: f32) -> StepReport {
        if self.director.is_paused() {
            return StepReport::default();
        }

        let scaled_dt = dt.max(0.0) * self.director.time_scale();
        self.clock += f64::from(scaled_dt);
        self.steps += 1;

        for live in &self.agents {
            match live.agent.try_borrow_mut() {
                Ok(mut agent) => agent.fixed_tick(&self.spatial),
                Err(_) => warn!("Agent '{}' busy, skipping fixed tick", live.id),
            }
        }

        for live in &self.agents {
            match live.agent.try_borrow_mut() {
                Ok(mut agent) => agent.tick(scaled_dt, &mut self.objectives),
                Err(_) => warn!("Agent '{}' busy, skipping tick", live.id),
            }
        }

        self.director.tick(scaled_dt);

        let despawned = self.despawn_dead();
        if !despawned.is_empty() {
            debug!("Step {} despawned {:?}", self.steps, despawned);
        }

        StepReport {
            scaled_dt,
            despawned,
        }
    }

    fn despawn_dead(&mut self) -> Vec<AgentId> {
        let dead: Vec<AgentId> = self
            .agents
            .iter()
            .filter(|live| live.agent.try_borrow().is_ok_and(|a| a.is_dead()))
            .map(|live| live.id.clone())
            .collect();

        for id in &dead {
            if let Err(e) = self.despawn(id) {
                warn!("Failed to despawn '{}': {e}", id);
            }
        }
        dead
    }

    // === Agent input ===

    /// Delivers a hit to an agent.
    pub fn receive_attack(
        &mut self,
        id: &AgentId,
        damage: f32,
        attacker_position: Vec2,
        knockback_force: f32,
    ) -> SimulationResult<()> {
        let index = self
            .index_of(id)
            .ok_or_else(|| SimulationError::UnknownAgent(id.clone()))?;
        let mut agent = self.agents[index]
            .agent
            .try_borrow_mut()
            .map_err(|_| SimulationError::AgentBusy(id.clone()))?;
        agent.receive_attack(damage, attacker_position, knockback_force, &mut self.objectives);
        Ok(())
    }

    /// A collider with `tag` entered the agent's trigger volume.
    pub fn contact_enter(&self, id: &AgentId, tag: &str) -> SimulationResult<()> {
        let now = self.clock;
        self.with_agent(id, |agent| agent.contact_enter(tag, now))
    }

    /// A collider with `tag` stays in contact. Returns true if the agent
    /// struck the player.
    pub fn contact_stay(&mut self, id: &AgentId, tag: &str) -> SimulationResult<bool> {
        let index = self
            .index_of(id)
            .ok_or_else(|| SimulationError::UnknownAgent(id.clone()))?;
        let mut agent = self.agents[index]
            .agent
            .try_borrow_mut()
            .map_err(|_| SimulationError::AgentBusy(id.clone()))?;
        Ok(agent.contact_stay(tag, self.clock, &mut self.director))
    }

    /// A collider with `tag` left the agent's trigger volume.
    pub fn contact_exit(&self, id: &AgentId, tag: &str) -> SimulationResult<()> {
        self.with_agent(id, |agent| agent.contact_exit(tag))
    }

    // === World input ===

    /// Behavior settings using this simulation's player tag.
    #[must_use]
    pub fn behavior_settings(&self) -> BehaviorSettings {
        BehaviorSettings {
            player_tag: self.director.config().player_tag.clone(),
            ..BehaviorSettings::default()
        }
    }

    /// An object tagged `tag` entered `plate`. Returns true if the plate
    /// fired.
    pub fn plate_entered(&mut self, plate: &PressurePlate, tag: &str) -> bool {
        plate.on_enter(tag, &self.director.config().static_tag, &mut self.objectives)
    }

    // === Accessors ===

    /// Event bus shared with every agent.
    #[must_use]
    pub fn bus(&self) -> &Rc<EventBus> {
        &self.bus
    }

    /// Game director.
    #[must_use]
    pub fn director(&self) -> &GameDirector {
        &self.director
    }

    /// Mutable game director.
    pub fn director_mut(&mut self) -> &mut GameDirector {
        &mut self.director
    }

    /// Spatial world.
    #[must_use]
    pub fn spatial(&self) -> &S {
        &self.spatial
    }

    /// Mutable spatial world.
    pub fn spatial_mut(&mut self) -> &mut S {
        &mut self.spatial
    }

    /// Objective tracker.
    #[must_use]
    pub fn objectives(&self) -> &O {
        &self.objectives
    }

    /// Mutable objective tracker.
    pub fn objectives_mut(&mut self) -> &mut O {
        &mut self.objectives
    }

    /// Scaled seconds simulated so far.
    #[must_use]
    pub fn now(&self) -> f64 {
        self.clock
    }

    /// Steps run so far.
    #[must_use]
    pub fn step_count(&self) -> u64 {
        self.steps
    }

    /// Destroys every agent and shuts the bus down.
    pub fn shutdown(&mut self) {
        let ids: Vec<AgentId> = self.agent_ids().cloned().collect();
        for id in &ids {
            if let Err(e) = self.despawn(id) {
                warn!("Failed to despawn '{}': {e}", id);
            }
        }
        self.bus.shutdown();
        info!("Simulation shut down after {} steps", self.steps);
    }
}
