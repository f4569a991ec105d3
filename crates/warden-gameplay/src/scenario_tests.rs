//! End-to-end behavior scenarios across perception, movement, combat and the
//! event bus.

use std::rc::Rc;

use glam::Vec2;
use proptest::prelude::*;
use tracing_subscriber::EnvFilter;
use warden_common::AgentId;

use crate::agent::{AgentMode, EnemyAgent, ANIM_IS_DEAD, ANIM_TAKE_DAMAGE};
use crate::config::{AgentConfig, BehaviorSettings, SimulationConfig};
use crate::objective::{ObjectiveLedger, ObjectiveTracker};
use crate::simulation::Simulation;
use crate::world::{MockBody, MockSpatial};

const DT: f32 = 0.1;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

fn config(lock_confirm: f32) -> Rc<AgentConfig> {
    Rc::new(AgentConfig {
        name: "MeanSlime".to_string(),
        overall_health: 100.0,
        max_sight_radius: 6.0,
        follow_after_locked_sighting_for_seconds: lock_confirm,
        ..AgentConfig::default()
    })
}

fn guard(lock_confirm: f32) -> EnemyAgent<MockBody> {
    EnemyAgent::new("slime-1", config(lock_confirm), BehaviorSettings::default(), MockBody::default())
}

/// One fixed tick followed by one timer tick.
fn advance(agent: &mut EnemyAgent<MockBody>, world: &MockSpatial, ledger: &mut dyn ObjectiveTracker) {
    agent.fixed_tick(world);
    agent.tick(DT, ledger);
}

#[test]
fn scenario_clear_line_is_visible_blocked_is_not() {
    init_tracing();
    let mut ledger = ObjectiveLedger::new();

    let mut open = MockSpatial::new();
    let player = open.add_target(Vec2::new(4.0, 1.0), 0.5, "Player");
    let mut agent = guard(0.0);
    advance(&mut agent, &open, &mut ledger);
    assert!(agent.state().can_see_target);
    assert_eq!(agent.state().sighted_target, Some(player));

    let mut walled = MockSpatial::new();
    walled.add_target(Vec2::new(4.0, 0.0), 0.5, "Player");
    walled.add_wall(Vec2::new(2.0, -10.0), Vec2::new(2.0, 10.0), "Wall");
    let mut agent = guard(0.0);
    advance(&mut agent, &walled, &mut ledger);
    assert!(!agent.state().can_see_target);
    assert_eq!(agent.state().sighted_target, None);
    assert_eq!(agent.state().last_locked_sight_timer, 0.0);
}

#[test]
fn scenario_patrol_visits_points_cyclically() {
    init_tracing();
    let world = MockSpatial::new();
    let mut ledger = ObjectiveLedger::new();
    let route = vec![Vec2::new(2.0, 0.0), Vec2::new(2.0, 2.0), Vec2::new(0.0, 2.0)];
    let mut agent = guard(0.0).with_route(route.clone());

    let mut visited = Vec::new();
    for _ in 0..7 {
        advance(&mut agent, &world, &mut ledger);
        let cursor = agent.route().cursor().expect("cursor");
        visited.push(cursor);
        assert_eq!(agent.body().last_destination(), Some(route[cursor]));

        // Arrive, then wait out the look-around pause.
        agent.contact_enter("PatrolPoint", 0.0);
        for _ in 0..12 {
            advance(&mut agent, &world, &mut ledger);
            if !agent.route().has_collided() {
                break;
            }
            assert_eq!(agent.body().last_destination(), Some(Vec2::ZERO));
        }
        assert!(!agent.route().has_collided());
    }

    assert_eq!(visited, vec![0, 1, 2, 0, 1, 2, 0]);
}

#[test]
fn scenario_chase_end_wait_holds_position() {
    init_tracing();
    let mut world = MockSpatial::new();
    let mut ledger = ObjectiveLedger::new();
    let player = world.add_target(Vec2::new(3.0, 0.0), 0.4, "Player");
    let mut agent = guard(0.0).with_route(vec![Vec2::new(-3.0, 0.0)]);

    for _ in 0..3 {
        advance(&mut agent, &world, &mut ledger);
    }
    assert_eq!(agent.mode(), AgentMode::Following);
    assert_eq!(agent.body().last_destination(), Some(Vec2::new(3.0, 0.0)));

    world.move_target(player, Vec2::new(40.0, 0.0));

    // Default wait is 1 s: ten fixed ticks at 0.1 s hold position.
    for _ in 0..10 {
        advance(&mut agent, &world, &mut ledger);
        assert_eq!(agent.mode(), AgentMode::Waiting);
        assert_eq!(agent.body().last_destination(), Some(Vec2::ZERO));
    }

    for _ in 0..3 {
        advance(&mut agent, &world, &mut ledger);
    }
    assert_eq!(agent.mode(), AgentMode::Patrolling);
    assert_eq!(agent.body().last_destination(), Some(Vec2::new(-3.0, 0.0)));
}

#[test]
fn scenario_target_reappearing_abandons_wait() {
    init_tracing();
    let mut world = MockSpatial::new();
    let mut ledger = ObjectiveLedger::new();
    let player = world.add_target(Vec2::new(3.0, 0.0), 0.4, "Player");
    let mut agent = guard(0.0);

    advance(&mut agent, &world, &mut ledger);
    world.move_target(player, Vec2::new(40.0, 0.0));
    advance(&mut agent, &world, &mut ledger);
    assert_eq!(agent.mode(), AgentMode::Waiting);

    world.move_target(player, Vec2::new(0.0, 2.0));
    advance(&mut agent, &world, &mut ledger);
    assert_eq!(agent.mode(), AgentMode::Following);
    assert_eq!(agent.body().last_destination(), Some(Vec2::new(0.0, 2.0)));
}

#[test]
fn scenario_removed_target_is_not_visible() {
    init_tracing();
    let mut world = MockSpatial::new();
    let mut ledger = ObjectiveLedger::new();
    let player = world.add_target(Vec2::new(3.0, 0.0), 0.4, "Player");
    let mut agent = guard(0.0);

    advance(&mut agent, &world, &mut ledger);
    assert!(agent.state().can_see_target);

    world.remove_target(player);
    advance(&mut agent, &world, &mut ledger);
    assert!(!agent.state().can_see_target);
    assert!(agent.state().sighted_target.is_none());
}

#[test]
fn scenario_lock_confirm_delays_chase() {
    init_tracing();
    let mut world = MockSpatial::new();
    let mut ledger = ObjectiveLedger::new();
    world.add_target(Vec2::new(3.0, 0.0), 0.4, "Player");
    let mut agent = guard(0.5);

    // Sight timer reaches at most 0.4 s during these ticks.
    for _ in 0..5 {
        advance(&mut agent, &world, &mut ledger);
        assert!(agent.state().is_following);
        assert!(agent.body().destinations.is_empty());
        assert_eq!(agent.body().speed, agent.config().follow_speed);
    }

    advance(&mut agent, &world, &mut ledger);
    advance(&mut agent, &world, &mut ledger);
    assert_eq!(agent.body().last_destination(), Some(Vec2::new(3.0, 0.0)));
}

#[test]
fn scenario_lock_confirm_counts_only_visible_ticks() {
    init_tracing();
    let mut world = MockSpatial::new();
    let mut ledger = ObjectiveLedger::new();
    let mut agent = guard(DT);

    advance(&mut agent, &world, &mut ledger);
    assert_eq!(agent.state().last_locked_sight_timer, 0.0);

    world.add_target(Vec2::new(3.0, 0.0), 0.4, "Player");

    // First tick with the target in sight: nothing confirmed yet.
    agent.fixed_tick(&world);
    assert!(agent.state().is_following);
    assert_eq!(agent.state().last_locked_sight_timer, 0.0);
    assert!(agent.body().destinations.is_empty());
    agent.tick(DT, &mut ledger);

    advance(&mut agent, &world, &mut ledger);
    assert_eq!(agent.body().last_destination(), Some(Vec2::new(3.0, 0.0)));
}

#[test]
fn scenario_repeated_hits_cancel_pending_knockback() {
    init_tracing();
    let world = MockSpatial::new();
    let mut ledger = ObjectiveLedger::new();
    let mut agent = EnemyAgent::new(
        "slime-1",
        config(0.0),
        BehaviorSettings::default(),
        MockBody::at(Vec2::new(1.0, 0.0)),
    );

    agent.receive_attack(10.0, Vec2::ZERO, 4.0, &mut ledger);
    agent.tick(0.05, &mut ledger);
    agent.receive_attack(10.0, Vec2::new(2.0, 0.0), 2.0, &mut ledger);

    for _ in 0..10 {
        agent.fixed_tick(&world);
        agent.tick(0.05, &mut ledger);
    }

    assert_eq!(agent.body().impulses, vec![Vec2::new(-2.0, 0.0)]);
    assert_eq!(agent.body().velocity_sets, vec![Vec2::ZERO]);
    assert_eq!(agent.state().health.current(), 80.0);
    assert!(!agent.has_pending_knockback());
}

#[test]
fn scenario_hit_during_settle_replaces_settle() {
    init_tracing();
    let mut ledger = ObjectiveLedger::new();
    let mut agent = EnemyAgent::new(
        "slime-1",
        config(0.0),
        BehaviorSettings::default(),
        MockBody::at(Vec2::new(1.0, 0.0)),
    );

    agent.receive_attack(10.0, Vec2::ZERO, 4.0, &mut ledger);
    agent.tick(0.12, &mut ledger);
    assert_eq!(agent.body().impulses.len(), 1);

    agent.receive_attack(10.0, Vec2::ZERO, 4.0, &mut ledger);
    for _ in 0..10 {
        agent.tick(0.05, &mut ledger);
    }

    assert_eq!(agent.body().impulses.len(), 2);
    assert_eq!(agent.body().velocity_sets, vec![Vec2::ZERO]);
}

#[test]
fn scenario_lethal_attack() {
    init_tracing();
    let world = MockSpatial::new();
    let mut ledger = ObjectiveLedger::new();
    let mut agent = guard(0.0);

    agent.receive_attack(150.0, Vec2::new(-1.0, 0.0), 3.0, &mut ledger);

    assert_eq!(agent.state().health.current(), 0.0);
    assert!(agent.is_dead());
    assert_eq!(agent.mode(), AgentMode::Dead);
    assert_eq!(agent.body().trigger_count(ANIM_IS_DEAD), 1);
    assert_eq!(agent.body().speed, 0.0);
    assert!(!agent.has_pending_knockback());
    assert_eq!(ledger.count("slime-1"), 1);

    agent.receive_attack(10.0, Vec2::ZERO, 3.0, &mut ledger);
    agent.affect_health(50.0, &mut ledger);
    for _ in 0..20 {
        advance(&mut agent, &world, &mut ledger);
    }

    assert_eq!(agent.state().health.current(), 0.0);
    assert!(agent.is_dead());
    assert_eq!(agent.body().trigger_count(ANIM_TAKE_DAMAGE), 1);
    assert_eq!(agent.body().trigger_count(ANIM_IS_DEAD), 1);
    assert!(agent.body().impulses.is_empty());
    assert_eq!(ledger.count("slime-1"), 1);
}

#[test]
fn scenario_player_death_stops_every_enemy() {
    init_tracing();
    let mut sim = Simulation::new(SimulationConfig::default(), MockSpatial::new(), ObjectiveLedger::new());
    let route = vec![Vec2::new(5.0, 0.0), Vec2::new(5.0, 5.0)];

    for id in ["slime-1", "slime-2", "slime-3"] {
        let agent = EnemyAgent::new(id, config(0.0), BehaviorSettings::default(), MockBody::default())
            .with_route(route.clone());
        sim.spawn(agent).expect("spawn");
    }

    sim.step(DT);
    sim.director().stop_enemies(true);

    let before: Vec<usize> = sim
        .agent_ids()
        .filter_map(|id| sim.agent(id))
        .map(|a| a.borrow().body().destinations.len())
        .collect();

    for _ in 0..10 {
        sim.step(DT);
    }

    for (id, count) in ["slime-1", "slime-2", "slime-3"].iter().zip(before) {
        let agent = sim.agent(&AgentId::new(*id)).expect("agent");
        let agent = agent.borrow();
        assert!(!agent.capabilities().can_move);
        assert_eq!(agent.body().destinations.len(), count);
        assert_eq!(agent.mode(), AgentMode::Idle);
    }
}

#[test]
fn scenario_kill_in_simulation_reports_once() {
    init_tracing();
    let mut sim = Simulation::new(SimulationConfig::default(), MockSpatial::new(), ObjectiveLedger::new());
    sim.spawn(guard(0.0)).expect("spawn");
    let id = AgentId::new("slime-1");

    sim.receive_attack(&id, 60.0, Vec2::ZERO, 1.0).expect("hit");
    sim.step(DT);
    sim.receive_attack(&id, 60.0, Vec2::ZERO, 1.0).expect("hit");
    let report = sim.step(DT);

    assert_eq!(report.despawned, vec![id.clone()]);
    assert!(sim.agent(&id).is_none());
    assert_eq!(sim.objectives().count("slime-1"), 1);
    assert_eq!(sim.bus().subscriber_count(), 0);
}

#[derive(Debug, Clone, Copy)]
enum HealthOp {
    Hit(f32),
    Heal(f32),
    Wait,
}

fn health_op() -> impl Strategy<Value = HealthOp> {
    prop_oneof![
        (0.0f32..80.0).prop_map(HealthOp::Hit),
        (0.0f32..80.0).prop_map(HealthOp::Heal),
        Just(HealthOp::Wait),
    ]
}

proptest! {
    #[test]
    fn prop_health_bounded_and_death_terminal(ops in proptest::collection::vec(health_op(), 1..40)) {
        let world = MockSpatial::new();
        let mut ledger = ObjectiveLedger::new();
        let mut agent = guard(0.0);
        let max = agent.config().overall_health;
        let mut died = false;

        for op in ops {
            match op {
                HealthOp::Hit(damage) => agent.receive_attack(damage, Vec2::ONE, 1.0, &mut ledger),
                HealthOp::Heal(amount) => agent.affect_health(amount, &mut ledger),
                HealthOp::Wait => advance(&mut agent, &world, &mut ledger),
            }

            let health = agent.state().health.current();
            prop_assert!((0.0..=max).contains(&health));
            if died {
                prop_assert!(agent.is_dead());
                prop_assert_eq!(health, 0.0);
            }
            if health == 0.0 {
                prop_assert!(agent.is_dead());
                died = true;
            }
        }

        prop_assert!(ledger.count("slime-1") <= 1);
        prop_assert_eq!(ledger.count("slime-1") == 1, died);
    }
}
