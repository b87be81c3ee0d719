//! Tests for clusters, target selection, squads, worker defense and the engine.

use std::cell::Cell;

use glam::Vec2;
use hecs::{Entity, World};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use skirmish_core::components::{Heading, Sighting};
use skirmish_core::enums::{Activity, SubActivity};
use skirmish_core::error::{Result, TacticsError};
use skirmish_core::result::CombatSimResult;
use skirmish_core::types::{BaseId, Choke, Frame, Position, SquadId};
use skirmish_core::unit_kinds::UnitKind;
use skirmish_tactics::classifier::{OpenGrid, RecencyPolicy};
use skirmish_tactics::config::TacticsConfig;
use skirmish_tactics::policy::ForcedReason;

use crate::attrition::AttritionSimulator;
use crate::cluster::targeting::select_targets;
use crate::cluster::UnitCluster;
use crate::context::FrameContext;
use crate::engine::{FrameInputs, FrameReport, TacticsEngine};
use crate::gateway::{CombatSimulator, Order, RecordingOrders, SimSnapshot};
use crate::map::{BaseInfo, StaticMap};
use crate::squad::rally::rally_point;
use crate::squad::{Mission, Squad};
use crate::world_setup::*;

/// Simulator that predicts the same trade for every snapshot.
struct ScriptedSim {
    mine: (i32, i32),
    enemy: (i32, i32),
}

impl CombatSimulator for ScriptedSim {
    fn simulate(&self, snapshot: &SimSnapshot) -> Result<CombatSimResult> {
        Ok(CombatSimResult {
            frame: snapshot.frame,
            my_unit_count: snapshot.friendly.len() as u32,
            enemy_unit_count: snapshot.enemy.len() as u32,
            initial_mine: self.mine.0,
            final_mine: self.mine.1,
            initial_enemy: self.enemy.0,
            final_enemy: self.enemy.1,
            narrow_choke: snapshot.narrow_choke,
            ..Default::default()
        })
    }
}

struct FailingSim;

impl CombatSimulator for FailingSim {
    fn simulate(&self, _snapshot: &SimSnapshot) -> Result<CombatSimResult> {
        Err(TacticsError::SimulationFailed("simulator offline".into()))
    }
}

/// Scripted simulator that remembers whether the last snapshot modelled retreat.
struct RetreatSpy {
    inner: ScriptedSim,
    include_retreat: Cell<Option<bool>>,
}

impl CombatSimulator for RetreatSpy {
    fn simulate(&self, snapshot: &SimSnapshot) -> Result<CombatSimResult> {
        self.include_retreat.set(Some(snapshot.include_retreat));
        self.inner.simulate(snapshot)
    }
}

fn retreat_spy() -> RetreatSpy {
    RetreatSpy {
        inner: winning(),
        include_retreat: Cell::new(None),
    }
}

/// We lose nothing and kill everything.
fn winning() -> ScriptedSim {
    ScriptedSim {
        mine: (400, 400),
        enemy: (400, 0),
    }
}

/// We lose half and kill nothing.
fn losing() -> ScriptedSim {
    ScriptedSim {
        mine: (400, 200),
        enemy: (400, 400),
    }
}

fn base(id: u32, x: f32, y: f32, last_scouted: Frame) -> BaseInfo {
    BaseInfo {
        id: BaseId(id),
        position: Vec2::new(x, y),
        mineral_line: Vec2::new(x - 50.0, y),
        minerals: 1500,
        last_scouted,
        choke: None,
    }
}

fn test_map() -> StaticMap {
    StaticMap {
        my_bases: vec![base(0, 500.0, 500.0, 0)],
        enemy_bases: vec![base(1, 3000.0, 3000.0, 0)],
        ..Default::default()
    }
}

fn enemy_main() -> Position {
    Vec2::new(3000.0, 3000.0)
}

struct Harness {
    world: World,
    config: TacticsConfig,
    map: StaticMap,
    orders: RecordingOrders,
}

impl Harness {
    fn new() -> Self {
        Self {
            world: World::new(),
            config: TacticsConfig::default(),
            map: test_map(),
            orders: RecordingOrders::new(),
        }
    }

    fn ctx<'a>(&'a mut self, frame: Frame, simulator: &'a dyn CombatSimulator) -> FrameContext<'a> {
        FrameContext {
            world: &self.world,
            frame,
            config: &self.config,
            recency: RecencyPolicy::from_config(&self.config),
            simulator,
            map: &self.map,
            grid: &OpenGrid,
            orders: &mut self.orders,
            supply_used: 0,
            failed_orders: 0,
        }
    }

    fn run(&mut self, engine: &mut TacticsEngine, frame: Frame, simulator: &dyn CombatSimulator) -> FrameReport {
        engine.update(FrameInputs {
            world: &self.world,
            frame,
            supply_used: 0,
            simulator,
            map: &self.map,
            orders: &mut self.orders,
        })
    }

    fn attack_targets(&self) -> Vec<Entity> {
        self.orders
            .orders
            .iter()
            .filter_map(|order| match order {
                Order::Attack { target, .. } => Some(*target),
                _ => None,
            })
            .collect()
    }
}

fn spawn_line(world: &mut World, kind: UnitKind, count: usize, origin: Position) -> Vec<Entity> {
    (0..count)
        .map(|i| spawn_friendly(world, kind, origin + Vec2::new(0.0, i as f32 * 8.0)))
        .collect()
}

fn squad_with(
    engine: &mut TacticsEngine,
    world: &World,
    mission: Mission,
    target: Position,
    units: &[Entity],
) -> SquadId {
    let id = engine.add_squad("test", mission, target);
    for unit in units {
        engine.assign_unit(world, id, *unit).unwrap();
    }
    id
}

fn only_cluster(engine: &TacticsEngine, id: SquadId) -> &UnitCluster {
    let squad = engine.squad(id).unwrap();
    assert_eq!(squad.clusters().len(), 1, "expected a single cluster");
    &squad.clusters()[0]
}

// ---- End-to-end scenarios ----

#[test]
fn test_winning_sim_starts_attack() {
    let mut h = Harness::new();
    let zealots = spawn_line(&mut h.world, UnitKind::Zealot, 4, Vec2::new(1000.0, 1000.0));
    let ling = spawn_enemy(&mut h.world, UnitKind::Zergling, Vec2::new(1100.0, 1000.0), 1);

    let mut engine = TacticsEngine::new(TacticsConfig::default());
    let id = squad_with(&mut engine, &h.world, Mission::AttackBase, enemy_main(), &zealots);
    assert_eq!(only_cluster(&engine, id).activity(), Activity::Moving);

    let report = h.run(&mut engine, 1, &winning());
    let cluster = only_cluster(&engine, id);
    assert_eq!(cluster.activity(), Activity::Attacking);
    assert!(cluster.history().last().unwrap().engaged);
    assert_eq!(report.squads[0].clusters[0].engaged, Some(true));
    assert!(h.attack_targets().contains(&ling));
}

#[test]
fn test_attack_survives_short_regroup_streak() {
    let mut h = Harness::new();
    let zealots = spawn_line(&mut h.world, UnitKind::Zealot, 4, Vec2::new(1000.0, 1000.0));
    spawn_enemy(&mut h.world, UnitKind::Zergling, Vec2::new(1100.0, 1000.0), 1);

    let mut engine = TacticsEngine::new(TacticsConfig::default());
    let id = squad_with(&mut engine, &h.world, Mission::AttackBase, enemy_main(), &zealots);

    h.run(&mut engine, 1, &winning());
    assert_eq!(only_cluster(&engine, id).activity(), Activity::Attacking);

    // Two regroup verdicts are not yet a stable streak
    h.run(&mut engine, 2, &losing());
    h.run(&mut engine, 3, &losing());
    let cluster = only_cluster(&engine, id);
    assert_eq!(cluster.activity(), Activity::Attacking);
    assert_eq!(cluster.history().len(), 3);
    assert!(!cluster.history().last().unwrap().engaged);
}

#[test]
fn test_squad_engages_base_threat_first() {
    let mut h = Harness::new();
    let dragoons = spawn_line(&mut h.world, UnitKind::Dragoon, 4, Vec2::new(700.0, 500.0));
    let raider = spawn_enemy(&mut h.world, UnitKind::Zergling, Vec2::new(600.0, 500.0), 1);
    let drone = spawn_enemy(&mut h.world, UnitKind::Drone, Vec2::new(900.0, 500.0), 1);

    let mut engine = TacticsEngine::new(TacticsConfig::default());
    let id = squad_with(&mut engine, &h.world, Mission::AttackBase, enemy_main(), &dragoons);

    // Classifier view for the squad's cluster
    {
        let sim = winning();
        let squad = engine.squad(id).unwrap();
        let ctx = h.ctx(1, &sim);
        let buckets = squad.classify_for(&squad.clusters()[0], &ctx, None);
        assert_eq!(buckets.base_threats.len(), 1);
        assert_eq!(buckets.base_threats[0].enemies, vec![raider]);
        assert_eq!(buckets.vulnerable, vec![drone]);
    }

    h.run(&mut engine, 1, &winning());
    let targets = h.attack_targets();
    assert!(!targets.is_empty());
    assert!(targets.iter().all(|target| *target == raider));
    assert_eq!(only_cluster(&engine, id).activity(), Activity::Attacking);
}

#[test]
fn test_losing_sim_flees_to_main() {
    let mut h = Harness::new();
    let zealots = spawn_line(&mut h.world, UnitKind::Zealot, 2, Vec2::new(1500.0, 1500.0));
    spawn_enemy(&mut h.world, UnitKind::Zergling, Vec2::new(1700.0, 1500.0), 1);

    let mut engine = TacticsEngine::new(TacticsConfig::default());
    let id = squad_with(&mut engine, &h.world, Mission::AttackBase, enemy_main(), &zealots);

    h.run(&mut engine, 1, &losing());
    let cluster = only_cluster(&engine, id);
    assert_eq!(cluster.activity(), Activity::Regrouping);
    assert_eq!(cluster.sub_activity(), SubActivity::Flee);
    for zealot in &zealots {
        assert_eq!(
            h.orders.orders_for(*zealot),
            vec![Order::Move {
                unit: *zealot,
                position: Vec2::new(500.0, 500.0)
            }]
        );
    }
}

#[test]
fn test_gateway_failure_moves_to_target() {
    let mut h = Harness::new();
    let zealots = spawn_line(&mut h.world, UnitKind::Zealot, 3, Vec2::new(1000.0, 1000.0));
    spawn_enemy(&mut h.world, UnitKind::Zergling, Vec2::new(1100.0, 1000.0), 1);

    let mut engine = TacticsEngine::new(TacticsConfig::default());
    let id = squad_with(&mut engine, &h.world, Mission::AttackBase, enemy_main(), &zealots);

    h.run(&mut engine, 1, &FailingSim);
    let cluster = only_cluster(&engine, id);
    assert_eq!(cluster.activity(), Activity::Moving);
    assert!(cluster.history().is_empty());
    for zealot in &zealots {
        assert_eq!(
            h.orders.orders_for(*zealot),
            vec![Order::Move {
                unit: *zealot,
                position: enemy_main()
            }]
        );
    }
}

#[test]
fn test_no_enemies_moves_without_simulating() {
    let mut h = Harness::new();
    let zealots = spawn_line(&mut h.world, UnitKind::Zealot, 2, Vec2::new(1000.0, 1000.0));

    let mut engine = TacticsEngine::new(TacticsConfig::default());
    let id = squad_with(&mut engine, &h.world, Mission::AttackBase, enemy_main(), &zealots);

    // The failing simulator would leave a trace if it were consulted
    let report = h.run(&mut engine, 1, &FailingSim);
    assert_eq!(report.squads[0].clusters[0].engaged, None);
    assert_eq!(only_cluster(&engine, id).activity(), Activity::Moving);
    assert_eq!(h.orders.orders.len(), zealots.len());
}

// ---- Cluster ----

#[test]
fn test_set_activity_idempotent() {
    let mut cluster = UnitCluster::new(0, 16);
    cluster.set_activity(Activity::Regrouping, SubActivity::Flee, 5);
    let history_len = cluster.history().len();

    cluster.set_activity(Activity::Regrouping, SubActivity::Flee, 9);
    assert_eq!(cluster.activity(), Activity::Regrouping);
    assert_eq!(cluster.sub_activity(), SubActivity::Flee);
    assert_eq!(cluster.last_activity_change(), 5);
    assert_eq!(cluster.history().len(), history_len);
}

#[test]
fn test_sub_activity_change_records_frame() {
    let mut cluster = UnitCluster::new(0, 16);
    cluster.set_activity(Activity::Regrouping, SubActivity::Flee, 5);
    cluster.set_activity(Activity::Regrouping, SubActivity::StandGround, 7);
    assert_eq!(cluster.sub_activity(), SubActivity::StandGround);
    assert_eq!(cluster.last_activity_change(), 7);
}

#[test]
fn test_leaving_regroup_clears_regroup_history() {
    let mut cluster = UnitCluster::new(0, 16);
    cluster.set_activity(Activity::Regrouping, SubActivity::ContainChoke, 1);
    cluster.regroup_history_mut().push(
        CombatSimResult {
            frame: 1,
            ..Default::default()
        },
        true,
    );
    cluster.set_activity(Activity::Moving, SubActivity::None, 2);
    assert!(cluster.regroup_history().is_empty());
}

#[test]
fn test_update_positions_drops_dead_units() {
    let mut world = World::new();
    let a = spawn_friendly(&mut world, UnitKind::Zealot, Vec2::new(0.0, 0.0));
    let b = spawn_friendly(&mut world, UnitKind::Zealot, Vec2::new(100.0, 0.0));
    let mut cluster = UnitCluster::new(0, 16);
    cluster.add_unit(a);
    cluster.add_unit(b);

    world.despawn(b).unwrap();
    let dropped = cluster.update_positions(&world, Vec2::new(1000.0, 0.0), None, None);
    assert_eq!(dropped, vec![b]);
    assert_eq!(cluster.len(), 1);
    assert_eq!(cluster.center, Vec2::new(0.0, 0.0));
    assert_eq!(cluster.vanguard, Some(a));
}

#[test]
fn test_vanguard_prefers_ground_units() {
    let mut world = World::new();
    let ground = spawn_friendly(&mut world, UnitKind::Dragoon, Vec2::new(0.0, 0.0));
    let flyer = spawn_friendly(&mut world, UnitKind::Corsair, Vec2::new(500.0, 0.0));
    let mut cluster = UnitCluster::new(0, 16);
    cluster.add_unit(ground);
    cluster.add_unit(flyer);

    cluster.update_positions(&world, Vec2::new(1000.0, 0.0), Some(Vec2::ZERO), Some(Vec2::new(2000.0, 0.0)));
    assert_eq!(cluster.vanguard, Some(ground));
    assert_eq!(cluster.percentage_to_enemy_main, 0.0);
}

#[test]
fn test_dead_cluster_removed() {
    let mut h = Harness::new();
    let near = spawn_friendly(&mut h.world, UnitKind::Zealot, Vec2::new(1000.0, 1000.0));
    let far = spawn_friendly(&mut h.world, UnitKind::Zealot, Vec2::new(2500.0, 1000.0));

    let mut engine = TacticsEngine::new(TacticsConfig::default());
    let id = squad_with(&mut engine, &h.world, Mission::AttackBase, enemy_main(), &[near, far]);
    assert_eq!(engine.squad(id).unwrap().clusters().len(), 2);

    h.world.despawn(far).unwrap();
    h.run(&mut engine, 1, &winning());
    let squad = engine.squad(id).unwrap();
    assert_eq!(squad.clusters().len(), 1);
    assert_eq!(squad.vanguard_cluster().unwrap().vanguard, Some(near));
    assert!(!squad.contains(far));
    assert_eq!(engine.squad_of(far), None);
    assert_eq!(engine.squad_of(near), Some(id));
}

#[test]
fn test_merge_keeps_larger_cluster_history() {
    let mut h = Harness::new();
    let main_body = spawn_line(&mut h.world, UnitKind::Zealot, 3, Vec2::new(1000.0, 1000.0));
    let straggler = spawn_friendly(&mut h.world, UnitKind::Zealot, Vec2::new(1600.0, 1000.0));

    let mut squad = Squad::new(
        SquadId(0),
        "merge",
        Mission::AttackBase,
        enemy_main(),
        &h.config,
    );
    for unit in main_body.iter().chain([&straggler]) {
        squad.add_unit(&h.world, *unit).unwrap();
    }
    assert_eq!(squad.clusters().len(), 2);
    let big = squad.cluster_of(main_body[0]).unwrap().id;
    squad.cluster_mut(big).unwrap().add_sim_result(
        CombatSimResult {
            frame: 1,
            ..Default::default()
        },
        true,
    );

    *h.world.get::<&mut Position>(straggler).unwrap() = Vec2::new(1200.0, 1000.0);
    let sim = winning();
    let ctx = h.ctx(2, &sim);
    squad.update_clusters(&ctx);

    assert_eq!(squad.clusters().len(), 1);
    let merged = &squad.clusters()[0];
    assert_eq!(merged.id, big);
    assert_eq!(merged.len(), 4);
    assert_eq!(merged.history().len(), 1);
    assert_eq!(squad.cluster_of(straggler).unwrap().id, big);
}

#[test]
fn test_far_member_split_out() {
    let mut h = Harness::new();
    let body = spawn_line(&mut h.world, UnitKind::Zealot, 3, Vec2::new(1000.0, 1000.0));
    let mut squad = Squad::new(
        SquadId(0),
        "split",
        Mission::AttackBase,
        enemy_main(),
        &h.config,
    );
    for unit in &body {
        squad.add_unit(&h.world, *unit).unwrap();
    }
    *h.world.get::<&mut Position>(body[2]).unwrap() = Vec2::new(3000.0, 1000.0);

    let sim = winning();
    let ctx = h.ctx(1, &sim);
    squad.update_clusters(&ctx);
    assert_eq!(squad.clusters().len(), 2);
    assert_ne!(
        squad.cluster_of(body[0]).unwrap().id,
        squad.cluster_of(body[2]).unwrap().id
    );
}

// ---- Target selection ----

#[test]
fn test_select_targets_deterministic() {
    let mut world = World::new();
    let members = spawn_line(&mut world, UnitKind::Dragoon, 3, Vec2::new(0.0, 0.0));
    let enemies: Vec<Entity> = (0..4)
        .map(|i| spawn_enemy(&mut world, UnitKind::Zergling, Vec2::new(150.0, i as f32 * 20.0), 1))
        .collect();

    let first = select_targets(&world, &members, &enemies, Vec2::new(500.0, 0.0), 1, &[]);
    let second = select_targets(&world, &members, &enemies, Vec2::new(500.0, 0.0), 1, &[]);
    assert_eq!(first, second);
    assert_eq!(first.len(), members.len());
    assert!(first.iter().all(|pair| pair.target.is_some()));
}

#[test]
fn test_select_targets_skips_undetected_and_missing() {
    let mut world = World::new();
    let members = spawn_line(&mut world, UnitKind::Dragoon, 1, Vec2::new(0.0, 0.0));
    let hidden = spawn_enemy_with(
        &mut world,
        UnitKind::Lurker,
        Vec2::new(100.0, 0.0),
        Sighting {
            detected: false,
            ..fresh_sighting(1)
        },
    );
    let gone = spawn_enemy(&mut world, UnitKind::Zergling, Vec2::new(120.0, 0.0), 1);
    world.despawn(gone).unwrap();

    let pairing = select_targets(&world, &members, &[hidden, gone], Vec2::ZERO, 1, &[]);
    assert_eq!(pairing.len(), 1);
    assert_eq!(pairing[0].target, None);
}

// ---- Missions ----

/// Narrow choke east of our main at (800, 500).
fn narrow_choke() -> Choke {
    Choke {
        center: Vec2::new(800.0, 500.0),
        width: 64.0,
        length: 64.0,
        near_end: Vec2::new(760.0, 500.0),
        far_end: Vec2::new(840.0, 500.0),
    }
}

/// Friendly unit outside the squad, heading out through the choke.
fn spawn_transit_worker(world: &mut World) -> Entity {
    let worker = spawn_friendly(world, UnitKind::Probe, Vec2::new(600.0, 500.0));
    world
        .insert_one(
            worker,
            Heading {
                destination: Vec2::new(1100.0, 500.0),
            },
        )
        .unwrap();
    worker
}

fn assert_moved_to(h: &Harness, units: &[Entity], position: Position) {
    for unit in units {
        assert_eq!(
            h.orders.orders_for(*unit),
            vec![Order::Move { unit: *unit, position }],
            "orders for {unit:?}"
        );
    }
}

#[test]
fn test_defender_holds_while_friendly_in_transit() {
    let mut h = Harness::new();
    h.map.my_bases[0].choke = Some(narrow_choke());
    let zealots = spawn_line(&mut h.world, UnitKind::Zealot, 2, Vec2::new(700.0, 500.0));
    // Outside the base, at the edge of the choke's reach
    spawn_enemy(&mut h.world, UnitKind::Zergling, Vec2::new(990.0, 500.0), 1);
    spawn_transit_worker(&mut h.world);

    let mut engine = TacticsEngine::new(TacticsConfig::default());
    let id = squad_with(
        &mut engine,
        &h.world,
        Mission::DefendBase { base: BaseId(0) },
        Vec2::new(500.0, 500.0),
        &zealots,
    );

    h.run(&mut engine, 1, &losing());
    let cluster = only_cluster(&engine, id);
    assert_eq!(cluster.activity(), Activity::Attacking);
    let last = cluster.history().last().unwrap();
    assert!(last.engaged);
    assert_eq!(last.forced, Some(ForcedReason::FriendlyInTransit));
    assert_eq!(engine.squad(id).unwrap().target_position, Vec2::new(800.0, 500.0));
    // Enemy in reach: hold our end of the choke, do not pull back to the minerals
    assert_moved_to(&h, &zealots, Vec2::new(760.0, 500.0));
}

#[test]
fn test_defender_clears_choke_for_friendly_when_quiet() {
    let mut h = Harness::new();
    h.map.my_bases[0].choke = Some(narrow_choke());
    let zealots = spawn_line(&mut h.world, UnitKind::Zealot, 2, Vec2::new(700.0, 500.0));
    spawn_transit_worker(&mut h.world);

    let mut engine = TacticsEngine::new(TacticsConfig::default());
    let id = squad_with(
        &mut engine,
        &h.world,
        Mission::DefendBase { base: BaseId(0) },
        Vec2::new(500.0, 500.0),
        &zealots,
    );

    h.run(&mut engine, 1, &winning());
    let cluster = only_cluster(&engine, id);
    assert_eq!(cluster.activity(), Activity::Attacking);
    assert_eq!(cluster.history().last().unwrap().forced, Some(ForcedReason::FriendlyInTransit));
    assert_moved_to(&h, &zealots, Vec2::new(450.0, 500.0));
}

#[test]
fn test_undetected_threat_forces_defenders_out() {
    let mut h = Harness::new();
    h.map.my_bases[0].choke = Some(narrow_choke());
    let zealots = spawn_line(&mut h.world, UnitKind::Zealot, 2, Vec2::new(700.0, 500.0));
    let cloaked = Sighting {
        detected: false,
        ..fresh_sighting(1)
    };
    spawn_enemy_with(&mut h.world, UnitKind::DarkTemplar, Vec2::new(820.0, 500.0), cloaked);

    let mut engine = TacticsEngine::new(TacticsConfig::default());
    let id = squad_with(
        &mut engine,
        &h.world,
        Mission::DefendBase { base: BaseId(0) },
        Vec2::new(500.0, 500.0),
        &zealots,
    );

    // Nothing can be targeted, yet the defenders must still commit
    let report = h.run(&mut engine, 1, &losing());
    assert_eq!(report.squads[0].clusters[0].engaged, Some(true));
    assert_eq!(report.squads[0].clusters[0].forced, Some(ForcedReason::UndetectedThreat));
    let cluster = only_cluster(&engine, id);
    assert_eq!(cluster.activity(), Activity::Attacking);
    let last = cluster.history().last().unwrap();
    assert!(last.engaged);
    assert_eq!(last.forced, Some(ForcedReason::UndetectedThreat));
    assert_eq!(last.result.frame, 1);
    assert!(h.attack_targets().is_empty());
    assert_moved_to(&h, &zealots, Vec2::new(800.0, 500.0));
}

#[test]
fn test_blocked_choke_forces_defenders_to_hold() {
    let mut h = Harness::new();
    h.map.my_bases[0].choke = Some(narrow_choke());
    let zealots = spawn_line(&mut h.world, UnitKind::Zealot, 2, Vec2::new(700.0, 500.0));
    // Inside the choke mouth, so not yet in the base
    spawn_enemy(&mut h.world, UnitKind::Zergling, Vec2::new(830.0, 500.0), 1);

    let mut engine = TacticsEngine::new(TacticsConfig::default());
    let id = squad_with(
        &mut engine,
        &h.world,
        Mission::DefendBase { base: BaseId(0) },
        Vec2::new(500.0, 500.0),
        &zealots,
    );

    h.run(&mut engine, 1, &losing());
    let cluster = only_cluster(&engine, id);
    assert_eq!(cluster.activity(), Activity::Attacking);
    assert_eq!(cluster.history().last().unwrap().forced, Some(ForcedReason::ChokeBlocked));
    assert_moved_to(&h, &zealots, Vec2::new(760.0, 500.0));
}

#[test]
fn test_single_defender_cannot_block_choke() {
    let mut h = Harness::new();
    h.map.my_bases[0].choke = Some(narrow_choke());
    let zealot = spawn_friendly(&mut h.world, UnitKind::Zealot, Vec2::new(700.0, 500.0));
    spawn_enemy(&mut h.world, UnitKind::Zergling, Vec2::new(830.0, 500.0), 1);

    let mut engine = TacticsEngine::new(TacticsConfig::default());
    let id = squad_with(
        &mut engine,
        &h.world,
        Mission::DefendBase { base: BaseId(0) },
        Vec2::new(500.0, 500.0),
        &[zealot],
    );

    h.run(&mut engine, 1, &losing());
    let cluster = only_cluster(&engine, id);
    assert_eq!(cluster.activity(), Activity::Regrouping);
    let last = cluster.history().last().unwrap();
    assert!(!last.engaged);
    assert_eq!(last.forced, None);
}

#[test]
fn test_defender_falls_back_to_mineral_line() {
    let mut h = Harness::new();
    let zealots = spawn_line(&mut h.world, UnitKind::Zealot, 2, Vec2::new(700.0, 500.0));
    spawn_enemy(&mut h.world, UnitKind::Zergling, Vec2::new(750.0, 500.0), 1);

    let mut engine = TacticsEngine::new(TacticsConfig::default());
    let id = squad_with(
        &mut engine,
        &h.world,
        Mission::DefendBase { base: BaseId(0) },
        Vec2::new(500.0, 500.0),
        &zealots,
    );

    h.run(&mut engine, 1, &losing());
    let cluster = only_cluster(&engine, id);
    assert_eq!(cluster.activity(), Activity::Regrouping);
    assert_eq!(cluster.sub_activity(), SubActivity::None);
    // Outside the mineral line and close to the raider: go back to the minerals
    for zealot in &zealots {
        assert_eq!(
            h.orders.orders_for(*zealot),
            vec![Order::Move {
                unit: *zealot,
                position: Vec2::new(450.0, 500.0)
            }]
        );
    }
}

#[test]
fn test_air_patrol_scouts_least_recent_enemy_base() {
    let mut h = Harness::new();
    h.map.enemy_bases = vec![base(1, 3000.0, 3000.0, 500), base(2, 3000.0, 500.0, 100)];
    let corsair = spawn_friendly(&mut h.world, UnitKind::Corsair, Vec2::new(1000.0, 1000.0));

    let mut engine = TacticsEngine::new(TacticsConfig::default());
    let id = squad_with(&mut engine, &h.world, Mission::AirHarass, enemy_main(), &[corsair]);

    h.run(&mut engine, 1, &winning());
    assert_eq!(engine.squad(id).unwrap().target_position, Vec2::new(3000.0, 500.0));
    assert_eq!(only_cluster(&engine, id).activity(), Activity::Moving);
    let orders = h.orders.orders_for(corsair);
    assert_eq!(orders.len(), 1);
    assert!(matches!(orders[0], Order::Move { .. }));
}

#[test]
fn test_mop_up_hunts_building_base() {
    let mut h = Harness::new();
    h.map.untaken = vec![base(5, 2050.0, 1000.0, 0)];
    let zealot = spawn_friendly(&mut h.world, UnitKind::Zealot, Vec2::new(1000.0, 1000.0));
    spawn_enemy(&mut h.world, UnitKind::Hatchery, Vec2::new(2000.0, 1000.0), 1);

    let mut engine = TacticsEngine::new(TacticsConfig::default());
    let id = squad_with(&mut engine, &h.world, Mission::MopUp, Vec2::new(500.0, 500.0), &[zealot]);

    h.run(&mut engine, 1, &winning());
    assert_eq!(only_cluster(&engine, id).activity(), Activity::Moving);
    assert_eq!(
        h.orders.orders_for(zealot),
        vec![Order::Move {
            unit: zealot,
            position: Vec2::new(2050.0, 1000.0)
        }]
    );
}

#[test]
fn test_mop_up_scouts_untaken_expansion() {
    let mut h = Harness::new();
    h.map.untaken = vec![base(5, 2000.0, 1000.0, 300), base(6, 1000.0, 2000.0, 50)];
    let zealot = spawn_friendly(&mut h.world, UnitKind::Zealot, Vec2::new(1000.0, 1000.0));

    let mut engine = TacticsEngine::new(TacticsConfig::default());
    squad_with(&mut engine, &h.world, Mission::MopUp, Vec2::new(500.0, 500.0), &[zealot]);

    h.run(&mut engine, 1, &winning());
    assert_eq!(
        h.orders.orders_for(zealot),
        vec![Order::Move {
            unit: zealot,
            position: Vec2::new(1000.0, 2000.0)
        }]
    );
}

#[test]
fn test_mop_up_rallies_when_nothing_left_to_hunt() {
    let mut h = Harness::new();
    let zealot = spawn_friendly(&mut h.world, UnitKind::Zealot, Vec2::new(1000.0, 1000.0));

    let mut engine = TacticsEngine::new(TacticsConfig::default());
    let id = squad_with(&mut engine, &h.world, Mission::MopUp, Vec2::new(2000.0, 2000.0), &[zealot]);

    h.run(&mut engine, 1, &winning());
    assert_eq!(only_cluster(&engine, id).activity(), Activity::Moving);
    assert_moved_to(&h, &[zealot], Vec2::new(500.0, 500.0));
}

#[test]
fn test_retreat_modelling_follows_config() {
    for include_retreat in [true, false] {
        let mut h = Harness::new();
        let zealot = spawn_friendly(&mut h.world, UnitKind::Zealot, Vec2::new(1000.0, 1000.0));
        spawn_enemy(&mut h.world, UnitKind::Zergling, Vec2::new(1100.0, 1000.0), 1);

        let config = TacticsConfig {
            include_retreat,
            ..TacticsConfig::default()
        };
        let mut engine = TacticsEngine::new(config);
        squad_with(&mut engine, &h.world, Mission::MopUp, Vec2::new(2000.0, 2000.0), &[zealot]);

        let spy = retreat_spy();
        h.run(&mut engine, 1, &spy);
        assert_eq!(spy.include_retreat.get(), Some(include_retreat));
    }
}

#[test]
fn test_defenders_never_model_retreat() {
    let mut h = Harness::new();
    let zealots = spawn_line(&mut h.world, UnitKind::Zealot, 2, Vec2::new(700.0, 500.0));
    spawn_enemy(&mut h.world, UnitKind::Zergling, Vec2::new(750.0, 500.0), 1);

    let mut engine = TacticsEngine::new(TacticsConfig::default());
    assert!(engine.config().include_retreat);
    squad_with(
        &mut engine,
        &h.world,
        Mission::DefendBase { base: BaseId(0) },
        Vec2::new(500.0, 500.0),
        &zealots,
    );

    let spy = retreat_spy();
    h.run(&mut engine, 1, &spy);
    assert_eq!(spy.include_retreat.get(), Some(false));
}

// ---- Rally point ----

#[test]
fn test_rally_prefers_powered_static_defense() {
    let mut h = Harness::new();
    spawn_friendly_structure(&mut h.world, UnitKind::PhotonCannon, Vec2::new(2000.0, 2000.0), false);
    let mut cluster = UnitCluster::new(0, 16);
    cluster.center = Vec2::new(1500.0, 1500.0);

    let sim = winning();
    assert_eq!(rally_point(&cluster, None, &h.ctx(1, &sim)), Vec2::new(500.0, 500.0));

    spawn_friendly_structure(&mut h.world, UnitKind::PhotonCannon, Vec2::new(1200.0, 1200.0), true);
    assert_eq!(rally_point(&cluster, None, &h.ctx(1, &sim)), Vec2::new(1200.0, 1200.0));
}

// ---- Worker defense ----

#[test]
fn test_worker_pulled_against_uncovered_raider() {
    let mut h = Harness::new();
    let worker = spawn_friendly(&mut h.world, UnitKind::Probe, Vec2::new(450.0, 500.0));
    let idle = spawn_friendly(&mut h.world, UnitKind::Probe, Vec2::new(450.0, 700.0));
    let ling = spawn_enemy(&mut h.world, UnitKind::Zergling, Vec2::new(460.0, 500.0), 1);

    let mut engine = TacticsEngine::new(TacticsConfig::default());
    engine.add_squad("defend main", Mission::DefendBase { base: BaseId(0) }, Vec2::new(500.0, 500.0));

    let report = h.run(&mut engine, 1, &winning());
    let defense = report.squads[0].worker_defense.clone().unwrap();
    assert!(!defense.full_defense);
    assert_eq!(defense.threats, vec![ling.to_bits().get()]);
    assert_eq!(defense.fighting, vec![worker.to_bits().get()]);
    assert_eq!(
        h.orders.orders_for(worker),
        vec![Order::Attack {
            unit: worker,
            target: ling
        }]
    );
    assert!(h.orders.orders_for(idle).is_empty());
}

#[test]
fn test_outnumbered_base_triggers_full_worker_defense() {
    let mut h = Harness::new();
    let workers = spawn_line(&mut h.world, UnitKind::Probe, 4, Vec2::new(450.0, 480.0));
    for i in 0..3 {
        spawn_enemy(&mut h.world, UnitKind::Zergling, Vec2::new(460.0, 480.0 + i as f32 * 10.0), 1);
    }

    let mut engine = TacticsEngine::new(TacticsConfig::default());
    engine.add_squad("defend main", Mission::DefendBase { base: BaseId(0) }, Vec2::new(500.0, 500.0));

    let report = h.run(&mut engine, 1, &winning());
    let defense = report.squads[0].worker_defense.clone().unwrap();
    assert!(defense.full_defense);
    for worker in &workers {
        let orders = h.orders.orders_for(*worker);
        assert_eq!(orders.len(), 1);
        assert!(matches!(orders[0], Order::Attack { .. }));
    }
}

#[test]
fn test_workers_released_when_threat_leaves() {
    let mut h = Harness::new();
    let worker = spawn_friendly(&mut h.world, UnitKind::Probe, Vec2::new(450.0, 500.0));
    let ling = spawn_enemy(&mut h.world, UnitKind::Zergling, Vec2::new(460.0, 500.0), 1);

    let mut engine = TacticsEngine::new(TacticsConfig::default());
    engine.add_squad("defend main", Mission::DefendBase { base: BaseId(0) }, Vec2::new(500.0, 500.0));
    h.run(&mut engine, 1, &winning());

    h.world.despawn(ling).unwrap();
    let report = h.run(&mut engine, 2, &winning());
    let defense = report.squads[0].worker_defense.clone().unwrap();
    assert!(defense.threats.is_empty());
    assert_eq!(defense.released, vec![worker.to_bits().get()]);
}

// ---- Engine ----

#[test]
fn test_assign_unit_moves_between_squads() {
    let mut world = World::new();
    let zealot = spawn_friendly(&mut world, UnitKind::Zealot, Vec2::new(0.0, 0.0));

    let mut engine = TacticsEngine::new(TacticsConfig::default());
    let first = engine.add_squad("first", Mission::AttackBase, enemy_main());
    let second = engine.add_squad("second", Mission::MopUp, enemy_main());

    engine.assign_unit(&world, first, zealot).unwrap();
    engine.assign_unit(&world, second, zealot).unwrap();
    assert!(!engine.squad(first).unwrap().contains(zealot));
    assert!(engine.squad(second).unwrap().contains(zealot));
    assert_eq!(engine.squad_of(zealot), Some(second));

    engine.squad_mut(second).unwrap().target_position = Vec2::new(100.0, 100.0);
    assert_eq!(engine.squads().count(), 2);

    assert_eq!(engine.disband_squad(second).unwrap(), vec![zealot]);
    assert_eq!(engine.squad_of(zealot), None);
    assert!(matches!(
        engine.disband_squad(second),
        Err(TacticsError::SquadMissing(_))
    ));
}

#[test]
fn test_assign_missing_unit_rejected() {
    let mut world = World::new();
    let ghost = spawn_friendly(&mut world, UnitKind::Zealot, Vec2::new(0.0, 0.0));
    world.despawn(ghost).unwrap();

    let mut engine = TacticsEngine::new(TacticsConfig::default());
    let id = engine.add_squad("army", Mission::AttackBase, enemy_main());
    assert!(matches!(
        engine.assign_unit(&world, id, ghost),
        Err(TacticsError::UnitMissing(_))
    ));
    assert_eq!(engine.squad_of(ghost), None);
}

#[test]
fn test_rejected_orders_are_counted() {
    let mut h = Harness::new();
    let zealots = spawn_line(&mut h.world, UnitKind::Zealot, 3, Vec2::new(1000.0, 1000.0));
    h.orders.rejected = vec![zealots[0], zealots[2]];

    let mut engine = TacticsEngine::new(TacticsConfig::default());
    squad_with(&mut engine, &h.world, Mission::AttackBase, enemy_main(), &zealots);

    let report = h.run(&mut engine, 1, &winning());
    assert_eq!(report.failed_orders, 2);
    assert_eq!(h.orders.orders.len(), 1);
}

#[test]
fn test_engine_from_json_rejects_bad_config() {
    assert!(TacticsEngine::from_json("{}").is_ok());
    assert!(matches!(
        TacticsEngine::from_json(r#"{"start_aggression": -1.0}"#),
        Err(TacticsError::InvalidConfig(_))
    ));
}

// ---- Determinism ----

fn seeded_run(seed: u64) -> (Vec<String>, Vec<Order>) {
    let mut h = Harness::new();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let skirmish = spawn_skirmish(&mut h.world, &mut rng, Vec2::new(1500.0, 1500.0), 300.0, 6, 8, 1);

    let mut engine = TacticsEngine::new(TacticsConfig::default());
    squad_with(&mut engine, &h.world, Mission::AttackBase, enemy_main(), &skirmish.friendly);

    let sim = AttritionSimulator::default();
    let reports = (1..=20)
        .map(|frame| serde_json::to_string(&h.run(&mut engine, frame, &sim)).unwrap())
        .collect();
    (reports, h.orders.orders)
}

#[test]
fn test_determinism_same_seed() {
    let (reports_a, orders_a) = seeded_run(7);
    let (reports_b, orders_b) = seeded_run(7);
    assert_eq!(reports_a, reports_b, "Frame reports diverged with same seed");
    assert_eq!(orders_a, orders_b, "Orders diverged with same seed");
    assert!(!orders_a.is_empty());
}
