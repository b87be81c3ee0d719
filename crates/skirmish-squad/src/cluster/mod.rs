//! Unit clusters: groups of friendly units that move and fight as one body.
//!
//! A cluster owns its activity state and its verdict histories. Membership is
//! a set of entities that is revalidated against the world every frame.

pub mod combat_sim;
pub mod micro;
pub mod targeting;

use std::collections::BTreeSet;

use hecs::{Entity, World};
use tracing::{debug, info};

use skirmish_core::enums::{Activity, SubActivity};
use skirmish_core::result::CombatSimResult;
use skirmish_core::types::{Frame, Position};
use skirmish_tactics::config::TacticsConfig;
use skirmish_tactics::history::VerdictHistory;

use crate::units::{self, FriendlyUnit};

use self::targeting::Pairing;

fn closest_to<'a>(
    candidates: impl Iterator<Item = &'a FriendlyUnit>,
    target: Position,
) -> Option<FriendlyUnit> {
    candidates
        .min_by(|a, b| {
            a.position
                .distance(target)
                .total_cmp(&b.position.distance(target))
                .then(a.id.cmp(&b.id))
        })
        .copied()
}

/// A cohesive group of friendly units under one activity state.
#[derive(Debug, Clone)]
pub struct UnitCluster {
    pub id: u32,
    units: BTreeSet<Entity>,
    pub center: Position,
    /// Member closest to the objective.
    pub vanguard: Option<Entity>,
    pub vanguard_position: Position,
    pub vanguard_distance_to_target: f32,
    pub vanguard_distance_to_main: f32,
    /// Vanguard progress from our main (0.0) to the enemy main (1.0).
    pub percentage_to_enemy_main: f64,
    activity: Activity,
    sub_activity: SubActivity,
    last_activity_change: Frame,
    history: VerdictHistory,
    regroup_history: VerdictHistory,
    /// Pairing from the most recent target selection.
    pub pairing: Vec<Pairing>,
}

impl UnitCluster {
    pub fn new(id: u32, history_capacity: usize) -> Self {
        Self {
            id,
            units: BTreeSet::new(),
            center: Position::ZERO,
            vanguard: None,
            vanguard_position: Position::ZERO,
            vanguard_distance_to_target: 0.0,
            vanguard_distance_to_main: 0.0,
            percentage_to_enemy_main: 0.5,
            activity: Activity::default(),
            sub_activity: SubActivity::default(),
            last_activity_change: 0,
            history: VerdictHistory::new(history_capacity),
            regroup_history: VerdictHistory::new(history_capacity),
            pairing: Vec::new(),
        }
    }

    pub fn units(&self) -> impl Iterator<Item = Entity> + '_ {
        self.units.iter().copied()
    }

    /// Members as a vector, in entity order.
    pub fn members(&self) -> Vec<Entity> {
        self.units.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn contains(&self, unit: Entity) -> bool {
        self.units.contains(&unit)
    }

    pub fn add_unit(&mut self, unit: Entity) {
        self.units.insert(unit);
    }

    pub fn remove_unit(&mut self, unit: Entity) -> bool {
        self.pairing.retain(|p| p.unit != unit);
        self.units.remove(&unit)
    }

    pub fn activity(&self) -> Activity {
        self.activity
    }

    pub fn sub_activity(&self) -> SubActivity {
        self.sub_activity
    }

    pub fn last_activity_change(&self) -> Frame {
        self.last_activity_change
    }

    pub fn history(&self) -> &VerdictHistory {
        &self.history
    }

    /// History the decision policy records into.
    pub fn history_mut(&mut self) -> &mut VerdictHistory {
        &mut self.history
    }

    pub fn regroup_history(&self) -> &VerdictHistory {
        &self.regroup_history
    }

    pub fn regroup_history_mut(&mut self) -> &mut VerdictHistory {
        &mut self.regroup_history
    }

    /// Append one verdict. Called exactly once per policy evaluation.
    pub fn add_sim_result(&mut self, result: CombatSimResult, engaged: bool) {
        self.history.push(result, engaged);
    }

    /// Change activity. Re-affirming the current state is a no-op.
    ///
    /// Switching to `Attacking` requires an engaged verdict for this frame.
    pub fn set_activity(&mut self, activity: Activity, sub_activity: SubActivity, frame: Frame) {
        if activity == self.activity && sub_activity == self.sub_activity {
            return;
        }
        debug_assert!(
            activity != Activity::Attacking
                || self
                    .history
                    .last()
                    .is_some_and(|verdict| verdict.engaged && verdict.result.frame == frame),
            "cluster {} attacking without an engaged verdict on frame {}",
            self.id,
            frame
        );

        if activity != self.activity {
            info!(
                cluster = self.id,
                frame,
                from = ?self.activity,
                to = ?activity,
                ?sub_activity,
                "cluster activity changed"
            );
            if self.activity == Activity::Regrouping {
                self.regroup_history.clear();
            }
            self.activity = activity;
        } else {
            debug!(cluster = self.id, frame, from = ?self.sub_activity, to = ?sub_activity, "sub-activity changed");
        }
        self.sub_activity = sub_activity;
        self.last_activity_change = frame;
    }

    /// Drop dead members and recompute center, vanguard and progress.
    ///
    /// Returns the members that were dropped.
    pub fn update_positions(
        &mut self,
        world: &World,
        target: Position,
        my_main: Option<Position>,
        enemy_main: Option<Position>,
    ) -> Vec<Entity> {
        let mut alive: Vec<FriendlyUnit> = Vec::with_capacity(self.units.len());
        let mut dropped = Vec::new();
        for id in self.units.iter().copied() {
            match units::friendly(world, id) {
                Some(unit) => alive.push(unit),
                None => dropped.push(id),
            }
        }
        for id in &dropped {
            self.remove_unit(*id);
        }
        if alive.is_empty() {
            self.vanguard = None;
            return dropped;
        }

        let sum = alive.iter().fold(Position::ZERO, |acc, u| acc + u.position);
        self.center = sum / alive.len() as f32;

        let vanguard = closest_to(alive.iter().filter(|u| !u.flying()), target)
            .or_else(|| closest_to(alive.iter(), target));

        if let Some(vanguard) = vanguard {
            self.vanguard = Some(vanguard.id);
            self.vanguard_position = vanguard.position;
            self.vanguard_distance_to_target = vanguard.position.distance(target);
            let to_main = my_main.map_or(0.0, |main| vanguard.position.distance(main));
            let to_enemy = enemy_main.map_or(self.vanguard_distance_to_target, |main| {
                vanguard.position.distance(main)
            });
            self.vanguard_distance_to_main = to_main;
            let total = to_main + to_enemy;
            self.percentage_to_enemy_main = if total <= f32::EPSILON {
                0.5
            } else {
                (to_main / total) as f64
            };
        }
        dropped
    }

    /// Members farther than `distance` from the center.
    pub fn outliers(&self, world: &World, distance: f32) -> Vec<Entity> {
        self.units
            .iter()
            .copied()
            .filter_map(|id| units::friendly(world, id))
            .filter(|u| u.position.distance(self.center) > distance)
            .map(|u| u.id)
            .collect()
    }

    /// Take over another cluster's members. Its history is discarded.
    pub fn absorb(&mut self, other: UnitCluster) {
        info!(
            cluster = self.id,
            absorbed = other.id,
            units = other.len(),
            "clusters combined"
        );
        self.units.extend(other.units);
    }

    /// Radius within which enemies are pulled into the simulation.
    pub fn simulation_radius(&self, config: &TacticsConfig) -> f32 {
        let reach = if self.vanguard.is_some() {
            self.vanguard_position.distance(self.center)
        } else {
            0.0
        };
        config.sim_radius_base + reach
    }

    pub fn living(&self, world: &World) -> Vec<FriendlyUnit> {
        self.units
            .iter()
            .copied()
            .filter_map(|id| units::friendly(world, id))
            .collect()
    }

    pub fn hits_ground(&self, world: &World) -> bool {
        self.living(world).iter().any(|u| u.kind.can_attack_ground())
    }

    pub fn hits_air(&self, world: &World) -> bool {
        self.living(world).iter().any(|u| u.kind.can_attack_air())
    }

    /// Whether every member flies.
    pub fn is_flying(&self, world: &World) -> bool {
        let living = self.living(world);
        !living.is_empty() && living.iter().all(|u| u.flying())
    }

    /// Whether the cluster holds a unit strong enough to rally around.
    pub fn has_anchor(&self, world: &World) -> bool {
        self.living(world).iter().any(|u| u.kind.stats().anchor)
    }
}
