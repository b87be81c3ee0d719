//! Worker self-defense for a defended base.
//!
//! Workers only fight melee ground raiders in the mineral line, or raiders
//! that have just hit a worker. Threats our combat units are already
//! converging on are left to them; workers are only pulled against the rest.
//! When uncovered threats outnumber the defenders by more than one, every
//! worker at the base joins in.

use std::collections::BTreeSet;

use hecs::{Entity, World};
use serde::Serialize;
use tracing::{debug, info};

use skirmish_core::constants::{MINERAL_LINE_RADIUS, WORKER_THREAT_DISTANCE, WORKER_THREAT_WINDOW};
use skirmish_core::components::Friendly;
use skirmish_core::types::{BaseId, Frame, Position};
use skirmish_core::unit_kinds::UnitKind;

use crate::context::FrameContext;
use crate::map::BaseInfo;
use crate::squad::Squad;
use crate::units::{self, EnemyUnit, FriendlyUnit};

/// A reserved worker keeps fighting a threat within this distance.
const RESERVED_REACH: f32 = 48.0;

/// Outcome of one worker-defense pass, with units as entity bits.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorkerDefenseReport {
    pub threats: Vec<u64>,
    /// Threats already handled by the defending squad.
    pub covered: Vec<u64>,
    /// Workers fighting this frame.
    pub fighting: Vec<u64>,
    /// Workers handed back to mining this frame.
    pub released: Vec<u64>,
    pub full_defense: bool,
}

fn bits(entity: Entity) -> u64 {
    entity.to_bits().get()
}

/// Worker-defense state for one base.
#[derive(Debug, Clone)]
pub struct WorkerDefense {
    pub base: BaseId,
    reserved: BTreeSet<Entity>,
}

impl WorkerDefense {
    pub fn new(base: BaseId) -> Self {
        Self {
            base,
            reserved: BTreeSet::new(),
        }
    }

    /// Release every reserved worker.
    pub fn disband(&mut self) -> Vec<Entity> {
        std::mem::take(&mut self.reserved).into_iter().collect()
    }

    /// Run one frame of worker defense for `base`.
    ///
    /// `busy` marks units owned elsewhere that must not be pulled.
    pub fn execute(
        &mut self,
        ctx: &mut FrameContext<'_>,
        squad: &Squad,
        base: &BaseInfo,
        busy: impl Fn(Entity) -> bool,
    ) -> WorkerDefenseReport {
        self.reserved.retain(|id| units::friendly(ctx.world, *id).is_some());

        let workers = base_workers(ctx.world, base.mineral_line, &busy);
        let threats = worker_threats(ctx.world, ctx.frame, base.mineral_line, &workers);
        let mut report = WorkerDefenseReport {
            threats: threats.iter().map(|e| bits(e.id)).collect(),
            ..WorkerDefenseReport::default()
        };

        if threats.is_empty() {
            report.released = self.disband().into_iter().map(bits).collect();
            return report;
        }

        let threat_ids: Vec<Entity> = threats.iter().map(|e| e.id).collect();
        let converging = squad.converging_on(&threat_ids);
        let uncovered: Vec<EnemyUnit> = threats
            .iter()
            .copied()
            .filter(|threat| !converging.contains_key(&threat.id))
            .collect();
        report.covered = converging.keys().copied().map(bits).collect();

        let defenders = squad.units().len();
        if uncovered.len() > defenders + 1 {
            info!(
                base = self.base.0,
                threats = uncovered.len(),
                defenders,
                frame = ctx.frame,
                "full worker defense"
            );
            report.full_defense = true;
            self.full_defense(ctx, squad, base, &workers, &threats, &mut report);
            return report;
        }

        // Reserved workers keep fighting while a threat is close, else go back to mining
        let mut released = Vec::new();
        for worker in workers.iter().filter(|w| self.reserved.contains(&w.id)) {
            match closest_threat(worker, &uncovered, RESERVED_REACH) {
                Some(target) => {
                    ctx.attack_unit(worker.id, target.id, &[]);
                    report.fighting.push(bits(worker.id));
                }
                None => released.push(worker.id),
            }
        }
        for id in released {
            self.reserved.remove(&id);
            report.released.push(bits(id));
        }

        let free: Vec<&FriendlyUnit> = workers.iter().filter(|w| !self.reserved.contains(&w.id)).collect();
        for worker in free {
            if let Some(target) = closest_threat(worker, &uncovered, WORKER_THREAT_DISTANCE) {
                debug!(worker = ?worker.id, target = ?target.id, "worker pulled to defend");
                self.reserved.insert(worker.id);
                ctx.attack_unit(worker.id, target.id, &[]);
                report.fighting.push(bits(worker.id));
            }
        }
        report.fighting.sort_unstable();
        report
    }

    fn full_defense(
        &mut self,
        ctx: &mut FrameContext<'_>,
        squad: &Squad,
        base: &BaseInfo,
        workers: &[FriendlyUnit],
        threats: &[EnemyUnit],
        report: &mut WorkerDefenseReport,
    ) {
        let pairs: Vec<(&FriendlyUnit, EnemyUnit)> = workers
            .iter()
            .filter_map(|worker| closest_threat(worker, threats, f32::INFINITY).map(|t| (worker, t)))
            .collect();
        self.reserved.extend(workers.iter().map(|w| w.id));

        let worker_contact = pairs.iter().any(|(worker, target)| in_contact(worker, target));
        let squad_contact = squad
            .units()
            .into_iter()
            .filter_map(|id| units::friendly(ctx.world, id))
            .any(|unit| threats.iter().any(|threat| in_contact(&unit, threat)));

        if worker_contact || squad_contact {
            for (worker, target) in &pairs {
                ctx.attack_unit(worker.id, target.id, &[]);
                report.fighting.push(bits(worker.id));
            }
        } else {
            // Nobody is in range yet: bunch up in the mineral line
            for worker in workers {
                ctx.move_unit(worker.id, base.mineral_line);
            }
        }
    }
}

/// Our workers harvesting at this base, skipping units owned elsewhere.
fn base_workers(world: &World, mineral_line: Position, busy: impl Fn(Entity) -> bool) -> Vec<FriendlyUnit> {
    let mut ids: Vec<Entity> = world
        .query::<(&Friendly, &UnitKind)>()
        .iter()
        .filter(|(_, (_, kind))| kind.stats().worker)
        .map(|(entity, _)| entity)
        .collect();
    ids.sort();
    ids.into_iter()
        .filter(|id| !busy(*id))
        .filter_map(|id| units::friendly(world, id))
        .filter(|worker| worker.position.distance(mineral_line) <= MINERAL_LINE_RADIUS)
        .collect()
}

/// Enemies workers can and should fight: melee ground raiders in the mineral
/// line, or ones seen attacking right next to a worker.
fn worker_threats(world: &World, frame: Frame, mineral_line: Position, workers: &[FriendlyUnit]) -> Vec<EnemyUnit> {
    units::all_enemies(world)
        .into_iter()
        .filter(|e| e.sighting.position_valid && !e.flying())
        .filter(|e| e.kind.is_melee() && e.kind.can_attack_ground() && e.is_combatant(frame))
        .filter(|e| {
            if e.position.distance(mineral_line) <= MINERAL_LINE_RADIUS {
                return true;
            }
            let attacking = e
                .sighting
                .last_seen_attacking
                .is_some_and(|seen| frame.saturating_sub(seen) <= WORKER_THREAT_WINDOW);
            attacking
                && workers
                    .iter()
                    .any(|w| w.position.distance(e.position) < WORKER_THREAT_DISTANCE)
        })
        .collect()
}

/// Closest threat within `reach`, preferring the weakest on ties.
fn closest_threat(worker: &FriendlyUnit, threats: &[EnemyUnit], reach: f32) -> Option<EnemyUnit> {
    threats
        .iter()
        .filter(|t| t.position.distance(worker.position) <= reach)
        .min_by(|a, b| {
            a.position
                .distance(worker.position)
                .total_cmp(&b.position.distance(worker.position))
                .then((a.vitals.hp + a.vitals.shields).cmp(&(b.vitals.hp + b.vitals.shields)))
                .then(a.id.cmp(&b.id))
        })
        .copied()
}

/// Whether either unit can already hit the other.
fn in_contact(unit: &FriendlyUnit, enemy: &EnemyUnit) -> bool {
    let distance = unit.position.distance(enemy.position);
    distance <= unit.kind.range_against(enemy.flying()) || distance <= enemy.kind.range_against(unit.flying())
}
