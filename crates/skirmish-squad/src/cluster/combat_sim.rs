//! Snapshot assembly for the combat simulator.

use std::collections::BTreeSet;

use hecs::Entity;
use tracing::debug;

use skirmish_core::constants::DETECTION_RADIUS;
use skirmish_core::error::{Result, TacticsError};
use skirmish_core::result::CombatSimResult;
use skirmish_core::types::{Choke, Position};

use crate::context::FrameContext;
use crate::gateway::{SimSnapshot, SimUnit};
use crate::units::{self, EnemyUnit};

use super::targeting::Pairing;
use super::UnitCluster;

/// Inputs for one simulation of a cluster's fight.
#[derive(Debug, Clone, Copy)]
pub struct SimRequest<'a> {
    pub target_position: Position,
    pub pairing: &'a [Pairing],
    /// Enemies in scope, including reinforcements near the vanguard.
    pub enemies: &'a [Entity],
    pub detectors: &'a [Entity],
    pub include_retreat: bool,
    /// Use this choke instead of looking one up.
    pub choke: Option<Choke>,
}

/// Whether a detector is close enough to the vanguard to reveal cloaked enemies.
fn has_mobile_detection(cluster: &UnitCluster, ctx: &FrameContext<'_>, detectors: &[Entity]) -> bool {
    if cluster.vanguard.is_none() {
        return false;
    }
    detectors
        .iter()
        .filter_map(|id| units::friendly(ctx.world, *id))
        .any(|detector| detector.position.distance(cluster.vanguard_position) <= DETECTION_RADIUS)
}

fn participates(enemy: &EnemyUnit, ctx: &FrameContext<'_>) -> bool {
    if !enemy.sighting.completed {
        return false;
    }
    ctx.recency.is_fresh(enemy.kind, &enemy.sighting, ctx.frame)
}

/// Build the snapshot for a cluster's fight and hand it to the simulator.
///
/// The simulator's result is returned untouched.
pub fn run_combat_sim(
    cluster: &UnitCluster,
    ctx: &FrameContext<'_>,
    request: &SimRequest<'_>,
) -> Result<CombatSimResult> {
    let snapshot = build_snapshot(cluster, ctx, request)?;
    debug!(
        cluster = cluster.id,
        frame = ctx.frame,
        friendly = snapshot.friendly.len(),
        enemy = snapshot.enemy.len(),
        choke = snapshot.narrow_choke.is_some(),
        "running combat sim"
    );
    ctx.simulator.simulate(&snapshot)
}

pub fn build_snapshot(
    cluster: &UnitCluster,
    ctx: &FrameContext<'_>,
    request: &SimRequest<'_>,
) -> Result<SimSnapshot> {
    let friendly: Vec<SimUnit> = request
        .pairing
        .iter()
        .filter_map(|pairing| {
            let unit = units::friendly(ctx.world, pairing.unit)?;
            Some(SimUnit {
                id: unit.id,
                kind: unit.kind,
                position: unit.position,
                hp: unit.vitals.hp,
                shields: unit.vitals.shields,
                cooldown_remaining: unit.readiness.cooldown_remaining,
                target: pairing.target,
                detected: true,
                passive: false,
            })
        })
        .collect();

    let mobile_detection = has_mobile_detection(cluster, ctx, request.detectors);
    let enemy_ids: BTreeSet<Entity> = request.enemies.iter().copied().collect();
    let enemies: Vec<EnemyUnit> = enemy_ids
        .into_iter()
        .filter_map(|id| units::enemy(ctx.world, id))
        .filter(|enemy| participates(enemy, ctx))
        .collect();

    if friendly.is_empty() || enemies.is_empty() {
        return Err(TacticsError::NothingToSimulate {
            friendly: friendly.len(),
            enemy: enemies.len(),
        });
    }

    let narrow_choke = request.choke.or_else(|| {
        enemies
            .iter()
            .filter(|enemy| enemy.sighting.position_valid)
            .max_by(|a, b| {
                a.position
                    .distance(cluster.center)
                    .total_cmp(&b.position.distance(cluster.center))
                    .then(b.id.cmp(&a.id))
            })
            .and_then(|furthest| ctx.map.separating_narrow_choke(cluster.center, furthest.position))
    });

    let enemy = enemies
        .iter()
        .map(|enemy| SimUnit {
            id: enemy.id,
            kind: enemy.kind,
            position: enemy.position,
            hp: enemy.vitals.hp,
            shields: enemy.vitals.shields,
            cooldown_remaining: 0,
            target: None,
            detected: enemy.sighting.detected || mobile_detection,
            // Workers only fight back once they have been seen attacking
            passive: enemy.kind.stats().worker && !enemy.is_combatant(ctx.frame),
        })
        .collect();

    let detectors = request
        .detectors
        .iter()
        .filter_map(|id| units::friendly(ctx.world, *id))
        .map(|detector| detector.position)
        .collect();

    Ok(SimSnapshot {
        frame: ctx.frame,
        target_position: request.target_position,
        friendly,
        enemy,
        detectors,
        include_retreat: request.include_retreat,
        narrow_choke,
    })
}
