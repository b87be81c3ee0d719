//! Unit-level orders issued on behalf of a cluster.
//!
//! Every helper skips units that died or are not ready for a new command;
//! rejected orders are counted by the frame context and retried next frame.

use hecs::Entity;

use skirmish_core::constants::{DEFENDER_CHASE_MARGIN, MINERAL_LINE_RADIUS};
use skirmish_core::types::{step_toward, Choke, Position};

use crate::context::FrameContext;
use crate::units::{self, EnemyUnit, FriendlyUnit};

use super::targeting::Pairing;
use super::UnitCluster;

/// Clearance kept outside enemy static defense range while containing.
const CONTAIN_MARGIN: f32 = 64.0;

/// Distance from a hold point at which a unit counts as in position.
const HOLD_TOLERANCE: f32 = 16.0;

/// Length of one threat-checked movement step.
const SAFE_STEP: f32 = 96.0;

fn ready_unit(ctx: &FrameContext<'_>, id: Entity) -> Option<FriendlyUnit> {
    if !ctx.is_ready(id) {
        return None;
    }
    units::friendly(ctx.world, id)
}

fn live_target(ctx: &FrameContext<'_>, target: Option<Entity>) -> Option<EnemyUnit> {
    target.and_then(|id| units::enemy(ctx.world, id))
}

fn in_range(unit: &FriendlyUnit, target: &EnemyUnit) -> bool {
    unit.position.distance(target.position) <= unit.kind.range_against(target.flying())
}

/// Move every ready member toward `position`.
pub fn move_to(cluster: &UnitCluster, ctx: &mut FrameContext<'_>, position: Position) {
    for id in cluster.members() {
        if ctx.is_ready(id) {
            ctx.move_unit(id, position);
        }
    }
}

/// Move toward `position` one step at a time, backing off instead of
/// stepping into enemy weapon coverage.
pub fn safe_move(cluster: &UnitCluster, ctx: &mut FrameContext<'_>, position: Position) {
    for id in cluster.members() {
        let Some(unit) = ready_unit(ctx, id) else {
            continue;
        };
        if unit.position.distance(position) <= SAFE_STEP {
            ctx.move_unit(id, position);
            continue;
        }
        let step = step_toward(unit.position, position, SAFE_STEP);
        if ctx.grid.threat_against(step, unit.flying()) == 0 {
            ctx.move_unit(id, step);
            continue;
        }
        let back_off = step_toward(unit.position, position, -SAFE_STEP);
        let retreat = if ctx.grid.threat_against(back_off, unit.flying()) == 0 {
            back_off
        } else {
            ctx.map.my_main().map_or(back_off, |main| main.position)
        };
        ctx.move_unit(id, retreat);
    }
}

/// Attack with the given pairing.
///
/// A unit attacks its target once it is within engage proximity of its
/// weapon range and closes the distance otherwise. Units without a target
/// move to `fallback`.
pub fn attack(cluster: &UnitCluster, ctx: &mut FrameContext<'_>, pairing: &[Pairing], fallback: Position) {
    for pair in pairing {
        if !cluster.contains(pair.unit) {
            continue;
        }
        let Some(unit) = ready_unit(ctx, pair.unit) else {
            continue;
        };
        match live_target(ctx, pair.target) {
            Some(target) => {
                let reach = unit.kind.range_against(target.flying()) + ctx.config.engage_proximity;
                if unit.position.distance(target.position) <= reach {
                    ctx.attack_unit(unit.id, target.id, pairing);
                } else {
                    ctx.move_unit(unit.id, target.position);
                }
            }
            None => ctx.move_unit(unit.id, fallback),
        }
    }
}

/// End of `choke` on the same side as `reference`.
pub fn our_end(choke: &Choke, reference: Position) -> Position {
    if choke.near_end.distance(reference) <= choke.far_end.distance(reference) {
        choke.near_end
    } else {
        choke.far_end
    }
}

/// Hold one end of a narrow choke.
///
/// Units with a target already in range shoot it; ground units gather at
/// `hold_point` and hold; flyers stay with the cluster center.
pub fn hold_choke(cluster: &UnitCluster, ctx: &mut FrameContext<'_>, pairing: &[Pairing], hold_point: Position) {
    for pair in pairing {
        if !cluster.contains(pair.unit) {
            continue;
        }
        let Some(unit) = ready_unit(ctx, pair.unit) else {
            continue;
        };
        if let Some(target) = live_target(ctx, pair.target).filter(|t| in_range(&unit, t)) {
            ctx.attack_unit(unit.id, target.id, pairing);
            continue;
        }
        if unit.flying() {
            ctx.move_unit(unit.id, cluster.center);
        } else if unit.position.distance(hold_point) <= HOLD_TOLERANCE {
            ctx.hold_unit(unit.id);
        } else {
            ctx.move_unit(unit.id, hold_point);
        }
    }
}

/// Stay just outside the range of enemy static defense, shooting anything
/// that comes into range without entering the covered area.
pub fn contain_static(
    cluster: &UnitCluster,
    ctx: &mut FrameContext<'_>,
    pairing: &[Pairing],
    static_defense: &[EnemyUnit],
) {
    for pair in pairing {
        if !cluster.contains(pair.unit) {
            continue;
        }
        let Some(unit) = ready_unit(ctx, pair.unit) else {
            continue;
        };

        let covering = static_defense
            .iter()
            .filter(|defense| defense.kind.can_attack(unit.flying()))
            .map(|defense| (defense, defense.kind.range_against(unit.flying()) + CONTAIN_MARGIN))
            .min_by(|(a, a_range), (b, b_range)| {
                (a.position.distance(unit.position) - a_range)
                    .total_cmp(&(b.position.distance(unit.position) - b_range))
                    .then(a.id.cmp(&b.id))
            });

        let target = live_target(ctx, pair.target).filter(|t| in_range(&unit, t));
        let target_uncovered = target.is_some_and(|t| {
            static_defense
                .iter()
                .all(|d| d.position.distance(t.position) > d.kind.range_against(unit.flying()))
        });
        if let (Some(target), true) = (target, target_uncovered) {
            ctx.attack_unit(unit.id, target.id, pairing);
            continue;
        }

        match covering {
            Some((defense, safe_distance)) if defense.position.distance(unit.position) < safe_distance => {
                let retreat_from = if unit.position == defense.position {
                    cluster.center
                } else {
                    unit.position
                };
                ctx.move_unit(unit.id, step_toward(defense.position, retreat_from, safe_distance));
            }
            _ => ctx.hold_unit(unit.id),
        }
    }
}

/// Fight in place: units shoot whatever they are paired with and otherwise
/// stay on the cluster center.
pub fn stand_ground(cluster: &UnitCluster, ctx: &mut FrameContext<'_>, pairing: &[Pairing]) {
    attack(cluster, ctx, pairing, cluster.center);
}

/// Whether most of the cluster is already inside enemy weapon range, so
/// running would only take free hits.
pub fn cannot_outrun(cluster: &UnitCluster, ctx: &FrameContext<'_>, enemies: &[EnemyUnit]) -> bool {
    let living = cluster.living(ctx.world);
    if living.is_empty() {
        return false;
    }
    let exposed = living
        .iter()
        .filter(|unit| {
            enemies.iter().any(|enemy| {
                enemy.kind.can_attack(unit.flying())
                    && enemy.kind.stats().speed >= unit.kind.stats().speed
                    && enemy.position.distance(unit.position) <= enemy.kind.range_against(unit.flying())
            })
        })
        .count();
    exposed * 2 > living.len()
}

/// Fall back to the mineral line so workers can help, picking fights only there.
///
/// Units in the mineral line attack a target when either side is in range.
/// Units far outside their target's range go after it to draw it away, and
/// everything else returns to the mineral line.
pub fn defend_mineral_line(cluster: &UnitCluster, ctx: &mut FrameContext<'_>, pairing: &[Pairing], mineral_line: Position) {
    for pair in pairing {
        if !cluster.contains(pair.unit) {
            continue;
        }
        let Some(unit) = ready_unit(ctx, pair.unit) else {
            continue;
        };
        let Some(target) = live_target(ctx, pair.target) else {
            ctx.move_unit(unit.id, mineral_line);
            continue;
        };

        let distance = unit.position.distance(target.position);
        let enemy_range = target.kind.range_against(unit.flying());
        let in_mineral_line = unit.position.distance(mineral_line) <= MINERAL_LINE_RADIUS;
        if in_mineral_line && (in_range(&unit, &target) || distance <= enemy_range) {
            ctx.attack_unit(unit.id, target.id, pairing);
        } else if target.sighting.position_valid && distance > enemy_range + DEFENDER_CHASE_MARGIN {
            ctx.move_unit(unit.id, target.position);
        } else {
            ctx.move_unit(unit.id, mineral_line);
        }
    }
}
