//! Target selection.
//!
//! Ready units are processed in order of how soon they can shoot; each picks
//! the best-scoring reachable enemy, and its expected damage is applied to that
//! enemy so later units do not overkill it. Everything is ordered by entity
//! so the same inputs always yield the same pairing.

use std::collections::BTreeMap;

use hecs::{Entity, World};

use skirmish_core::constants::{TARGET_REACH, WORKER_AGGRESSION_WINDOW};
use skirmish_core::enums::WeaponDomain;
use skirmish_core::types::{Frame, Position};

use crate::units::{self, EnemyUnit, FriendlyUnit};

/// One of our units and the enemy it should shoot, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pairing {
    pub unit: Entity,
    pub target: Option<Entity>,
}

struct Candidate {
    unit: EnemyUnit,
    priority: i32,
    max_health: i32,
    predicted_health: i32,
}

fn priority(enemy: &EnemyUnit, frame: Frame) -> i32 {
    let stats = enemy.kind.stats();
    if stats.worker {
        let attacking = enemy
            .sighting
            .last_seen_attacking
            .is_some_and(|seen| frame.saturating_sub(seen) <= WORKER_AGGRESSION_WINDOW);
        if attacking {
            return 11;
        }
    }
    if stats.building && !enemy.sighting.completed {
        return 2;
    }
    stats.priority
}

/// Frames until `unit` could fire at its closest reachable candidate.
fn frames_to_attack(unit: &FriendlyUnit, candidates: &[Candidate]) -> u32 {
    let speed = unit.kind.stats().speed.max(0.1);
    candidates
        .iter()
        .filter(|c| unit.kind.can_attack(c.unit.flying()))
        .map(|c| {
            let gap = unit.position.distance(c.unit.position) - unit.kind.range_against(c.unit.flying());
            (gap.max(0.0) / speed) as u32
        })
        .min()
        .map(|frames| frames.max(unit.readiness.cooldown_remaining))
        .unwrap_or(u32::MAX)
}

fn score(unit: &FriendlyUnit, candidate: &Candidate, reference: Position) -> i32 {
    let target = &candidate.unit;
    let distance = unit.position.distance(target.position);
    let range = unit.kind.range_against(target.flying());

    let mut score = 64 * candidate.priority - (distance - range).max(0.0) as i32;

    if distance <= range {
        score += if unit.kind.is_melee() { 160 } else { 64 };
    }

    let injury = 1.0 - candidate.predicted_health as f32 / candidate.max_health.max(1) as f32;
    score += (160.0 * injury.clamp(0.0, 1.0)) as i32;

    // Enemies that can shoot back at this unit are more urgent
    if target.kind.can_attack(unit.flying())
        && distance <= target.kind.range_against(unit.flying()) + 64.0
    {
        score += 96;
    }

    if target.position.distance(reference) < unit.position.distance(reference) {
        score += 64;
    }

    score
}

/// Pair each of `members` with the best target among `candidates`.
///
/// Units that are not ready keep their previous target when it is still
/// valid. The result is ordered by friendly entity.
pub fn select_targets(
    world: &World,
    members: &[Entity],
    candidates: &[Entity],
    reference: Position,
    frame: Frame,
    previous: &[Pairing],
) -> Vec<Pairing> {
    let mut candidate_ids = candidates.to_vec();
    candidate_ids.sort();
    candidate_ids.dedup();

    let mut pool: Vec<Candidate> = candidate_ids
        .into_iter()
        .filter_map(|id| units::enemy(world, id))
        .filter(|e| e.sighting.detected && e.sighting.position_valid)
        .map(|e| {
            let stats = e.kind.stats();
            Candidate {
                priority: priority(&e, frame),
                max_health: stats.max_hp + stats.max_shields,
                predicted_health: e.vitals.hp + e.vitals.shields,
                unit: e,
            }
        })
        .collect();

    let previous: BTreeMap<Entity, Option<Entity>> =
        previous.iter().map(|p| (p.unit, p.target)).collect();

    let mut pairing: Vec<Pairing> = Vec::with_capacity(members.len());
    let mut attackers: Vec<(u32, usize, FriendlyUnit)> = Vec::new();

    let mut sorted_members = members.to_vec();
    sorted_members.sort();
    for id in sorted_members {
        let Some(unit) = units::friendly(world, id) else {
            continue;
        };
        if !unit.readiness.ready {
            let kept = previous
                .get(&id)
                .copied()
                .flatten()
                .filter(|target| pool.iter().any(|c| c.unit.id == *target));
            pairing.push(Pairing { unit: id, target: kept });
            continue;
        }
        let reachable = pool
            .iter()
            .filter(|c| unit.kind.can_attack(c.unit.flying()))
            .count();
        attackers.push((frames_to_attack(&unit, &pool), reachable, unit));
    }

    attackers.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)).then(a.2.id.cmp(&b.2.id)));

    for (_, _, unit) in attackers {
        let mut best: Option<(i32, f32, Entity, usize)> = None;
        for (index, candidate) in pool.iter().enumerate() {
            if candidate.predicted_health <= 0 || !unit.kind.can_attack(candidate.unit.flying()) {
                continue;
            }
            let distance = unit.position.distance(candidate.unit.position);
            if distance - unit.kind.range_against(candidate.unit.flying()) > TARGET_REACH {
                continue;
            }
            let value = score(&unit, candidate, reference);
            let better = match best {
                None => true,
                Some((best_score, best_distance, best_id, _)) => {
                    value > best_score
                        || (value == best_score && distance < best_distance)
                        || (value == best_score && distance == best_distance && candidate.unit.id < best_id)
                }
            };
            if better {
                best = Some((value, distance, candidate.unit.id, index));
            }
        }

        let target = best.map(|(_, distance, id, index)| {
            let candidate = &mut pool[index];
            if distance <= unit.kind.range_against(candidate.unit.flying()) {
                let domain = WeaponDomain::against(candidate.unit.flying());
                candidate.predicted_health -= unit.kind.damage_in(domain);
            }
            id
        });
        pairing.push(Pairing { unit: unit.id, target });
    }

    pairing.sort_by_key(|p| p.unit);
    pairing
}

/// Whether any unit in the pairing has a target.
pub fn has_target(pairing: &[Pairing]) -> bool {
    pairing.iter().any(|p| p.target.is_some())
}
