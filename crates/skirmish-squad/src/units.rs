//! Lookups of friendly and enemy units in the world.
//!
//! Every accessor tolerates missing entities: a unit that died since the
//! last frame simply yields `None`.

use hecs::{Entity, World};

use skirmish_core::components::{Enemy, Friendly, Heading, Readiness, Sighting, Structure, Vitals};
use skirmish_core::constants::{CHOKE_TRANSIT_RADIUS, WORKER_AGGRESSION_WINDOW};
use skirmish_core::types::{Choke, Frame, Position};
use skirmish_core::unit_kinds::UnitKind;
use skirmish_tactics::classifier::{EnemyView, RecencyPolicy};

/// Current state of one of our units.
#[derive(Debug, Clone, Copy)]
pub struct FriendlyUnit {
    pub id: Entity,
    pub kind: UnitKind,
    pub position: Position,
    pub vitals: Vitals,
    pub readiness: Readiness,
}

/// What we currently know about an enemy unit.
#[derive(Debug, Clone, Copy)]
pub struct EnemyUnit {
    pub id: Entity,
    pub kind: UnitKind,
    pub position: Position,
    pub vitals: Vitals,
    pub sighting: Sighting,
}

impl FriendlyUnit {
    pub fn flying(&self) -> bool {
        self.kind.stats().flying
    }
}

impl EnemyUnit {
    pub fn flying(&self) -> bool {
        self.kind.stats().flying
    }

    /// Whether this unit takes part in fights. Workers only count once seen attacking.
    pub fn is_combatant(&self, frame: Frame) -> bool {
        let stats = self.kind.stats();
        if stats.worker {
            return self
                .sighting
                .last_seen_attacking
                .is_some_and(|seen| frame.saturating_sub(seen) <= WORKER_AGGRESSION_WINDOW);
        }
        stats.ground_damage > 0 || stats.air_damage > 0
    }

    pub fn view(&self) -> EnemyView<Entity> {
        EnemyView {
            id: self.id,
            kind: self.kind,
            position: self.position,
            sighting: self.sighting,
        }
    }
}

pub fn friendly(world: &World, id: Entity) -> Option<FriendlyUnit> {
    world.get::<&Friendly>(id).ok()?;
    let kind = *world.get::<&UnitKind>(id).ok()?;
    let position = *world.get::<&Position>(id).ok()?;
    let vitals = *world.get::<&Vitals>(id).ok()?;
    let readiness = world
        .get::<&Readiness>(id)
        .map(|r| *r)
        .unwrap_or(Readiness {
            ready: false,
            cooldown_remaining: 0,
        });
    Some(FriendlyUnit {
        id,
        kind,
        position,
        vitals,
        readiness,
    })
}

pub fn enemy(world: &World, id: Entity) -> Option<EnemyUnit> {
    world.get::<&Enemy>(id).ok()?;
    let kind = *world.get::<&UnitKind>(id).ok()?;
    let position = *world.get::<&Position>(id).ok()?;
    let vitals = *world.get::<&Vitals>(id).ok()?;
    let sighting = *world.get::<&Sighting>(id).ok()?;
    Some(EnemyUnit {
        id,
        kind,
        position,
        vitals,
        sighting,
    })
}

/// All enemies, sorted by entity.
pub fn all_enemies(world: &World) -> Vec<EnemyUnit> {
    let mut ids: Vec<Entity> = world
        .query::<&Enemy>()
        .iter()
        .map(|(entity, _)| entity)
        .collect();
    ids.sort();
    ids.into_iter().filter_map(|id| enemy(world, id)).collect()
}

/// Fresh enemies within `radius` of `center`, sorted by entity.
pub fn enemies_within(
    world: &World,
    center: Position,
    radius: f32,
    frame: Frame,
    recency: &RecencyPolicy,
) -> Vec<Entity> {
    all_enemies(world)
        .into_iter()
        .filter(|e| e.position.distance(center) <= radius)
        .filter(|e| recency.is_fresh(e.kind, &e.sighting, frame))
        .map(|e| e.id)
        .collect()
}

/// Our completed, powered static defense structures, sorted by entity.
pub fn powered_static_defense(world: &World) -> Vec<(Entity, Position)> {
    let mut found: Vec<(Entity, Position)> = world
        .query::<(&Friendly, &UnitKind, &Position, &Structure)>()
        .iter()
        .filter(|(_, (_, kind, _, structure))| {
            kind.stats().static_defense && structure.completed && structure.powered
        })
        .map(|(entity, (_, _, position, _))| (entity, *position))
        .collect();
    found.sort_by_key(|(entity, _)| *entity);
    found
}

/// Whether a friendly unit not excluded by `skip` is on its way through `choke`.
pub fn in_transit(world: &World, choke: &Choke, skip: impl Fn(Entity) -> bool) -> bool {
    world
        .query::<(&Friendly, &Position, &Heading)>()
        .iter()
        .filter(|(entity, _)| !skip(*entity))
        .any(|(_, (_, position, heading))| {
            if position.distance(choke.center) > CHOKE_TRANSIT_RADIUS {
                return false;
            }
            let path = heading.destination - *position;
            let length_sq = path.length_squared();
            if length_sq <= f32::EPSILON {
                return false;
            }
            let t = (choke.center - *position).dot(path) / length_sq;
            (0.0..=1.0).contains(&t)
                && (*position + path * t).distance(choke.center) <= choke.width.max(choke.length)
        })
}
