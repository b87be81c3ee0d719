//! Entity spawn factories for mirroring game units into a world.
//!
//! Used by replays and tests. Friendly units spawn healthy and ready, enemy
//! units spawn as a fresh, completed, detected sighting.

use hecs::{Entity, World};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use skirmish_core::components::{Enemy, Friendly, Readiness, Sighting, Structure, Vitals};
use skirmish_core::types::{Frame, Position};
use skirmish_core::unit_kinds::UnitKind;

/// Full hit points and shields for a kind.
pub fn full_vitals(kind: UnitKind) -> Vitals {
    let stats = kind.stats();
    Vitals {
        hp: stats.max_hp,
        shields: stats.max_shields,
    }
}

/// Spawn one of our units, ready for orders.
pub fn spawn_friendly(world: &mut World, kind: UnitKind, position: Position) -> Entity {
    world.spawn((
        Friendly,
        kind,
        position,
        full_vitals(kind),
        Readiness {
            ready: true,
            cooldown_remaining: 0,
        },
    ))
}

/// Spawn one of our completed structures.
pub fn spawn_friendly_structure(world: &mut World, kind: UnitKind, position: Position, powered: bool) -> Entity {
    world.spawn((
        Friendly,
        kind,
        position,
        full_vitals(kind),
        Structure {
            completed: true,
            powered,
        },
    ))
}

/// A sighting made on `frame` of a visible, completed unit.
pub fn fresh_sighting(frame: Frame) -> Sighting {
    Sighting {
        last_seen: frame,
        last_seen_attacking: None,
        position_valid: true,
        completed: true,
        detected: true,
    }
}

/// Spawn an enemy unit seen on `frame`.
pub fn spawn_enemy(world: &mut World, kind: UnitKind, position: Position, frame: Frame) -> Entity {
    spawn_enemy_with(world, kind, position, fresh_sighting(frame))
}

pub fn spawn_enemy_with(world: &mut World, kind: UnitKind, position: Position, sighting: Sighting) -> Entity {
    world.spawn((Enemy, kind, position, full_vitals(kind), sighting))
}

/// Units spawned by `spawn_skirmish`, in spawn order.
#[derive(Debug, Clone, Default)]
pub struct Skirmish {
    pub friendly: Vec<Entity>,
    pub enemy: Vec<Entity>,
}

const FRIENDLY_ROSTER: [UnitKind; 2] = [UnitKind::Zealot, UnitKind::Dragoon];
const ENEMY_ROSTER: [UnitKind; 3] = [UnitKind::Zergling, UnitKind::Hydralisk, UnitKind::Zergling];

/// Two randomized armies facing each other across `gap` pixels, east to west.
/// Same RNG seed, same layout.
pub fn spawn_skirmish(
    world: &mut World,
    rng: &mut ChaCha8Rng,
    center: Position,
    gap: f32,
    friendly_count: usize,
    enemy_count: usize,
    frame: Frame,
) -> Skirmish {
    let mut skirmish = Skirmish::default();
    let our_side = center - Position::new(gap / 2.0, 0.0);
    let their_side = center + Position::new(gap / 2.0, 0.0);

    for _ in 0..friendly_count {
        let kind = FRIENDLY_ROSTER[rng.gen_range(0..FRIENDLY_ROSTER.len())];
        let position = our_side + jitter(rng);
        skirmish.friendly.push(spawn_friendly(world, kind, position));
    }
    for _ in 0..enemy_count {
        let kind = ENEMY_ROSTER[rng.gen_range(0..ENEMY_ROSTER.len())];
        let position = their_side + jitter(rng);
        skirmish.enemy.push(spawn_enemy(world, kind, position, frame));
    }
    skirmish
}

fn jitter(rng: &mut ChaCha8Rng) -> Position {
    Position::new(rng.gen_range(-96.0..96.0), rng.gen_range(-96.0..96.0))
}
