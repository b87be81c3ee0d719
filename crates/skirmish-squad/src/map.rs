//! Base and map knowledge, plus a threat grid built from enemy sightings.

use hecs::World;

use skirmish_core::components::{Enemy, Sighting};
use skirmish_core::enums::WeaponDomain;
use skirmish_core::types::{BaseId, Choke, Frame, Position};
use skirmish_core::unit_kinds::UnitKind;
use skirmish_tactics::classifier::{RecencyPolicy, ThreatGrid};

/// A base location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaseInfo {
    pub id: BaseId,
    pub position: Position,
    /// Center of the mineral line workers harvest from.
    pub mineral_line: Position,
    /// Remaining minerals.
    pub minerals: i32,
    /// Frame the location was last scouted.
    pub last_scouted: Frame,
    /// Choke leading into the base, if any.
    pub choke: Option<Choke>,
}

/// Queries answered by the map and base knowledge layer.
pub trait MapKnowledge {
    fn my_bases(&self) -> &[BaseInfo];

    fn enemy_bases(&self) -> &[BaseInfo];

    /// Expansions neither side has taken.
    fn untaken_expansions(&self) -> &[BaseInfo];

    fn my_main(&self) -> Option<&BaseInfo>;

    fn enemy_main(&self) -> Option<&BaseInfo>;

    /// Narrow choke lying between two positions, if the path crosses one.
    fn separating_narrow_choke(&self, from: Position, to: Position) -> Option<Choke>;

    fn base(&self, id: BaseId) -> Option<&BaseInfo> {
        self.my_bases()
            .iter()
            .chain(self.enemy_bases())
            .chain(self.untaken_expansions())
            .find(|base| base.id == id)
    }
}

/// Fixed map knowledge, for tests and replays.
#[derive(Debug, Clone, Default)]
pub struct StaticMap {
    pub my_bases: Vec<BaseInfo>,
    pub enemy_bases: Vec<BaseInfo>,
    pub untaken: Vec<BaseInfo>,
    pub chokes: Vec<Choke>,
}

impl MapKnowledge for StaticMap {
    fn my_bases(&self) -> &[BaseInfo] {
        &self.my_bases
    }

    fn enemy_bases(&self) -> &[BaseInfo] {
        &self.enemy_bases
    }

    fn untaken_expansions(&self) -> &[BaseInfo] {
        &self.untaken
    }

    fn my_main(&self) -> Option<&BaseInfo> {
        self.my_bases.first()
    }

    fn enemy_main(&self) -> Option<&BaseInfo> {
        self.enemy_bases.first()
    }

    fn separating_narrow_choke(&self, from: Position, to: Position) -> Option<Choke> {
        let segment = to - from;
        let length_sq = segment.length_squared();
        if length_sq <= f32::EPSILON {
            return None;
        }
        self.chokes
            .iter()
            .filter(|choke| choke.is_narrow())
            .find(|choke| {
                // Choke center must sit between the two points, close to the line
                let t = (choke.center - from).dot(segment) / length_sq;
                if !(0.0..=1.0).contains(&t) {
                    return false;
                }
                let closest = from + segment * t;
                closest.distance(choke.center) <= choke.length.max(choke.width)
            })
            .copied()
    }
}

/// Enemy weapon coverage computed from current sightings.
#[derive(Debug, Clone, Default)]
pub struct EnemyCoverage {
    ground: Vec<(Position, f32, i32)>,
    air: Vec<(Position, f32, i32)>,
}

impl EnemyCoverage {
    /// Collect the weapon footprint of every fresh, completed enemy.
    pub fn from_world(world: &World, frame: Frame, recency: &RecencyPolicy) -> Self {
        let mut coverage = Self::default();
        let mut query = world.query::<(&Enemy, &UnitKind, &Position, &Sighting)>();
        for (_entity, (_enemy, kind, position, sighting)) in query.iter() {
            if !sighting.completed || !recency.is_fresh(*kind, sighting, frame) {
                continue;
            }
            for domain in WeaponDomain::ALL {
                let damage = kind.damage_in(domain);
                if damage <= 0 {
                    continue;
                }
                let footprint = (*position, kind.range_in(domain), damage);
                match domain {
                    WeaponDomain::Ground => coverage.ground.push(footprint),
                    WeaponDomain::Air => coverage.air.push(footprint),
                }
            }
        }
        coverage
    }
}

fn covered(footprints: &[(Position, f32, i32)], pos: Position) -> i32 {
    footprints
        .iter()
        .filter(|(center, range, _)| center.distance(pos) <= *range)
        .map(|(_, _, damage)| *damage)
        .sum()
}

impl ThreatGrid for EnemyCoverage {
    fn ground_threat(&self, pos: Position) -> i32 {
        covered(&self.ground, pos)
    }

    fn air_threat(&self, pos: Position) -> i32 {
        covered(&self.air, pos)
    }
}
