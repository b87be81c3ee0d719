//! Unit kinds and their static combat stats.
//!
//! Stats are expressed in game units: pixels for ranges, pixels per frame for
//! speed, frames for weapon cooldown.

use serde::{Deserialize, Serialize};

use crate::enums::WeaponDomain;

/// The unit types the tactical layer reasons about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    // Protoss
    Probe,
    Zealot,
    Dragoon,
    DarkTemplar,
    Corsair,
    Observer,
    Shuttle,
    PhotonCannon,
    Nexus,
    // Zerg
    Drone,
    Zergling,
    Hydralisk,
    Lurker,
    Mutalisk,
    Scourge,
    Overlord,
    Egg,
    SunkenColony,
    SporeColony,
    Hatchery,
    // Terran
    Scv,
    Marine,
    SiegeTank,
    Dropship,
    Bunker,
    MissileTurret,
    CommandCenter,
}

/// Static stats for a unit kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitStats {
    pub minerals: i32,
    pub gas: i32,
    pub max_hp: i32,
    pub max_shields: i32,
    /// Damage per shot against ground targets (0 = cannot attack ground).
    pub ground_damage: i32,
    /// Damage per shot against air targets (0 = cannot attack air).
    pub air_damage: i32,
    /// Frames between shots.
    pub cooldown: u32,
    pub ground_range: f32,
    pub air_range: f32,
    /// Top speed in pixels per frame (0 = immobile).
    pub speed: f32,
    pub flying: bool,
    pub worker: bool,
    pub building: bool,
    pub static_defense: bool,
    pub detector: bool,
    /// Slow flyer that is easy to find again, so old sightings stay useful.
    pub slow_flyer: bool,
    /// Morphing cocoon with no abilities of its own.
    pub dormant: bool,
    /// Strong enough to anchor a rally point.
    pub anchor: bool,
    /// Targeting priority tier, 1 (ignore if possible) to 15 (kill first).
    pub priority: i32,
}

const BASE: UnitStats = UnitStats {
    minerals: 0,
    gas: 0,
    max_hp: 1,
    max_shields: 0,
    ground_damage: 0,
    air_damage: 0,
    cooldown: 1,
    ground_range: 0.0,
    air_range: 0.0,
    speed: 0.0,
    flying: false,
    worker: false,
    building: false,
    static_defense: false,
    detector: false,
    slow_flyer: false,
    dormant: false,
    anchor: false,
    priority: 3,
};

/// Melee weapons reach at most this far.
pub const MELEE_RANGE: f32 = 32.0;

impl UnitKind {
    /// Get the stats for a unit kind.
    pub fn stats(self) -> UnitStats {
        match self {
            UnitKind::Probe => UnitStats {
                minerals: 50,
                max_hp: 20,
                max_shields: 20,
                ground_damage: 5,
                cooldown: 22,
                ground_range: MELEE_RANGE,
                speed: 4.92,
                worker: true,
                priority: 9,
                ..BASE
            },
            UnitKind::Zealot => UnitStats {
                minerals: 100,
                max_hp: 100,
                max_shields: 60,
                ground_damage: 16,
                cooldown: 22,
                ground_range: 15.0,
                speed: 4.0,
                priority: 11,
                ..BASE
            },
            UnitKind::Dragoon => UnitStats {
                minerals: 125,
                gas: 50,
                max_hp: 100,
                max_shields: 80,
                ground_damage: 20,
                air_damage: 20,
                cooldown: 30,
                ground_range: 192.0,
                air_range: 192.0,
                speed: 5.0,
                anchor: true,
                priority: 11,
                ..BASE
            },
            UnitKind::DarkTemplar => UnitStats {
                minerals: 125,
                gas: 100,
                max_hp: 80,
                max_shields: 40,
                ground_damage: 40,
                cooldown: 30,
                ground_range: 15.0,
                speed: 4.92,
                anchor: true,
                priority: 13,
                ..BASE
            },
            UnitKind::Corsair => UnitStats {
                minerals: 150,
                gas: 100,
                max_hp: 100,
                max_shields: 80,
                air_damage: 5,
                cooldown: 8,
                air_range: 160.0,
                speed: 6.67,
                flying: true,
                priority: 11,
                ..BASE
            },
            UnitKind::Observer => UnitStats {
                minerals: 25,
                gas: 75,
                max_hp: 40,
                max_shields: 20,
                speed: 3.33,
                flying: true,
                detector: true,
                priority: 12,
                ..BASE
            },
            UnitKind::Shuttle => UnitStats {
                minerals: 200,
                max_hp: 80,
                max_shields: 60,
                speed: 4.43,
                flying: true,
                priority: 12,
                ..BASE
            },
            UnitKind::PhotonCannon => UnitStats {
                minerals: 150,
                max_hp: 100,
                max_shields: 100,
                ground_damage: 20,
                air_damage: 20,
                cooldown: 22,
                ground_range: 224.0,
                air_range: 224.0,
                building: true,
                static_defense: true,
                detector: true,
                priority: 12,
                ..BASE
            },
            UnitKind::Nexus => UnitStats {
                minerals: 400,
                max_hp: 750,
                max_shields: 750,
                building: true,
                priority: 7,
                ..BASE
            },
            UnitKind::Drone => UnitStats {
                minerals: 50,
                max_hp: 40,
                ground_damage: 5,
                cooldown: 22,
                ground_range: MELEE_RANGE,
                speed: 4.92,
                worker: true,
                priority: 9,
                ..BASE
            },
            UnitKind::Zergling => UnitStats {
                minerals: 25,
                max_hp: 35,
                ground_damage: 5,
                cooldown: 8,
                ground_range: 15.0,
                speed: 5.49,
                priority: 11,
                ..BASE
            },
            UnitKind::Hydralisk => UnitStats {
                minerals: 75,
                gas: 25,
                max_hp: 80,
                ground_damage: 10,
                air_damage: 10,
                cooldown: 15,
                ground_range: 128.0,
                air_range: 128.0,
                speed: 3.66,
                priority: 11,
                ..BASE
            },
            UnitKind::Lurker => UnitStats {
                minerals: 125,
                gas: 125,
                max_hp: 125,
                ground_damage: 20,
                cooldown: 37,
                ground_range: 192.0,
                speed: 5.82,
                anchor: true,
                priority: 14,
                ..BASE
            },
            UnitKind::Mutalisk => UnitStats {
                minerals: 100,
                gas: 100,
                max_hp: 120,
                ground_damage: 9,
                air_damage: 9,
                cooldown: 30,
                ground_range: 96.0,
                air_range: 96.0,
                speed: 6.67,
                flying: true,
                priority: 11,
                ..BASE
            },
            UnitKind::Scourge => UnitStats {
                minerals: 12,
                gas: 38,
                max_hp: 25,
                air_damage: 110,
                cooldown: 1,
                air_range: 3.0,
                speed: 6.67,
                flying: true,
                priority: 12,
                ..BASE
            },
            UnitKind::Overlord => UnitStats {
                minerals: 100,
                max_hp: 200,
                speed: 0.83,
                flying: true,
                detector: true,
                slow_flyer: true,
                priority: 10,
                ..BASE
            },
            UnitKind::Egg => UnitStats {
                minerals: 1,
                max_hp: 200,
                dormant: true,
                priority: 1,
                ..BASE
            },
            UnitKind::SunkenColony => UnitStats {
                minerals: 175,
                max_hp: 300,
                ground_damage: 40,
                cooldown: 32,
                ground_range: 224.0,
                building: true,
                static_defense: true,
                priority: 12,
                ..BASE
            },
            UnitKind::SporeColony => UnitStats {
                minerals: 125,
                max_hp: 400,
                air_damage: 15,
                cooldown: 15,
                air_range: 224.0,
                building: true,
                static_defense: true,
                detector: true,
                priority: 12,
                ..BASE
            },
            UnitKind::Hatchery => UnitStats {
                minerals: 300,
                max_hp: 1250,
                building: true,
                priority: 7,
                ..BASE
            },
            UnitKind::Scv => UnitStats {
                minerals: 50,
                max_hp: 60,
                ground_damage: 5,
                cooldown: 15,
                ground_range: MELEE_RANGE,
                speed: 4.92,
                worker: true,
                priority: 9,
                ..BASE
            },
            UnitKind::Marine => UnitStats {
                minerals: 50,
                max_hp: 40,
                ground_damage: 6,
                air_damage: 6,
                cooldown: 15,
                ground_range: 128.0,
                air_range: 128.0,
                speed: 4.0,
                priority: 11,
                ..BASE
            },
            UnitKind::SiegeTank => UnitStats {
                minerals: 150,
                gas: 100,
                max_hp: 150,
                ground_damage: 30,
                cooldown: 37,
                ground_range: 224.0,
                speed: 4.0,
                anchor: true,
                priority: 13,
                ..BASE
            },
            UnitKind::Dropship => UnitStats {
                minerals: 100,
                gas: 100,
                max_hp: 150,
                speed: 5.47,
                flying: true,
                priority: 12,
                ..BASE
            },
            UnitKind::Bunker => UnitStats {
                minerals: 100,
                max_hp: 350,
                ground_damage: 24,
                air_damage: 24,
                cooldown: 15,
                ground_range: 160.0,
                air_range: 160.0,
                building: true,
                static_defense: true,
                priority: 11,
                ..BASE
            },
            UnitKind::MissileTurret => UnitStats {
                minerals: 75,
                max_hp: 200,
                air_damage: 20,
                cooldown: 15,
                air_range: 224.0,
                building: true,
                static_defense: true,
                detector: true,
                priority: 12,
                ..BASE
            },
            UnitKind::CommandCenter => UnitStats {
                minerals: 400,
                max_hp: 1500,
                building: true,
                priority: 7,
                ..BASE
            },
        }
    }

    /// Damage per shot of the weapon for `domain`, zero without one.
    pub fn damage_in(self, domain: WeaponDomain) -> i32 {
        let stats = self.stats();
        match domain {
            WeaponDomain::Ground => stats.ground_damage,
            WeaponDomain::Air => stats.air_damage,
        }
    }

    pub fn range_in(self, domain: WeaponDomain) -> f32 {
        let stats = self.stats();
        match domain {
            WeaponDomain::Ground => stats.ground_range,
            WeaponDomain::Air => stats.air_range,
        }
    }

    pub fn can_attack_ground(self) -> bool {
        self.damage_in(WeaponDomain::Ground) > 0
    }

    pub fn can_attack_air(self) -> bool {
        self.damage_in(WeaponDomain::Air) > 0
    }

    /// Whether this kind can shoot a target that is (or is not) flying.
    pub fn can_attack(self, target_flying: bool) -> bool {
        self.damage_in(WeaponDomain::against(target_flying)) > 0
    }

    /// Weapon range against a target that is (or is not) flying.
    pub fn range_against(self, target_flying: bool) -> f32 {
        self.range_in(WeaponDomain::against(target_flying))
    }

    pub fn is_melee(self) -> bool {
        let stats = self.stats();
        stats.ground_damage > 0 && stats.ground_range <= MELEE_RANGE
    }

    /// Resource cost with gas weighted double.
    pub fn cost(self) -> i32 {
        let stats = self.stats();
        stats.minerals + 2 * stats.gas
    }

    /// Combat value of a unit of this kind at the given health.
    ///
    /// A quarter of the cost is always counted; the rest scales with remaining
    /// health, where hit points weigh three times as much as shields.
    pub fn combat_value(self, hp: i32, shields: i32) -> i32 {
        let stats = self.stats();
        let cost = self.cost();
        let base = cost >> 2;
        let scaled = cost - base;
        let current = (hp.max(0) * 3 + shields.max(0)) as i64;
        let max = (stats.max_hp * 3 + stats.max_shields).max(1) as i64;
        base + (scaled as i64 * current.min(max) / max) as i32
    }
}
