//! Enumeration types used throughout the tactical layer.

use serde::{Deserialize, Serialize};

/// Tactical posture of a unit cluster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Activity {
    /// Travelling toward the squad's target position.
    #[default]
    Moving,
    /// Committed to a fight.
    Attacking,
    /// Disengaged, waiting for a better matchup.
    Regrouping,
}

/// Refinement of `Regrouping` chosen when the regroup begins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubActivity {
    #[default]
    None,
    /// Hold just outside the range of enemy static defense and pick off what comes out.
    ContainStaticDefense,
    /// Hold our side of a narrow choke separating the armies.
    ContainChoke,
    /// Fight in place because retreating would cost more than staying.
    StandGround,
    /// Fall back to the rally point.
    Flee,
}

/// Which targets a weapon can hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeaponDomain {
    Ground,
    Air,
}

impl WeaponDomain {
    pub const ALL: [WeaponDomain; 2] = [WeaponDomain::Ground, WeaponDomain::Air];

    /// Domain needed to hit a target that is (or is not) flying.
    pub fn against(target_flying: bool) -> Self {
        if target_flying {
            WeaponDomain::Air
        } else {
            WeaponDomain::Ground
        }
    }
}

/// Mission a squad was created for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MissionKind {
    /// Main army pushing toward an enemy base.
    #[default]
    AttackBase,
    /// Air-to-air patrol that hunts exposed flyers and scouts enemy bases.
    AirHarass,
    /// Defend one of our bases, holding its choke when it has one.
    DefendBase,
    /// Clean up remaining enemy buildings late in the game.
    MopUp,
}

/// Classifier bucket an enemy was sorted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TargetBucket {
    BaseThreat,
    Combat,
    Vulnerable,
    Dormant,
    Defended,
}
