//! ECS components for hecs entities.
//!
//! The game client owns unit lifetimes; the tactical layer only reads these
//! components and refers to units by `hecs::Entity`. Components are plain
//! data structs with no methods.

use serde::{Deserialize, Serialize};

use crate::types::{Frame, Position};

/// Marker for units we control.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Friendly;

/// Marker for opponent units.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Enemy;

/// Current hit points and shields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    pub hp: i32,
    pub shields: i32,
}

/// Command state of a friendly unit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Readiness {
    /// Whether the unit accepts a new command this frame.
    pub ready: bool,
    /// Frames until the weapon can fire again.
    pub cooldown_remaining: u32,
}

/// State of a friendly building.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Structure {
    pub completed: bool,
    /// Whether the structure is powered and functional.
    pub powered: bool,
}

/// Destination a friendly unit is currently moving to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Heading {
    pub destination: Position,
}

/// What we know about an enemy unit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Sighting {
    /// Frame the unit was last visible.
    pub last_seen: Frame,
    /// Frame the unit was last seen attacking, if ever.
    #[serde(default)]
    pub last_seen_attacking: Option<Frame>,
    /// False once we looked at the last known position and the unit was gone.
    pub position_valid: bool,
    pub completed: bool,
    /// False for cloaked or burrowed units we cannot currently target.
    pub detected: bool,
}
