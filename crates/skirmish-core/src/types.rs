//! Fundamental geometric and frame types.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::constants::NARROW_CHOKE_WIDTH;

/// Game frame number. The decision pipeline runs once per frame.
pub type Frame = u32;

/// Map position in pixels (x = east, y = south).
pub type Position = Vec2;

/// Identifier of a base location known to the map layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BaseId(pub u32);

/// Identifier of a squad owned by the tactics engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SquadId(pub u32);

/// A passage between two map areas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Choke {
    pub center: Position,
    /// Walkable width of the passage in pixels.
    pub width: f32,
    /// Length of the narrow section in pixels.
    pub length: f32,
    /// Passage end on our side.
    pub near_end: Position,
    /// Passage end on the enemy side.
    pub far_end: Position,
}

impl Choke {
    pub fn is_narrow(&self) -> bool {
        self.width < NARROW_CHOKE_WIDTH
    }
}

/// Point at `distance` from `from` along the direction toward `to`.
/// Returns `from` when the two points coincide.
pub fn step_toward(from: Position, to: Position, distance: f32) -> Position {
    from + (to - from).normalize_or_zero() * distance
}
