//! Error types raised by the tactical layer.
//!
//! None of these cross a frame boundary: callers degrade to a safe command
//! (move or regroup) and retry on the next frame.

use thiserror::Error;

use crate::types::SquadId;

/// Errors surfaced by the tactical layer and its gateways.
#[derive(Debug, Error)]
pub enum TacticsError {
    #[error("unit {0:?} no longer exists")]
    UnitMissing(hecs::Entity),

    #[error("squad {0:?} does not exist")]
    SquadMissing(SquadId),

    #[error("nothing to simulate: {friendly} friendly units, {enemy} enemy units")]
    NothingToSimulate { friendly: usize, enemy: usize },

    #[error("combat simulation failed: {0}")]
    SimulationFailed(String),

    #[error("order for unit {unit:?} rejected: {reason}")]
    OrderRejected { unit: hecs::Entity, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TacticsError>;
