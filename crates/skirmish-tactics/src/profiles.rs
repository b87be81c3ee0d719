//! Per-mission policy profiles.
//!
//! Each mission expresses its risk tolerance through one profile passed to the
//! shared decision functions in `policy`, instead of overriding them.

use serde::{Deserialize, Serialize};

use skirmish_core::constants::{DEFENSIVE_GAIN_FLOOR, UNDETECTED_LOSS_TOLERANCE};
use skirmish_core::enums::MissionKind;

use crate::config::TacticsConfig;

/// Which verdict rules a profile uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyKind {
    /// Graduated heuristic with aggression per activity.
    #[default]
    Standard,
    /// Simple trade check with long confirmation windows, for defenders.
    Defensive,
}

/// Tuning knobs for one mission's engagement decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyProfile {
    pub kind: PolicyKind,
    /// Aggression when the cluster is moving.
    pub start_aggression: f64,
    /// Aggression when the cluster is attacking.
    pub continue_aggression: f64,
    /// Aggression when the cluster is regrouping.
    pub regroup_aggression: f64,
    pub continue_lookback: usize,
    /// Stable frames needed before an attack is abandoned.
    pub continue_stable_frames: usize,
    pub regroup_lookback: usize,
    /// Stable frames needed before a regroup ends.
    pub regroup_stable_frames: usize,
    /// Frames during which our own unit count must not have grown.
    pub reinforcement_window: usize,
    pub enemy_surge_ratio: f64,
    /// Scale the clear-win bar by how far the cluster has pushed toward the enemy main.
    pub use_distance_factor: bool,
    /// Lower aggression when a narrow choke separates the armies, and abort
    /// attacks that newly end up across one.
    pub respect_chokes: bool,
    /// Ignore undetected enemies that cost us at most this fraction of value.
    pub undetected_loss_tolerance: Option<f64>,
    /// Supply at which the cluster always engages.
    pub maxed_supply: Option<u32>,
    /// Percentage swing floor for the defensive verdict.
    pub defensive_gain_floor: f64,
    pub defensive_start_frames: usize,
    pub defensive_abort_frames: usize,
    /// Hold ground while enemies we cannot detect are present.
    pub force_when_undetected: bool,
    /// Hold a narrow choke when enough blockers are in place.
    pub force_when_choke_blocked: bool,
    /// Stay engaged while a friendly unit is passing through the choke.
    pub force_while_in_transit: bool,
}

/// Get the policy profile for a mission.
pub fn get_profile(mission: MissionKind, config: &TacticsConfig) -> PolicyProfile {
    let standard = PolicyProfile {
        kind: PolicyKind::Standard,
        start_aggression: config.start_aggression,
        continue_aggression: config.continue_aggression,
        regroup_aggression: config.regroup_aggression,
        continue_lookback: config.continue_lookback,
        continue_stable_frames: config.continue_stable_frames,
        regroup_lookback: config.regroup_lookback,
        regroup_stable_frames: config.regroup_stable_frames,
        reinforcement_window: config.reinforcement_window,
        enemy_surge_ratio: config.enemy_surge_ratio,
        use_distance_factor: false,
        respect_chokes: false,
        undetected_loss_tolerance: None,
        maxed_supply: None,
        defensive_gain_floor: DEFENSIVE_GAIN_FLOOR,
        defensive_start_frames: config.defensive_start_frames,
        defensive_abort_frames: config.defensive_abort_frames,
        force_when_undetected: false,
        force_when_choke_blocked: false,
        force_while_in_transit: false,
    };

    match mission {
        MissionKind::AttackBase => PolicyProfile {
            use_distance_factor: true,
            respect_chokes: true,
            undetected_loss_tolerance: Some(UNDETECTED_LOSS_TOLERANCE),
            maxed_supply: Some(config.maxed_supply),
            ..standard
        },
        MissionKind::AirHarass | MissionKind::MopUp => standard,
        MissionKind::DefendBase => PolicyProfile {
            kind: PolicyKind::Defensive,
            force_when_undetected: true,
            force_when_choke_blocked: true,
            force_while_in_transit: true,
            ..standard
        },
    }
}
