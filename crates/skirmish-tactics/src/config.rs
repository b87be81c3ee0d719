//! Tunable thresholds for the tactical layer.
//!
//! Every field defaults to the matching constant in `skirmish_core::constants`,
//! so a partial JSON document only overrides what it names.

use serde::{Deserialize, Serialize};

use skirmish_core::constants::*;
use skirmish_core::error::{Result, TacticsError};
use skirmish_core::types::Frame;

/// Configuration for the decision policy, classifier and cluster management.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TacticsConfig {
    /// Aggression when deciding to start a fight.
    pub start_aggression: f64,
    /// Aggression while already fighting.
    pub continue_aggression: f64,
    /// Aggression when deciding to stop regrouping.
    pub regroup_aggression: f64,
    pub continue_lookback: usize,
    pub continue_stable_frames: usize,
    pub regroup_lookback: usize,
    pub regroup_stable_frames: usize,
    /// Frames during which growth of our unit count blocks re-engaging.
    pub reinforcement_window: usize,
    /// Enemy value growth ratio that aborts an attack immediately.
    pub enemy_surge_ratio: f64,
    /// Maximum verdicts kept per cluster.
    pub history_capacity: usize,
    pub defensive_start_frames: usize,
    pub defensive_abort_frames: usize,
    /// Supply (out of 400) at which the main army always attacks.
    pub maxed_supply: u32,
    pub recency_default: Frame,
    pub recency_slow_flyer: Frame,
    pub recency_invalid_position: Frame,
    pub cluster_add_distance: f32,
    pub cluster_combine_distance: f32,
    pub cluster_remove_distance: f32,
    /// Base radius for collecting enemies into a simulation.
    pub sim_radius_base: f32,
    /// Distance outside weapon range within which units attack instead of moving.
    pub engage_proximity: f32,
    /// Let the simulation model enemies that cannot be targeted falling back.
    pub include_retreat: bool,
}

impl Default for TacticsConfig {
    fn default() -> Self {
        Self {
            start_aggression: START_AGGRESSION,
            continue_aggression: CONTINUE_AGGRESSION,
            regroup_aggression: REGROUP_AGGRESSION,
            continue_lookback: CONTINUE_LOOKBACK,
            continue_stable_frames: CONTINUE_STABLE_FRAMES,
            regroup_lookback: REGROUP_LOOKBACK,
            regroup_stable_frames: REGROUP_STABLE_FRAMES,
            reinforcement_window: REINFORCEMENT_WINDOW,
            enemy_surge_ratio: ENEMY_SURGE_RATIO,
            history_capacity: HISTORY_CAPACITY,
            defensive_start_frames: DEFENSIVE_START_FRAMES,
            defensive_abort_frames: DEFENSIVE_ABORT_FRAMES,
            maxed_supply: MAXED_SUPPLY,
            recency_default: RECENCY_DEFAULT,
            recency_slow_flyer: RECENCY_SLOW_FLYER,
            recency_invalid_position: RECENCY_INVALID_POSITION,
            cluster_add_distance: CLUSTER_ADD_DISTANCE,
            cluster_combine_distance: CLUSTER_COMBINE_DISTANCE,
            cluster_remove_distance: CLUSTER_REMOVE_DISTANCE,
            sim_radius_base: SIM_RADIUS_BASE,
            engage_proximity: ENGAGE_PROXIMITY,
            include_retreat: true,
        }
    }
}

impl TacticsConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: TacticsConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the policy cannot run with.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("start_aggression", self.start_aggression),
            ("continue_aggression", self.continue_aggression),
            ("regroup_aggression", self.regroup_aggression),
        ] {
            if value.is_nan() || value <= 0.0 {
                return Err(TacticsError::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }

        let longest = self.longest_lookback();
        if self.history_capacity < longest {
            return Err(TacticsError::InvalidConfig(format!(
                "history_capacity {} is shorter than the longest lookback {}",
                self.history_capacity, longest
            )));
        }

        if self.cluster_remove_distance < self.cluster_add_distance {
            return Err(TacticsError::InvalidConfig(
                "cluster_remove_distance must not be smaller than cluster_add_distance".into(),
            ));
        }

        Ok(())
    }

    /// Longest trailing window any policy reads from the history.
    pub fn longest_lookback(&self) -> usize {
        [
            self.continue_lookback,
            self.regroup_lookback,
            self.reinforcement_window,
            self.defensive_start_frames,
            self.defensive_abort_frames,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }
}
