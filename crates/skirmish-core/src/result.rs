//! Combat simulation results.

use serde::{Deserialize, Serialize};

use crate::types::{Choke, Frame};

/// Outcome prediction for one matchup, produced once per policy evaluation.
///
/// All ratios are relative to the initial values of this run. Comparing two
/// runs is done through the verdict history, never by mixing their numbers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CombatSimResult {
    /// Frame the simulation was run on.
    pub frame: Frame,
    pub my_unit_count: u32,
    pub enemy_unit_count: u32,
    pub initial_mine: i32,
    pub initial_enemy: i32,
    pub final_mine: i32,
    pub final_enemy: i32,
    /// The enemy has units in the fight that none of our detectors reveal.
    pub enemy_has_undetected_units: bool,
    /// Narrow choke separating the two armies, if any.
    pub narrow_choke: Option<Choke>,
    /// Aggression the verdict was made with.
    pub aggression: f64,
    /// Distance factor the verdict was made with.
    pub distance_factor: f64,
}

impl CombatSimResult {
    /// Fraction of our initial value lost.
    pub fn my_percent_lost(&self) -> f64 {
        percent_lost(self.initial_mine, self.final_mine)
    }

    /// Fraction of the enemy's initial value lost.
    pub fn enemy_percent_lost(&self) -> f64 {
        percent_lost(self.initial_enemy, self.final_enemy)
    }

    /// Enemy value destroyed minus our value lost.
    pub fn value_gain(&self) -> i32 {
        (self.initial_enemy - self.final_enemy) - (self.initial_mine - self.final_mine)
    }

    /// Percentage swing: enemy fraction lost minus our fraction lost.
    pub fn percent_gain(&self) -> f64 {
        self.enemy_percent_lost() - self.my_percent_lost()
    }

    /// Our share of the value left standing at the end of the fight.
    pub fn my_percentage_of_total(&self) -> f64 {
        let total = self.final_mine as f64 + self.final_enemy as f64;
        if total <= 0.0 {
            return 0.0;
        }
        self.final_mine as f64 / total
    }

    /// Copy of this result with the decision parameters recorded.
    pub fn annotated(mut self, aggression: f64, distance_factor: f64) -> Self {
        self.aggression = aggression;
        self.distance_factor = distance_factor;
        self
    }
}

fn percent_lost(initial: i32, final_value: i32) -> f64 {
    if initial <= 0 {
        return 0.0;
    }
    (initial - final_value) as f64 / initial as f64
}
