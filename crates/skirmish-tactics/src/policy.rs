//! Engagement decision policy.
//!
//! `should_attack` answers whether a single simulation result justifies a
//! fight. The activity wrappers add hysteresis on top of it by consulting the
//! cluster's verdict history, and each one records exactly one verdict before
//! returning. `decide` is the single entry point squads call per cluster and
//! frame.

use serde::{Deserialize, Serialize};
use tracing::debug;

use skirmish_core::constants::*;
use skirmish_core::enums::Activity;
use skirmish_core::result::CombatSimResult;
use skirmish_core::types::Choke;

use crate::history::VerdictHistory;
use crate::profiles::{PolicyKind, PolicyProfile};

/// Situation around a cluster that is not part of the simulation result.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngagementContext {
    /// Supply currently used, out of 400.
    pub supply_used: u32,
    /// Vanguard progress from our main (0.0) to the enemy main (1.0).
    pub percentage_to_enemy_main: f64,
    /// Enemies need detection and none of our detectors is there to reveal them.
    pub undetected_threat: bool,
    /// A narrow choke is plugged by enough of our units to stop a push.
    pub choke_blocked: bool,
    /// A friendly unit is on its way through the choke we are holding.
    pub friendly_in_transit: bool,
}

/// Why a profile overrode the heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForcedReason {
    UndetectedThreat,
    ChokeBlocked,
    FriendlyInTransit,
    MaxedSupply,
}

/// Result of one policy evaluation for a cluster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub engage: bool,
    /// Set when the engagement was forced rather than earned.
    pub forced: Option<ForcedReason>,
}

/// Percentage swing needed by the clear-win rule.
pub fn clear_win_bar(aggression: f64, distance_factor: f64) -> f64 {
    CLEAR_WIN_BAR / (aggression.max(MIN_AGGRESSION) * distance_factor)
}

/// Whether a single simulation result justifies fighting at `aggression`.
pub fn should_attack(result: &CombatSimResult, aggression: f64) -> bool {
    evaluate_rules(result, aggression, 1.0, None)
}

/// The graduated rule set. The first rule that passes wins.
fn evaluate_rules(
    result: &CombatSimResult,
    aggression: f64,
    distance_factor: f64,
    undetected_loss_tolerance: Option<f64>,
) -> bool {
    let aggression = aggression.max(MIN_AGGRESSION);
    let percent_gain = result.percent_gain();

    if result.my_percent_lost() <= NEGLIGIBLE_LOSS {
        return true;
    }

    // A lone cloaked harasser is not worth running from
    if let Some(tolerance) = undetected_loss_tolerance {
        if result.enemy_has_undetected_units && result.my_percent_lost() <= tolerance {
            return true;
        }
    }

    let my_loss = result.initial_mine - result.final_mine;
    if aggression > FULL_AGGRESSION
        && result.value_gain() > my_loss / 2
        && (percent_gain > FULL_AGGRESSION_GAIN_FLOOR
            || result.my_percentage_of_total() > OVERWHELMING_SHARE)
    {
        return true;
    }

    let share_margin = result.my_percentage_of_total()
        - (OVERWHELMING_SHARE - SHARE_AGGRESSION_SLOPE * aggression);
    if share_margin > 0.0 && percent_gain > (-SHARE_GAIN_TOLERANCE * aggression - share_margin) {
        return true;
    }

    percent_gain > clear_win_bar(aggression, distance_factor)
}

/// Distance factor for a profile: in the open, press harder near home and
/// less near the enemy; across a narrow choke, be careful near either end.
pub fn distance_factor(
    profile: &PolicyProfile,
    result: &CombatSimResult,
    percentage_to_enemy_main: f64,
) -> f64 {
    if !profile.use_distance_factor {
        return 1.0;
    }
    if result.narrow_choke.is_none() {
        return 1.2 - 0.4 * percentage_to_enemy_main.clamp(0.0, 1.0);
    }
    if !(0.3..=0.7).contains(&percentage_to_enemy_main) {
        return NARROW_CHOKE_DISTANCE_FACTOR;
    }
    1.0
}

/// Reduce aggression when the fight is across a narrow choke.
///
/// A 128-pixel-wide choke costs nothing and 48 or narrower costs 0.2; length
/// costs up to 0.35 at 128 pixels.
pub fn choke_adjusted_aggression(aggression: f64, choke: Option<&Choke>) -> f64 {
    let Some(choke) = choke else {
        return aggression;
    };
    let width_penalty = 0.2 * ((128.0 - choke.width as f64) / 80.0).min(1.0);
    let length_penalty = 0.35 * (choke.length as f64 / 128.0).min(1.0);
    aggression - width_penalty.max(0.0) - length_penalty.max(0.0)
}

fn evaluate(
    result: &CombatSimResult,
    aggression: f64,
    profile: &PolicyProfile,
    ctx: &EngagementContext,
) -> (bool, CombatSimResult) {
    let factor = distance_factor(profile, result, ctx.percentage_to_enemy_main);
    let attack = evaluate_rules(result, aggression, factor, profile.undetected_loss_tolerance);
    debug!(
        frame = result.frame,
        aggression,
        distance_factor = factor,
        percent_lost = result.my_percent_lost(),
        value_gain = result.value_gain(),
        percent_gain = result.percent_gain(),
        share = result.my_percentage_of_total(),
        attack,
        "engagement verdict"
    );
    (attack, result.annotated(aggression, factor))
}

fn is_maxed(profile: &PolicyProfile, ctx: &EngagementContext) -> bool {
    profile.maxed_supply.is_some_and(|maxed| ctx.supply_used > maxed)
}

/// Decide whether a moving cluster should start a fight.
///
/// No smoothing: there is no commitment yet to protect.
pub fn should_start_attack(
    history: &mut VerdictHistory,
    result: CombatSimResult,
    profile: &PolicyProfile,
    ctx: &EngagementContext,
) -> bool {
    let (attack, annotated) = evaluate(&result, profile.start_aggression, profile, ctx);
    let attack = attack || is_maxed(profile, ctx);
    history.push(annotated, attack);
    attack
}

/// Decide whether an attacking cluster should keep fighting.
pub fn should_continue_attack(
    history: &mut VerdictHistory,
    result: CombatSimResult,
    profile: &PolicyProfile,
    ctx: &EngagementContext,
) -> bool {
    let (attack, annotated) = evaluate(&result, profile.continue_aggression, profile, ctx);
    let attack = attack || is_maxed(profile, ctx);
    history.push(annotated, attack);
    if attack {
        return true;
    }

    let Some(previous) = history.previous().map(|verdict| verdict.result) else {
        debug!(frame = result.frame, "aborting attack: first result of the fight");
        return false;
    };

    if result.initial_enemy > (previous.initial_enemy as f64 * profile.enemy_surge_ratio) as i32 {
        debug!(
            frame = result.frame,
            enemy = result.initial_enemy,
            previous = previous.initial_enemy,
            "aborting attack: enemy strength surged"
        );
        return false;
    }

    if profile.respect_chokes && result.narrow_choke.is_some() && previous.narrow_choke.is_none() {
        debug!(frame = result.frame, "aborting attack: fight is now across a narrow choke");
        return false;
    }

    let counts = history.consecutive_sim_results(profile.continue_lookback);
    if counts.consecutive < profile.continue_stable_frames {
        return true;
    }
    if counts.attack_frames > counts.regroup_frames {
        return true;
    }

    debug!(
        frame = result.frame,
        attack = counts.attack_frames,
        regroup = counts.regroup_frames,
        "aborting attack: regroup verdicts are stable"
    );
    false
}

/// Decide whether a regrouping cluster should re-engage.
pub fn should_stop_regrouping(
    history: &mut VerdictHistory,
    result: CombatSimResult,
    profile: &PolicyProfile,
    ctx: &EngagementContext,
) -> bool {
    let aggression = if profile.respect_chokes {
        choke_adjusted_aggression(profile.regroup_aggression, result.narrow_choke.as_ref())
    } else {
        profile.regroup_aggression
    };
    let (attack, annotated) = evaluate(&result, aggression, profile, ctx);
    if is_maxed(profile, ctx) {
        history.push(annotated, true);
        return true;
    }
    history.push(annotated, attack);
    if !attack {
        return false;
    }

    let counts = history.consecutive_sim_results(profile.regroup_lookback);
    if counts.consecutive < profile.regroup_stable_frames {
        return false;
    }
    if counts.regroup_frames > counts.attack_frames {
        return false;
    }

    // Let reinforcements link up before committing again
    let reinforced = history
        .recent(profile.reinforcement_window)
        .any(|verdict| result.my_unit_count > verdict.result.my_unit_count);
    if reinforced {
        debug!(frame = result.frame, "still regrouping: reinforcements are linking up");
        return false;
    }

    true
}

/// Trade check used by defenders: fight unless the swing is clearly bad.
pub fn defensive_verdict(result: &CombatSimResult, profile: &PolicyProfile) -> bool {
    result.my_percent_lost() <= NEGLIGIBLE_LOSS || result.percent_gain() > profile.defensive_gain_floor
}

/// Defenders only sally out once the same force has been told to attack for
/// the whole start window.
fn defenders_should_start(
    history: &VerdictHistory,
    result: &CombatSimResult,
    profile: &PolicyProfile,
) -> bool {
    let window = profile.defensive_start_frames;
    history.len() >= window
        && history
            .recent(window)
            .all(|verdict| verdict.engaged && verdict.result.my_unit_count == result.my_unit_count)
}

fn defenders_should_abort(
    history: &VerdictHistory,
    result: &CombatSimResult,
    profile: &PolicyProfile,
) -> bool {
    let Some(previous) = history.previous() else {
        return true;
    };
    if result.enemy_unit_count > previous.result.enemy_unit_count {
        return true;
    }
    let window = profile.defensive_abort_frames;
    if history.len() < window {
        return false;
    }
    !history.recent(window).any(|verdict| verdict.engaged)
}

fn decide_defensive(
    activity: Activity,
    history: &mut VerdictHistory,
    result: CombatSimResult,
    profile: &PolicyProfile,
) -> bool {
    let attack = defensive_verdict(&result, profile);
    history.push(result.annotated(1.0, 1.0), attack);

    match activity {
        Activity::Regrouping if attack => defenders_should_start(history, &result, profile),
        Activity::Attacking if !attack => !defenders_should_abort(history, &result, profile),
        _ => attack,
    }
}

/// Situational override that makes a profile engage regardless of the trade.
pub fn forced_engagement(profile: &PolicyProfile, ctx: &EngagementContext) -> Option<ForcedReason> {
    if profile.force_while_in_transit && ctx.friendly_in_transit {
        return Some(ForcedReason::FriendlyInTransit);
    }
    if profile.force_when_undetected && ctx.undetected_threat {
        return Some(ForcedReason::UndetectedThreat);
    }
    if profile.force_when_choke_blocked && ctx.choke_blocked {
        return Some(ForcedReason::ChokeBlocked);
    }
    if profile.kind == PolicyKind::Defensive && is_maxed(profile, ctx) {
        return Some(ForcedReason::MaxedSupply);
    }
    None
}

/// Record an override as an engaged verdict for `result.frame`.
///
/// Also used when there is no matchup to simulate, with an empty result.
pub fn record_forced(
    history: &mut VerdictHistory,
    result: CombatSimResult,
    profile: &PolicyProfile,
    reason: ForcedReason,
) -> Decision {
    debug!(frame = result.frame, ?reason, "engagement forced");
    history.push_forced(result.annotated(profile.start_aggression, 1.0), reason);
    Decision {
        engage: true,
        forced: Some(reason),
    }
}

/// Run the policy for one cluster on one frame and record the verdict.
pub fn decide(
    activity: Activity,
    history: &mut VerdictHistory,
    result: CombatSimResult,
    profile: &PolicyProfile,
    ctx: &EngagementContext,
) -> Decision {
    if let Some(reason) = forced_engagement(profile, ctx) {
        return record_forced(history, result, profile, reason);
    }

    let engage = match profile.kind {
        PolicyKind::Standard => match activity {
            Activity::Moving => should_start_attack(history, result, profile, ctx),
            Activity::Attacking => should_continue_attack(history, result, profile, ctx),
            Activity::Regrouping => should_stop_regrouping(history, result, profile, ctx),
        },
        PolicyKind::Defensive => decide_defensive(activity, history, result, profile),
    };
    Decision {
        engage,
        forced: None,
    }
}

/// Whether a regrouping cluster should contain enemy static defense, judged
/// on a simulation with that static defense left out.
pub fn should_contain_static(result_without_static: &CombatSimResult) -> bool {
    result_without_static.my_percent_lost() <= NEGLIGIBLE_LOSS
        || (result_without_static.value_gain() > 0
            && result_without_static.percent_gain() > CONTAIN_STATIC_GAIN_FLOOR)
        || result_without_static.percent_gain() > CLEAR_WIN_BAR
}

/// Whether a regrouping cluster should hold its side of a narrow choke.
///
/// Records into the separate regroup history. Containment is kept until the
/// flee verdict has been stable for the whole window.
pub fn should_contain_choke(regroup_history: &mut VerdictHistory, result: CombatSimResult) -> bool {
    if result.narrow_choke.is_none() {
        return false;
    }

    let contain = result.my_percent_lost() <= NEGLIGIBLE_LOSS
        || (result.value_gain() > 0 && result.percent_gain() > CONTAIN_CHOKE_VALUE_FLOOR)
        || result.percent_gain() > CONTAIN_CHOKE_GAIN_FLOOR;
    regroup_history.push(result, contain);

    if contain {
        return true;
    }
    if regroup_history.len() < 2 {
        return false;
    }
    if regroup_history.len() < CONTAIN_CHOKE_FRAMES {
        return true;
    }
    regroup_history
        .recent(CONTAIN_CHOKE_FRAMES)
        .any(|verdict| verdict.engaged)
}
