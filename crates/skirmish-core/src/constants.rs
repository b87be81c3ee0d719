//! Tuned thresholds for the tactical layer.
//!
//! These are defaults for `TacticsConfig`; they were tuned against real
//! opponents and are kept for behavioral parity.

use crate::types::Frame;

// --- Engagement heuristic ---

/// Friendly value fraction lost below which a fight is always taken.
pub const NEGLIGIBLE_LOSS: f64 = 0.001;

/// Aggression above which the full-aggression value-gain rule applies.
pub const FULL_AGGRESSION: f64 = 0.99;

/// Percentage swing floor for the full-aggression rule.
pub const FULL_AGGRESSION_GAIN_FLOOR: f64 = -0.05;

/// Share of total value that counts as an overwhelming majority.
pub const OVERWHELMING_SHARE: f64 = 0.9;

/// How much each unit of aggression lowers the required share of total value.
pub const SHARE_AGGRESSION_SLOPE: f64 = 0.35;

/// Base percentage swing tolerance for the share rule, scaled by aggression.
pub const SHARE_GAIN_TOLERANCE: f64 = 0.05;

/// Percentage swing bar for the clear-win rule at aggression 1.0.
pub const CLEAR_WIN_BAR: f64 = 0.2;

/// Smallest aggression fed to the heuristic; keeps the clear-win bar finite.
pub const MIN_AGGRESSION: f64 = 0.01;

// --- Aggression per activity ---

/// Aggression used when deciding whether to start a fight.
pub const START_AGGRESSION: f64 = 1.0;

/// Aggression used while already fighting.
pub const CONTINUE_AGGRESSION: f64 = 1.2;

/// Aggression used when deciding whether to stop regrouping.
pub const REGROUP_AGGRESSION: f64 = 0.8;

// --- Hysteresis windows (frames) ---

/// Lookback for the continue-attack stability query.
pub const CONTINUE_LOOKBACK: usize = 48;

/// Stable frames required before an attack may be abandoned.
pub const CONTINUE_STABLE_FRAMES: usize = 6;

/// Lookback for the stop-regrouping stability query.
pub const REGROUP_LOOKBACK: usize = 72;

/// Stable frames required before a regroup may end.
pub const REGROUP_STABLE_FRAMES: usize = 12;

/// Window in which growth of our own unit count blocks re-engaging.
pub const REINFORCEMENT_WINDOW: usize = 72;

/// Enemy value growth between consecutive results treated as new information.
pub const ENEMY_SURGE_RATIO: f64 = 1.2;

/// Default verdict history capacity per cluster.
pub const HISTORY_CAPACITY: usize = 96;

// --- Defensive policy ---

/// Percentage swing floor for the defensive verdict.
pub const DEFENSIVE_GAIN_FLOOR: f64 = -0.1;

/// Consecutive attack verdicts with a stable unit count before defenders sally out.
pub const DEFENSIVE_START_FRAMES: usize = 24;

/// Window of verdicts consulted before defenders abort an attack.
pub const DEFENSIVE_ABORT_FRAMES: usize = 12;

// --- Attack-base extras ---

/// Friendly loss tolerated when the enemy has units we cannot see.
pub const UNDETECTED_LOSS_TOLERANCE: f64 = 0.15;

/// Supply used (doubled units, out of 400) at which the main army always attacks.
pub const MAXED_SUPPLY: u32 = 380;

/// Distance factor with the armies separated by a narrow choke.
pub const NARROW_CHOKE_DISTANCE_FACTOR: f64 = 0.8;

// --- Recency (frames) ---

/// Default window in which an enemy sighting is trusted.
pub const RECENCY_DEFAULT: Frame = 120;

/// Window for slow flyers that are easy to find again.
pub const RECENCY_SLOW_FLYER: Frame = 720;

/// Window for sightings whose last known position was invalidated.
pub const RECENCY_INVALID_POSITION: Frame = 48;

/// Window in which an enemy worker seen attacking counts as a combat unit.
pub const WORKER_AGGRESSION_WINDOW: Frame = 120;

// --- Cluster management (pixels) ---

/// Distance from a cluster center within which a unit joins the cluster.
pub const CLUSTER_ADD_DISTANCE: f32 = 320.0;

/// Distance between centers at which two clusters merge.
pub const CLUSTER_COMBINE_DISTANCE: f32 = 320.0;

/// Distance from the center beyond which a member is split off.
pub const CLUSTER_REMOVE_DISTANCE: f32 = 960.0;

/// Base radius for collecting enemies into a combat simulation.
pub const SIM_RADIUS_BASE: f32 = 640.0;

/// Distance outside weapon range within which a unit attacks instead of moving.
pub const ENGAGE_PROXIMITY: f32 = 160.0;

/// Distance from the vanguard within which a detector supports the cluster.
pub const DETECTION_RADIUS: f32 = 480.0;

// --- Terrain ---

/// Chokes narrower than this (pixels) count as narrow.
pub const NARROW_CHOKE_WIDTH: f32 = 96.0;

/// Width of one blocking unit in a choke (pixels).
pub const BLOCKER_WIDTH: f32 = 32.0;

/// Distance from a choke within which a unit counts as transiting it.
pub const CHOKE_TRANSIT_RADIUS: f32 = 320.0;

/// Radius around a base position considered part of the base.
pub const BASE_RADIUS: f32 = 480.0;

// --- Combat simulation ---

/// Frames simulated forward by the reference attrition simulator.
pub const SIM_FRAMES: Frame = 144;

/// Frames advanced per attrition step.
pub const SIM_STEP_FRAMES: Frame = 8;

// --- Worker defense ---

/// Window in which an enemy attacking near a worker counts as a threat.
pub const WORKER_THREAT_WINDOW: Frame = 48;

/// Distance to a worker within which an attacking enemy threatens it.
pub const WORKER_THREAT_DISTANCE: f32 = 32.0;

/// Radius of the mineral line around a base's resource center.
pub const MINERAL_LINE_RADIUS: f32 = 256.0;

// --- Base defense ---

/// Non-building enemies must have been seen this recently to draw defenders.
pub const DEFENSE_SIGHTING_WINDOW: Frame = 48;

/// Radius around the defended choke within which enemies become targets.
pub const CHOKE_TARGET_RADIUS: f32 = 192.0;

/// Radius around the defended choke within which enemies join the simulation.
pub const CHOKE_SIM_RADIUS: f32 = 256.0;

/// Defenders chase a target only while it is this far beyond its own range.
pub const DEFENDER_CHASE_MARGIN: f32 = 64.0;

// --- Mop-up ---

/// Radius within which mop-up squads engage enemies near their units.
pub const MOP_UP_ENGAGE_RADIUS: f32 = 480.0;

// --- Regroup containment ---

/// Percentage swing floor for containing enemy static defense.
pub const CONTAIN_STATIC_GAIN_FLOOR: f64 = -0.05;

/// Percentage swing floor for containing at a choke when value is gained.
pub const CONTAIN_CHOKE_VALUE_FLOOR: f64 = -0.3;

/// Percentage swing floor for containing at a choke regardless of value.
pub const CONTAIN_CHOKE_GAIN_FLOOR: f64 = -0.2;

/// Frames of flee verdicts needed before a choke containment is abandoned.
pub const CONTAIN_CHOKE_FRAMES: usize = 24;

// --- Targeting ---

/// Distance beyond weapon range at which an enemy is no longer worth chasing.
pub const TARGET_REACH: f32 = 480.0;
