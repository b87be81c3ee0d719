//! Engagement decision logic for skirmish squads.
//!
//! Pure functions over plain data: the verdict history and its stability
//! queries, the engagement heuristic with its hysteresis wrappers, per-mission
//! policy profiles, and the threat/target classifier. No ECS dependency.

pub mod classifier;
pub mod config;
pub mod history;
pub mod policy;
pub mod profiles;

pub use skirmish_core as core;
