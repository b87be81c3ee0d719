//! Squad engine for the skirmish tactical layer.
//!
//! Groups friendly units into clusters, runs the classifier, target
//! selection, combat simulation and engagement policy once per frame, and
//! issues unit orders through the external command surface. Units live in a
//! hecs world mirrored from the game client and are always looked up by
//! entity before use.

pub mod attrition;
pub mod cluster;
pub mod context;
pub mod engine;
pub mod gateway;
pub mod map;
pub mod squad;
pub mod units;
pub mod worker_defense;
pub mod world_setup;

pub use engine::TacticsEngine;
pub use skirmish_core as core;

#[cfg(test)]
mod tests;
