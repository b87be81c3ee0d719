//! Core types and definitions for the skirmish tactical layer.
//!
//! This crate defines the vocabulary shared by the decision logic and the
//! squad engine: unit kinds and their stats, hecs components, combat
//! simulation results, tuned constants, and the error type.
//! It has no dependency on any game client or runtime framework.

pub mod components;
pub mod constants;
pub mod enums;
pub mod error;
pub mod result;
pub mod types;
pub mod unit_kinds;
