//! Per-frame view handed to squads and clusters.

use hecs::{Entity, World};
use tracing::warn;

use skirmish_core::components::{Friendly, Readiness};
use skirmish_core::error::Result;
use skirmish_core::types::{Frame, Position};
use skirmish_tactics::classifier::{RecencyPolicy, ThreatGrid};
use skirmish_tactics::config::TacticsConfig;

use crate::cluster::targeting::Pairing;
use crate::gateway::{CombatSimulator, UnitOrders};
use crate::map::MapKnowledge;

/// Everything a squad may read or call during one frame.
pub struct FrameContext<'a> {
    pub world: &'a World,
    pub frame: Frame,
    pub config: &'a TacticsConfig,
    pub recency: RecencyPolicy,
    pub simulator: &'a dyn CombatSimulator,
    pub map: &'a dyn MapKnowledge,
    pub grid: &'a dyn ThreatGrid,
    pub orders: &'a mut dyn UnitOrders,
    /// Supply currently used, out of 400.
    pub supply_used: u32,
    /// Orders the command surface refused this frame.
    pub failed_orders: usize,
}

impl FrameContext<'_> {
    /// Whether a friendly unit still exists and accepts commands.
    pub fn is_ready(&self, unit: Entity) -> bool {
        if self.world.get::<&Friendly>(unit).is_err() {
            return false;
        }
        self.world
            .get::<&Readiness>(unit)
            .map(|readiness| readiness.ready)
            .unwrap_or(false)
    }

    pub fn move_unit(&mut self, unit: Entity, position: Position) {
        let outcome = self.orders.move_to(unit, position);
        self.note(outcome);
    }

    pub fn attack_unit(&mut self, unit: Entity, target: Entity, pairing: &[Pairing]) {
        let outcome = self.orders.attack_unit(unit, target, pairing);
        self.note(outcome);
    }

    pub fn hold_unit(&mut self, unit: Entity) {
        let outcome = self.orders.hold_position(unit);
        self.note(outcome);
    }

    fn note(&mut self, outcome: Result<()>) {
        if let Err(err) = outcome {
            warn!(frame = self.frame, %err, "order failed, retrying next frame");
            self.failed_orders += 1;
        }
    }
}
