//! Contracts with the external collaborators: the combat simulator and the
//! unit command surface.

use hecs::Entity;

use skirmish_core::error::{Result, TacticsError};
use skirmish_core::result::CombatSimResult;
use skirmish_core::types::{Choke, Frame, Position};
use skirmish_core::unit_kinds::UnitKind;

use crate::cluster::targeting::Pairing;

/// One unit as seen by the combat simulator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimUnit {
    pub id: Entity,
    pub kind: UnitKind,
    pub position: Position,
    pub hp: i32,
    pub shields: i32,
    pub cooldown_remaining: u32,
    /// Target assigned by target selection, friendly side only.
    pub target: Option<Entity>,
    /// False for enemies none of our detectors reveal.
    pub detected: bool,
    /// Counts toward value but never deals damage.
    pub passive: bool,
}

/// Everything the simulator needs for one matchup.
#[derive(Debug, Clone, PartialEq)]
pub struct SimSnapshot {
    pub frame: Frame,
    pub target_position: Position,
    pub friendly: Vec<SimUnit>,
    pub enemy: Vec<SimUnit>,
    /// Positions of friendly detectors supporting the fight.
    pub detectors: Vec<Position>,
    /// Friendly units without a target back away from the enemy instead of fighting.
    pub include_retreat: bool,
    pub narrow_choke: Option<Choke>,
}

/// Forward combat simulation. Must be deterministic for a fixed snapshot.
pub trait CombatSimulator {
    fn simulate(&self, snapshot: &SimSnapshot) -> Result<CombatSimResult>;
}

/// Low-level unit command surface. A failed order is reported, never fatal.
pub trait UnitOrders {
    fn move_to(&mut self, unit: Entity, position: Position) -> Result<()>;

    /// Attack `target`. The full pairing is passed along so the command layer
    /// can coordinate focus fire.
    fn attack_unit(&mut self, unit: Entity, target: Entity, pairing: &[Pairing]) -> Result<()>;

    fn hold_position(&mut self, unit: Entity) -> Result<()>;
}

/// An order captured by `RecordingOrders`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Order {
    Move { unit: Entity, position: Position },
    Attack { unit: Entity, target: Entity },
    Hold { unit: Entity },
}

impl Order {
    pub fn unit(&self) -> Entity {
        match *self {
            Order::Move { unit, .. } | Order::Attack { unit, .. } | Order::Hold { unit } => unit,
        }
    }
}

/// Command surface that records orders instead of sending them anywhere.
/// Units listed in `rejected` have every order refused.
#[derive(Debug, Default)]
pub struct RecordingOrders {
    pub orders: Vec<Order>,
    pub rejected: Vec<Entity>,
}

impl RecordingOrders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Orders issued to one unit, oldest first.
    pub fn orders_for(&self, unit: Entity) -> Vec<Order> {
        self.orders.iter().copied().filter(|o| o.unit() == unit).collect()
    }

    pub fn clear(&mut self) {
        self.orders.clear();
    }

    fn record(&mut self, order: Order) -> Result<()> {
        if self.rejected.contains(&order.unit()) {
            return Err(TacticsError::OrderRejected {
                unit: order.unit(),
                reason: "unit refuses orders".into(),
            });
        }
        self.orders.push(order);
        Ok(())
    }
}

impl UnitOrders for RecordingOrders {
    fn move_to(&mut self, unit: Entity, position: Position) -> Result<()> {
        self.record(Order::Move { unit, position })
    }

    fn attack_unit(&mut self, unit: Entity, target: Entity, _pairing: &[Pairing]) -> Result<()> {
        self.record(Order::Attack { unit, target })
    }

    fn hold_position(&mut self, unit: Entity) -> Result<()> {
        self.record(Order::Hold { unit })
    }
}
