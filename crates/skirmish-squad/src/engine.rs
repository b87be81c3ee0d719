//! Tactics engine: the per-frame driver for every squad.
//!
//! `TacticsEngine` owns the squads and the unit assignment table but never
//! the units themselves. The game-turn driver hands it the current world and
//! gateways each frame, and gets a serializable `FrameReport` back. All
//! iteration is in id order so identical inputs give identical orders.

use std::collections::BTreeMap;

use hecs::{Entity, World};
use serde::Serialize;
use tracing::{debug, info};

use skirmish_core::enums::{Activity, SubActivity};
use skirmish_core::error::{Result, TacticsError};
use skirmish_core::types::{Frame, Position, SquadId};
use skirmish_tactics::classifier::RecencyPolicy;
use skirmish_tactics::config::TacticsConfig;
use skirmish_tactics::policy::ForcedReason;

use crate::cluster::UnitCluster;
use crate::context::FrameContext;
use crate::gateway::{CombatSimulator, UnitOrders};
use crate::map::{EnemyCoverage, MapKnowledge};
use crate::squad::{Mission, Squad};
use crate::worker_defense::{WorkerDefense, WorkerDefenseReport};

/// What the game-turn driver supplies for one frame.
pub struct FrameInputs<'a> {
    pub world: &'a World,
    pub frame: Frame,
    /// Supply currently used, out of 400.
    pub supply_used: u32,
    pub simulator: &'a dyn CombatSimulator,
    pub map: &'a dyn MapKnowledge,
    pub orders: &'a mut dyn UnitOrders,
}

/// State of one cluster after the frame's update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterReport {
    pub id: u32,
    pub activity: Activity,
    pub sub_activity: SubActivity,
    pub center: Position,
    pub units: Vec<u64>,
    /// Verdict recorded this frame, if the policy ran.
    pub engaged: Option<bool>,
    /// Override behind this frame's verdict.
    pub forced: Option<ForcedReason>,
}

impl ClusterReport {
    fn of(cluster: &UnitCluster, frame: Frame) -> Self {
        let current = cluster.history().last().filter(|verdict| verdict.result.frame == frame);
        Self {
            id: cluster.id,
            activity: cluster.activity(),
            sub_activity: cluster.sub_activity(),
            center: cluster.center,
            units: cluster.units().map(|unit| unit.to_bits().get()).collect(),
            engaged: current.map(|verdict| verdict.engaged),
            forced: current.and_then(|verdict| verdict.forced),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SquadReport {
    pub id: SquadId,
    pub label: String,
    pub mission: Mission,
    pub target_position: Position,
    pub clusters: Vec<ClusterReport>,
    pub worker_defense: Option<WorkerDefenseReport>,
}

/// Everything the engine did on one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameReport {
    pub frame: Frame,
    /// Orders the command surface refused; they are reissued next frame.
    pub failed_orders: usize,
    pub squads: Vec<SquadReport>,
}

/// Owner of all squads.
pub struct TacticsEngine {
    config: TacticsConfig,
    squads: BTreeMap<SquadId, Squad>,
    worker_defense: BTreeMap<SquadId, WorkerDefense>,
    assigned: BTreeMap<Entity, SquadId>,
    next_squad_id: u32,
}

impl TacticsEngine {
    pub fn new(config: TacticsConfig) -> Self {
        Self {
            config,
            squads: BTreeMap::new(),
            worker_defense: BTreeMap::new(),
            assigned: BTreeMap::new(),
            next_squad_id: 0,
        }
    }

    /// Build an engine from a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::new(TacticsConfig::from_json(json)?))
    }

    pub fn config(&self) -> &TacticsConfig {
        &self.config
    }

    /// Create a squad. Base defenders get worker defense for their base.
    pub fn add_squad(&mut self, label: impl Into<String>, mission: Mission, target: Position) -> SquadId {
        let id = SquadId(self.next_squad_id);
        self.next_squad_id += 1;
        let squad = Squad::new(id, label, mission, target, &self.config);
        info!(squad = %squad.label, ?mission, "squad created");
        if let Mission::DefendBase { base } = mission {
            self.worker_defense.insert(id, WorkerDefense::new(base));
        }
        self.squads.insert(id, squad);
        id
    }

    /// Remove a squad and return every unit it held, reserved workers included.
    pub fn disband_squad(&mut self, id: SquadId) -> Result<Vec<Entity>> {
        let squad = self.squads.remove(&id).ok_or(TacticsError::SquadMissing(id))?;
        self.assigned.retain(|_, owner| *owner != id);
        let mut released = squad.disband();
        if let Some(mut defense) = self.worker_defense.remove(&id) {
            released.extend(defense.disband());
        }
        released.sort();
        Ok(released)
    }

    /// Put a unit in a squad, moving it out of any squad it was in.
    pub fn assign_unit(&mut self, world: &World, squad_id: SquadId, unit: Entity) -> Result<()> {
        if !self.squads.contains_key(&squad_id) {
            return Err(TacticsError::SquadMissing(squad_id));
        }
        match self.assigned.get(&unit).copied() {
            Some(current) if current == squad_id => return Ok(()),
            Some(_) => {
                self.release_unit(unit);
            }
            None => {}
        }
        let squad = self.squads.get_mut(&squad_id).ok_or(TacticsError::SquadMissing(squad_id))?;
        squad.add_unit(world, unit)?;
        self.assigned.insert(unit, squad_id);
        Ok(())
    }

    /// Take a unit out of its squad. Returns false if it had none.
    pub fn release_unit(&mut self, unit: Entity) -> bool {
        let Some(id) = self.assigned.remove(&unit) else {
            return false;
        };
        self.squads.get_mut(&id).is_some_and(|squad| squad.remove_unit(unit))
    }

    pub fn squad(&self, id: SquadId) -> Option<&Squad> {
        self.squads.get(&id)
    }

    pub fn squad_mut(&mut self, id: SquadId) -> Option<&mut Squad> {
        self.squads.get_mut(&id)
    }

    pub fn squads(&self) -> impl Iterator<Item = &Squad> {
        self.squads.values()
    }

    /// Squad a unit belongs to.
    pub fn squad_of(&self, unit: Entity) -> Option<SquadId> {
        self.assigned.get(&unit).copied()
    }

    /// Run every squad once for this frame.
    pub fn update(&mut self, inputs: FrameInputs<'_>) -> FrameReport {
        let recency = RecencyPolicy::from_config(&self.config);
        let coverage = EnemyCoverage::from_world(inputs.world, inputs.frame, &recency);
        let mut ctx = FrameContext {
            world: inputs.world,
            frame: inputs.frame,
            config: &self.config,
            recency,
            simulator: inputs.simulator,
            map: inputs.map,
            grid: &coverage,
            orders: inputs.orders,
            supply_used: inputs.supply_used,
            failed_orders: 0,
        };

        let assigned = &self.assigned;
        let mut squads = Vec::with_capacity(self.squads.len());
        for (id, squad) in &mut self.squads {
            squad.update(&mut ctx);

            let defended = match squad.mission() {
                Mission::DefendBase { base } => ctx.map.base(base).copied(),
                _ => None,
            };
            let worker_defense = match (defended, self.worker_defense.get_mut(id)) {
                (Some(base), Some(defense)) => {
                    Some(defense.execute(&mut ctx, squad, &base, |unit| assigned.contains_key(&unit)))
                }
                _ => None,
            };

            squads.push(SquadReport {
                id: *id,
                label: squad.label.clone(),
                mission: squad.mission(),
                target_position: squad.target_position,
                clusters: squad
                    .clusters()
                    .iter()
                    .map(|cluster| ClusterReport::of(cluster, inputs.frame))
                    .collect(),
                worker_defense,
            });
        }
        let failed_orders = ctx.failed_orders;

        // Squads drop dead units while updating; forget them here too
        let before = self.assigned.len();
        let squads_by_id = &self.squads;
        self.assigned
            .retain(|unit, id| squads_by_id.get(id).is_some_and(|squad| squad.contains(*unit)));
        if self.assigned.len() != before {
            debug!(frame = inputs.frame, dropped = before - self.assigned.len(), "assignments pruned");
        }

        FrameReport {
            frame: inputs.frame,
            failed_orders,
            squads,
        }
    }
}
