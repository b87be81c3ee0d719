//! Squads: mission-scoped owners of unit clusters.
//!
//! A squad keeps its clusters in shape (pruning dead units, merging close
//! clusters, splitting off stragglers) and runs its mission once per frame.
//! Every mission feeds the same engagement flow: classify, select targets,
//! simulate, decide, then issue orders for the resulting activity.

pub mod air_harass;
pub mod attack_base;
pub mod defend_base;
pub mod mop_up;
pub mod rally;

use std::collections::{BTreeMap, BTreeSet};

use hecs::{Entity, World};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use skirmish_core::enums::{Activity, MissionKind, SubActivity};
use skirmish_core::error::{Result, TacticsError};
use skirmish_core::result::CombatSimResult;
use skirmish_core::types::{BaseId, Choke, Position, SquadId};
use skirmish_tactics::classifier::{classify, BaseView, ClassifyRequest, EnemyView, ThreatBuckets};
use skirmish_tactics::config::TacticsConfig;
use skirmish_tactics::policy::{self, Decision, EngagementContext, ForcedReason};
use skirmish_tactics::profiles::{get_profile, PolicyProfile};

use crate::cluster::combat_sim::{run_combat_sim, SimRequest};
use crate::cluster::micro;
use crate::cluster::targeting::{self, Pairing};
use crate::cluster::UnitCluster;
use crate::context::FrameContext;
use crate::units::{self, EnemyUnit};

/// What a squad was created to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mission {
    /// Main army pushing toward a base.
    AttackBase,
    /// Air-to-air patrol that scouts when idle.
    AirHarass,
    /// Hold one of our bases, at its choke when it has one.
    DefendBase { base: BaseId },
    /// Hunt down the remaining enemy buildings.
    MopUp,
}

impl Mission {
    pub fn kind(&self) -> MissionKind {
        match self {
            Mission::AttackBase => MissionKind::AttackBase,
            Mission::AirHarass => MissionKind::AirHarass,
            Mission::DefendBase { .. } => MissionKind::DefendBase,
            Mission::MopUp => MissionKind::MopUp,
        }
    }
}

/// Cluster whose vanguard is closest to the target.
pub(crate) fn lead_cluster(clusters: &[UnitCluster]) -> Option<&UnitCluster> {
    clusters
        .iter()
        .filter(|c| c.vanguard.is_some())
        .min_by(|a, b| {
            a.vanguard_distance_to_target
                .total_cmp(&b.vanguard_distance_to_target)
                .then(a.id.cmp(&b.id))
        })
}

/// What a mission hands to the shared engagement flow for one cluster.
#[derive(Debug, Clone)]
pub(crate) struct Engagement {
    /// Enemies the cluster may target.
    pub candidates: Vec<Entity>,
    /// Additional enemies that take part in the simulation.
    pub sim_enemies: Vec<Entity>,
    /// Position target selection favours.
    pub reference: Position,
    /// Where to go when nothing is worth shooting.
    pub fallback: Position,
    pub context: EngagementContext,
    pub choke: Option<Choke>,
    pub include_retreat: bool,
}

/// Outcome of the shared engagement flow.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Evaluation {
    /// No matchup to judge; the cluster is moving to the fallback.
    Repositioned,
    Decided {
        decision: Decision,
        result: CombatSimResult,
    },
}

/// A mission-scoped group of clusters.
#[derive(Debug, Clone)]
pub struct Squad {
    pub id: SquadId,
    pub label: String,
    mission: Mission,
    /// Aiming point of the mission.
    pub target_position: Position,
    /// Friendly detectors supporting this squad.
    pub detectors: Vec<Entity>,
    clusters: Vec<UnitCluster>,
    unit_to_cluster: BTreeMap<Entity, u32>,
    next_cluster_id: u32,
    profile: PolicyProfile,
    history_capacity: usize,
    add_distance: f32,
    combine_distance: f32,
    remove_distance: f32,
}

impl Squad {
    pub fn new(
        id: SquadId,
        label: impl Into<String>,
        mission: Mission,
        target_position: Position,
        config: &TacticsConfig,
    ) -> Self {
        Self {
            id,
            label: label.into(),
            mission,
            target_position,
            detectors: Vec::new(),
            clusters: Vec::new(),
            unit_to_cluster: BTreeMap::new(),
            next_cluster_id: 0,
            profile: get_profile(mission.kind(), config),
            history_capacity: config.history_capacity,
            add_distance: config.cluster_add_distance,
            combine_distance: config.cluster_combine_distance,
            remove_distance: config.cluster_remove_distance,
        }
    }

    pub fn mission(&self) -> Mission {
        self.mission
    }

    pub fn profile(&self) -> &PolicyProfile {
        &self.profile
    }

    pub fn clusters(&self) -> &[UnitCluster] {
        &self.clusters
    }

    pub fn cluster(&self, id: u32) -> Option<&UnitCluster> {
        self.clusters.iter().find(|c| c.id == id)
    }

    pub fn cluster_mut(&mut self, id: u32) -> Option<&mut UnitCluster> {
        self.clusters.iter_mut().find(|c| c.id == id)
    }

    pub fn cluster_of(&self, unit: Entity) -> Option<&UnitCluster> {
        let id = self.unit_to_cluster.get(&unit)?;
        self.cluster(*id)
    }

    pub fn contains(&self, unit: Entity) -> bool {
        self.unit_to_cluster.contains_key(&unit)
    }

    /// Members of every cluster, in entity order.
    pub fn units(&self) -> Vec<Entity> {
        self.unit_to_cluster.keys().copied().collect()
    }

    pub fn add_unit(&mut self, world: &World, unit: Entity) -> Result<()> {
        let friendly = units::friendly(world, unit).ok_or(TacticsError::UnitMissing(unit))?;
        debug!(squad = %self.label, ?unit, kind = ?friendly.kind, "unit added to squad");
        self.add_to_best_cluster(unit, friendly.position);
        Ok(())
    }

    fn add_to_best_cluster(&mut self, unit: Entity, position: Position) {
        let add_distance = self.add_distance;
        let best = self
            .clusters
            .iter_mut()
            .filter(|c| c.center.distance(position) <= add_distance)
            .min_by(|a, b| {
                a.center
                    .distance(position)
                    .total_cmp(&b.center.distance(position))
                    .then(a.id.cmp(&b.id))
            });

        let cluster_id = match best {
            Some(cluster) => {
                cluster.add_unit(unit);
                cluster.id
            }
            None => {
                let mut cluster = UnitCluster::new(self.next_cluster_id, self.history_capacity);
                self.next_cluster_id += 1;
                cluster.center = position;
                cluster.add_unit(unit);
                let id = cluster.id;
                self.clusters.push(cluster);
                id
            }
        };
        self.unit_to_cluster.insert(unit, cluster_id);
    }

    /// Remove a unit from the squad. Empty clusters are dropped.
    pub fn remove_unit(&mut self, unit: Entity) -> bool {
        let Some(cluster_id) = self.unit_to_cluster.remove(&unit) else {
            return false;
        };
        debug!(squad = %self.label, ?unit, "unit removed from squad");
        if let Some(cluster) = self.clusters.iter_mut().find(|c| c.id == cluster_id) {
            cluster.remove_unit(unit);
        }
        self.clusters.retain(|c| !c.is_empty());
        true
    }

    /// Release every unit. The squad's clusters and histories are discarded.
    pub fn disband(self) -> Vec<Entity> {
        info!(squad = %self.label, units = self.unit_to_cluster.len(), "squad disbanded");
        self.unit_to_cluster.into_keys().collect()
    }

    /// Refresh cluster geometry and membership for this frame.
    pub fn update_clusters(&mut self, ctx: &FrameContext<'_>) {
        let my_main = ctx.map.my_main().map(|b| b.position);
        let enemy_main = ctx.map.enemy_main().map(|b| b.position);
        let target = self.target_position;

        for cluster in &mut self.clusters {
            for dead in cluster.update_positions(ctx.world, target, my_main, enemy_main) {
                self.unit_to_cluster.remove(&dead);
            }
        }
        self.clusters.retain(|cluster| {
            if cluster.is_empty() {
                info!(cluster = cluster.id, frame = ctx.frame, "cluster removed: no living members");
            }
            !cluster.is_empty()
        });

        // Larger clusters absorb nearby smaller ones
        let mut i = 0;
        while i < self.clusters.len() {
            let mut j = i + 1;
            while j < self.clusters.len() {
                if self.clusters[i].center.distance(self.clusters[j].center) > self.combine_distance {
                    j += 1;
                    continue;
                }
                if self.clusters[j].len() > self.clusters[i].len() {
                    self.clusters.swap(i, j);
                }
                let absorbed = self.clusters.remove(j);
                let keeper = &mut self.clusters[i];
                for unit in absorbed.units() {
                    self.unit_to_cluster.insert(unit, keeper.id);
                }
                keeper.absorb(absorbed);
                keeper.update_positions(ctx.world, target, my_main, enemy_main);
            }
            i += 1;
        }
        self.clusters.sort_by_key(|c| c.id);

        let mut stragglers = Vec::new();
        for cluster in &mut self.clusters {
            for unit in cluster.outliers(ctx.world, self.remove_distance) {
                cluster.remove_unit(unit);
                stragglers.push(unit);
            }
        }
        self.clusters.retain(|c| !c.is_empty());
        for unit in stragglers {
            if let Some(friendly) = units::friendly(ctx.world, unit) {
                debug!(squad = %self.label, ?unit, "unit split from its cluster");
                self.add_to_best_cluster(unit, friendly.position);
            }
        }
        for cluster in &mut self.clusters {
            cluster.update_positions(ctx.world, target, my_main, enemy_main);
        }
    }

    /// Cluster whose vanguard is closest to the target.
    pub fn vanguard_cluster(&self) -> Option<&UnitCluster> {
        lead_cluster(&self.clusters)
    }

    /// For each threat, our units in attacking clusters already paired with it.
    pub fn converging_on(&self, threats: &[Entity]) -> BTreeMap<Entity, Vec<Entity>> {
        let wanted: BTreeSet<Entity> = threats.iter().copied().collect();
        let mut converging: BTreeMap<Entity, Vec<Entity>> = BTreeMap::new();
        for cluster in &self.clusters {
            if cluster.activity() != Activity::Attacking {
                continue;
            }
            for pair in &cluster.pairing {
                if let Some(target) = pair.target.filter(|t| wanted.contains(t)) {
                    converging.entry(target).or_default().push(pair.unit);
                }
            }
        }
        for units in converging.values_mut() {
            units.sort();
        }
        converging
    }

    /// Run the mission for this frame.
    pub fn update(&mut self, ctx: &mut FrameContext<'_>) {
        self.update_clusters(ctx);
        if self.clusters.is_empty() {
            return;
        }
        match self.mission {
            Mission::AttackBase => attack_base::execute(self, ctx),
            Mission::AirHarass => air_harass::execute(self, ctx),
            Mission::DefendBase { base } => defend_base::execute(self, ctx, base),
            Mission::MopUp => mop_up::execute(self, ctx),
        }
    }

    /// Detach the clusters so missions can mutate them alongside the squad.
    pub(crate) fn take_clusters(&mut self) -> Vec<UnitCluster> {
        std::mem::take(&mut self.clusters)
    }

    pub(crate) fn restore_clusters(&mut self, clusters: Vec<UnitCluster>) {
        self.clusters = clusters;
    }

    /// Classify the visible enemies for a cluster and return the most urgent bucket.
    pub(crate) fn classify_for(
        &self,
        cluster: &UnitCluster,
        ctx: &FrameContext<'_>,
        area: Option<(Position, f32)>,
    ) -> ThreatBuckets<Entity> {
        let enemies: Vec<EnemyView<Entity>> = units::all_enemies(ctx.world).iter().map(EnemyUnit::view).collect();
        let bases: Vec<BaseView> = ctx
            .map
            .my_bases()
            .iter()
            .map(|base| BaseView {
                id: base.id,
                position: base.position,
                minerals: base.minerals,
            })
            .collect();
        let request = ClassifyRequest {
            frame: ctx.frame,
            enemies: &enemies,
            bases: &bases,
            hits_ground: cluster.hits_ground(ctx.world),
            hits_air: cluster.hits_air(ctx.world),
            cluster_flying: cluster.is_flying(ctx.world),
            area,
        };
        classify(&request, &ctx.recency, ctx.grid)
    }

    pub(crate) fn priority_targets(
        &self,
        cluster: &UnitCluster,
        ctx: &FrameContext<'_>,
        area: Option<(Position, f32)>,
    ) -> Vec<Entity> {
        match self.classify_for(cluster, ctx, area).highest_priority() {
            Some((bucket, ids)) => {
                debug!(squad = %self.label, cluster = cluster.id, ?bucket, targets = ids.len(), "targeting bucket");
                ids
            }
            None => Vec::new(),
        }
    }

    /// Select targets, simulate and run the policy for one cluster.
    ///
    /// Situational overrides are honoured even when nothing can be targeted,
    /// since cloaked enemies never make it into the pairing. Otherwise,
    /// without a viable target or a simulation result, the cluster moves to
    /// the fallback instead of guessing.
    pub(crate) fn evaluate(
        &self,
        cluster: &mut UnitCluster,
        ctx: &mut FrameContext<'_>,
        engagement: &Engagement,
    ) -> Evaluation {
        cluster.pairing = targeting::select_targets(
            ctx.world,
            &cluster.members(),
            &engagement.candidates,
            engagement.reference,
            ctx.frame,
            &cluster.pairing,
        );
        if !targeting::has_target(&cluster.pairing) {
            let forced = policy::forced_engagement(&self.profile, &engagement.context)
                .filter(|reason| *reason != ForcedReason::MaxedSupply);
            if let Some(reason) = forced {
                let result = CombatSimResult {
                    frame: ctx.frame,
                    ..Default::default()
                };
                let decision = policy::record_forced(cluster.history_mut(), result, &self.profile, reason);
                return Evaluation::Decided { decision, result };
            }
            debug!(squad = %self.label, cluster = cluster.id, "no viable target, repositioning");
            self.reposition(cluster, ctx, engagement.fallback);
            return Evaluation::Repositioned;
        }

        let mut enemies = engagement.sim_enemies.clone();
        enemies.extend_from_slice(&engagement.candidates);
        let request = SimRequest {
            target_position: self.target_position,
            pairing: &cluster.pairing,
            enemies: &enemies,
            detectors: &self.detectors,
            include_retreat: engagement.include_retreat,
            choke: engagement.choke,
        };
        let result = match run_combat_sim(cluster, ctx, &request) {
            Ok(result) => result,
            Err(err) => {
                warn!(squad = %self.label, cluster = cluster.id, frame = ctx.frame, %err, "combat sim unavailable");
                self.reposition(cluster, ctx, engagement.fallback);
                return Evaluation::Repositioned;
            }
        };

        let activity = cluster.activity();
        let decision = policy::decide(
            activity,
            cluster.history_mut(),
            result,
            &self.profile,
            &engagement.context,
        );
        Evaluation::Decided { decision, result }
    }

    /// Move toward `position`. Air patrols route around enemy coverage.
    pub(crate) fn reposition(&self, cluster: &mut UnitCluster, ctx: &mut FrameContext<'_>, position: Position) {
        cluster.set_activity(Activity::Moving, SubActivity::None, ctx.frame);
        match self.mission {
            Mission::AirHarass => micro::safe_move(cluster, ctx, position),
            _ => micro::move_to(cluster, ctx, position),
        }
    }

    /// Attack with the current pairing. Only called right after an engaged verdict.
    pub(crate) fn press_attack(&self, cluster: &mut UnitCluster, ctx: &mut FrameContext<'_>, fallback: Position) {
        cluster.set_activity(Activity::Attacking, SubActivity::None, ctx.frame);
        let cluster = &*cluster;
        micro::attack(cluster, ctx, &cluster.pairing, fallback);
    }

    /// Regroup after the policy declined to fight.
    ///
    /// The sub-activity is chosen on the first regrouping frame and kept until
    /// its own condition fails, at which point the cluster flees.
    pub(crate) fn regroup(
        &self,
        cluster: &mut UnitCluster,
        ctx: &mut FrameContext<'_>,
        result: &CombatSimResult,
        sim_enemies: &[Entity],
        rally: Position,
    ) {
        let ids: BTreeSet<Entity> = sim_enemies.iter().copied().collect();
        let enemies: Vec<EnemyUnit> = ids
            .into_iter()
            .filter_map(|id| units::enemy(ctx.world, id))
            .collect();
        let static_defense: Vec<EnemyUnit> = enemies
            .iter()
            .filter(|e| e.kind.stats().static_defense && e.sighting.completed)
            .copied()
            .collect();

        let current = if cluster.activity() == Activity::Regrouping {
            cluster.sub_activity()
        } else {
            SubActivity::None
        };
        let sub_activity = match current {
            SubActivity::None => {
                if !static_defense.is_empty() && self.static_contain_holds(cluster, ctx, &enemies) {
                    SubActivity::ContainStaticDefense
                } else if policy::should_contain_choke(cluster.regroup_history_mut(), *result) {
                    SubActivity::ContainChoke
                } else if micro::cannot_outrun(cluster, ctx, &enemies) {
                    SubActivity::StandGround
                } else {
                    SubActivity::Flee
                }
            }
            SubActivity::ContainStaticDefense
                if static_defense.is_empty() || !self.static_contain_holds(cluster, ctx, &enemies) =>
            {
                SubActivity::Flee
            }
            SubActivity::ContainChoke if !policy::should_contain_choke(cluster.regroup_history_mut(), *result) => {
                SubActivity::Flee
            }
            SubActivity::StandGround if !micro::cannot_outrun(cluster, ctx, &enemies) => SubActivity::Flee,
            kept => kept,
        };

        cluster.set_activity(Activity::Regrouping, sub_activity, ctx.frame);
        let cluster = &*cluster;
        match sub_activity {
            SubActivity::ContainStaticDefense => {
                micro::contain_static(cluster, ctx, &cluster.pairing, &static_defense);
            }
            SubActivity::ContainChoke => match result.narrow_choke {
                Some(choke) => {
                    let hold_point = micro::our_end(&choke, cluster.center);
                    micro::hold_choke(cluster, ctx, &cluster.pairing, hold_point);
                }
                None => micro::move_to(cluster, ctx, rally),
            },
            SubActivity::StandGround => micro::stand_ground(cluster, ctx, &cluster.pairing),
            SubActivity::Flee | SubActivity::None => micro::move_to(cluster, ctx, rally),
        }
    }

    /// Re-run the simulation without enemy static defense and ask whether
    /// containing it is worthwhile.
    fn static_contain_holds(&self, cluster: &UnitCluster, ctx: &FrameContext<'_>, enemies: &[EnemyUnit]) -> bool {
        let mobile: Vec<Entity> = enemies
            .iter()
            .filter(|e| !e.kind.stats().static_defense)
            .map(|e| e.id)
            .collect();
        let pairing: Vec<Pairing> = cluster
            .pairing
            .iter()
            .map(|pair| Pairing {
                unit: pair.unit,
                target: pair.target.filter(|target| mobile.contains(target)),
            })
            .collect();
        let request = SimRequest {
            target_position: self.target_position,
            pairing: &pairing,
            enemies: &mobile,
            detectors: &self.detectors,
            include_retreat: false,
            choke: None,
        };
        match run_combat_sim(cluster, ctx, &request) {
            Ok(result) => policy::should_contain_static(&result),
            // Only static defense left: staying out of its range is safe
            Err(TacticsError::NothingToSimulate { .. }) => true,
            Err(err) => {
                warn!(squad = %self.label, cluster = cluster.id, %err, "containment sim unavailable");
                false
            }
        }
    }

    /// Whether any of our detectors is close enough to reveal `position`.
    pub(crate) fn detector_covers(&self, world: &World, position: Position, radius: f32) -> bool {
        self.detectors
            .iter()
            .filter_map(|id| units::friendly(world, *id))
            .any(|detector| detector.position.distance(position) <= radius)
    }
}
