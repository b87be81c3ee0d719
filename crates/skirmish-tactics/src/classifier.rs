//! Threat and target classification.
//!
//! Sorts the visible enemy set into decision buckets in priority order:
//! base threats, combat targets, vulnerable non-combat targets, dormant
//! cocoons, and non-combat targets under defensive coverage. Stale sightings
//! are dropped first according to the recency policy.

use serde::{Deserialize, Serialize};

use skirmish_core::components::Sighting;
use skirmish_core::constants::{BASE_RADIUS, WORKER_AGGRESSION_WINDOW};
use skirmish_core::enums::TargetBucket;
use skirmish_core::types::{BaseId, Frame, Position};
use skirmish_core::unit_kinds::UnitKind;

use crate::config::TacticsConfig;

/// Hostile coverage lookup, maintained outside the tactical layer.
pub trait ThreatGrid {
    /// Enemy firepower covering ground units at `pos` (0 = uncovered).
    fn ground_threat(&self, pos: Position) -> i32;

    /// Enemy firepower covering air units at `pos` (0 = uncovered).
    fn air_threat(&self, pos: Position) -> i32;

    fn threat_against(&self, pos: Position, flying: bool) -> i32 {
        if flying {
            self.air_threat(pos)
        } else {
            self.ground_threat(pos)
        }
    }
}

/// A grid with no coverage anywhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenGrid;

impl ThreatGrid for OpenGrid {
    fn ground_threat(&self, _pos: Position) -> i32 {
        0
    }

    fn air_threat(&self, _pos: Position) -> i32 {
        0
    }
}

/// How long a sighting stays trustworthy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecencyPolicy {
    pub default_window: Frame,
    pub slow_flyer_window: Frame,
    pub invalid_position_window: Frame,
}

impl Default for RecencyPolicy {
    fn default() -> Self {
        Self::from_config(&TacticsConfig::default())
    }
}

impl RecencyPolicy {
    pub fn from_config(config: &TacticsConfig) -> Self {
        Self {
            default_window: config.recency_default,
            slow_flyer_window: config.recency_slow_flyer,
            invalid_position_window: config.recency_invalid_position,
        }
    }

    /// Window for a sighting, or `None` when it never goes stale.
    pub fn window(&self, kind: UnitKind, sighting: &Sighting) -> Option<Frame> {
        if !sighting.position_valid {
            return Some(self.invalid_position_window);
        }
        let stats = kind.stats();
        if stats.building {
            return None;
        }
        if stats.slow_flyer {
            return Some(self.slow_flyer_window);
        }
        Some(self.default_window)
    }

    pub fn is_fresh(&self, kind: UnitKind, sighting: &Sighting, frame: Frame) -> bool {
        match self.window(kind, sighting) {
            None => true,
            Some(window) => frame.saturating_sub(sighting.last_seen) <= window,
        }
    }
}

/// What the classifier needs to know about one enemy.
#[derive(Debug, Clone, Copy)]
pub struct EnemyView<Id> {
    pub id: Id,
    pub kind: UnitKind,
    pub position: Position,
    pub sighting: Sighting,
}

/// One of our bases.
#[derive(Debug, Clone, Copy)]
pub struct BaseView {
    pub id: BaseId,
    pub position: Position,
    /// Remaining minerals; richer bases are defended first.
    pub minerals: i32,
}

/// Enemies threatening one base.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseThreat<Id> {
    pub base: BaseId,
    pub position: Position,
    pub enemies: Vec<Id>,
}

/// Classifier input for one cluster.
#[derive(Debug, Clone, Copy)]
pub struct ClassifyRequest<'a, Id> {
    pub frame: Frame,
    pub enemies: &'a [EnemyView<Id>],
    pub bases: &'a [BaseView],
    /// The cluster can shoot ground targets.
    pub hits_ground: bool,
    /// The cluster can shoot air targets.
    pub hits_air: bool,
    /// The cluster's units fly.
    pub cluster_flying: bool,
    /// Response area as center and radius; `None` means the whole map.
    pub area: Option<(Position, f32)>,
}

/// Classified enemies, each list ordered for targeting.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreatBuckets<Id> {
    /// Richest base first.
    pub base_threats: Vec<BaseThreat<Id>>,
    /// Least covered first.
    pub combat: Vec<Id>,
    pub vulnerable: Vec<Id>,
    pub dormant: Vec<Id>,
    /// Weakest coverage first.
    pub defended: Vec<Id>,
}

impl<Id> Default for ThreatBuckets<Id> {
    fn default() -> Self {
        Self {
            base_threats: Vec::new(),
            combat: Vec::new(),
            vulnerable: Vec::new(),
            dormant: Vec::new(),
            defended: Vec::new(),
        }
    }
}

impl<Id: Copy> ThreatBuckets<Id> {
    /// The most urgent non-empty bucket and its enemies.
    pub fn highest_priority(&self) -> Option<(TargetBucket, Vec<Id>)> {
        if let Some(threat) = self.base_threats.first() {
            return Some((TargetBucket::BaseThreat, threat.enemies.clone()));
        }
        [
            (TargetBucket::Combat, &self.combat),
            (TargetBucket::Vulnerable, &self.vulnerable),
            (TargetBucket::Dormant, &self.dormant),
            (TargetBucket::Defended, &self.defended),
        ]
        .into_iter()
        .find(|(_, ids)| !ids.is_empty())
        .map(|(bucket, ids)| (bucket, ids.clone()))
    }

    pub fn is_empty(&self) -> bool {
        self.base_threats.is_empty()
            && self.combat.is_empty()
            && self.vulnerable.is_empty()
            && self.dormant.is_empty()
            && self.defended.is_empty()
    }
}

/// Whether an enemy can currently hurt units in the given domain.
///
/// Workers only count once they have been seen attacking recently.
pub fn fights_back(kind: UnitKind, sighting: &Sighting, frame: Frame, against_flying: bool) -> bool {
    if !kind.can_attack(against_flying) {
        return false;
    }
    if kind.stats().worker {
        return sighting
            .last_seen_attacking
            .is_some_and(|seen| frame.saturating_sub(seen) <= WORKER_AGGRESSION_WINDOW);
    }
    sighting.completed || !kind.stats().building
}

/// Partition the visible enemy set into decision buckets.
pub fn classify<Id: Copy + Ord>(
    request: &ClassifyRequest<'_, Id>,
    recency: &RecencyPolicy,
    grid: &dyn ThreatGrid,
) -> ThreatBuckets<Id> {
    let mut buckets = ThreatBuckets::default();
    let mut base_threats: Vec<(BaseView, Vec<Id>)> = Vec::new();
    let mut combat: Vec<(i32, Id)> = Vec::new();
    let mut defended: Vec<(i32, Id)> = Vec::new();

    for enemy in request.enemies {
        if !recency.is_fresh(enemy.kind, &enemy.sighting, request.frame) {
            continue;
        }
        if let Some((center, radius)) = request.area {
            if enemy.position.distance(center) > radius {
                continue;
            }
        }
        let flying = enemy.kind.stats().flying;
        let hittable = if flying { request.hits_air } else { request.hits_ground };
        if !hittable {
            continue;
        }

        if fights_back(enemy.kind, &enemy.sighting, request.frame, false) {
            if let Some(base) = threatened_base(request.bases, enemy.position) {
                match base_threats.iter_mut().find(|(b, _)| b.id == base.id) {
                    Some((_, ids)) => ids.push(enemy.id),
                    None => base_threats.push((*base, vec![enemy.id])),
                }
                continue;
            }
        }

        if fights_back(enemy.kind, &enemy.sighting, request.frame, request.cluster_flying) {
            combat.push((grid.threat_against(enemy.position, request.cluster_flying), enemy.id));
            continue;
        }

        let coverage = grid.threat_against(enemy.position, request.cluster_flying);
        if enemy.kind.stats().dormant && coverage <= 0 {
            buckets.dormant.push(enemy.id);
            continue;
        }

        if coverage <= 0 {
            buckets.vulnerable.push(enemy.id);
        } else {
            defended.push((coverage, enemy.id));
        }
    }

    base_threats.sort_by(|(a, _), (b, _)| b.minerals.cmp(&a.minerals).then(a.id.cmp(&b.id)));
    buckets.base_threats = base_threats
        .into_iter()
        .map(|(base, mut enemies)| {
            enemies.sort();
            BaseThreat {
                base: base.id,
                position: base.position,
                enemies,
            }
        })
        .collect();

    combat.sort();
    buckets.combat = combat.into_iter().map(|(_, id)| id).collect();
    defended.sort();
    buckets.defended = defended.into_iter().map(|(_, id)| id).collect();
    buckets.vulnerable.sort();
    buckets.dormant.sort();
    buckets
}

fn threatened_base(bases: &[BaseView], position: Position) -> Option<&BaseView> {
    bases
        .iter()
        .filter(|base| base.position.distance(position) <= BASE_RADIUS)
        .min_by(|a, b| {
            a.position
                .distance(position)
                .total_cmp(&b.position.distance(position))
                .then(a.id.cmp(&b.id))
        })
}
