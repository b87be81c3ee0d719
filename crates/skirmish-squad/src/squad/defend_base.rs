//! Base defense: hold the base's choke when it has one, otherwise fight in
//! the base, and fall back to the mineral line so workers can help.

use hecs::Entity;
use tracing::{debug, warn};

use skirmish_core::constants::{
    BASE_RADIUS, BLOCKER_WIDTH, CHOKE_SIM_RADIUS, CHOKE_TARGET_RADIUS, DEFENSE_SIGHTING_WINDOW, DETECTION_RADIUS,
};
use skirmish_core::enums::{Activity, SubActivity};
use skirmish_core::types::{BaseId, Choke, Frame};
use skirmish_tactics::policy::{EngagementContext, ForcedReason};

use crate::cluster::{micro, UnitCluster};
use crate::context::FrameContext;
use crate::map::BaseInfo;
use crate::units::{self, EnemyUnit};

use super::{Engagement, Evaluation, Squad};

/// Enemies that matter to this base on the current frame.
#[derive(Debug, Clone, Default)]
struct BaseThreats {
    targets: Vec<Entity>,
    /// Extra enemies near the choke that join the simulation only.
    nearby: Vec<Entity>,
    /// Some threat is inside the base rather than in or beyond the choke.
    enemy_in_base: bool,
    /// Some threat cannot be seen by any of our detectors.
    undetected: bool,
}

fn is_threat(enemy: &EnemyUnit, frame: Frame) -> bool {
    let stats = enemy.kind.stats();
    let recent = stats.building || frame.saturating_sub(enemy.sighting.last_seen) <= DEFENSE_SIGHTING_WINDOW;
    recent && enemy.is_combatant(frame) && enemy.kind.can_attack_ground()
}

fn find_threats(squad: &Squad, ctx: &FrameContext<'_>, base: &BaseInfo) -> BaseThreats {
    let enemies = units::all_enemies(ctx.world);
    let in_base: Vec<&EnemyUnit> = enemies
        .iter()
        .filter(|e| is_threat(e, ctx.frame) && e.position.distance(base.position) <= BASE_RADIUS)
        .collect();

    let mut targets: Vec<Entity> = in_base.iter().map(|e| e.id).collect();
    let mut enemy_in_base = match base.choke.filter(Choke::is_narrow) {
        Some(choke) => {
            let mouth = choke.width.max(choke.length);
            in_base.iter().any(|e| e.position.distance(choke.center) > mouth)
        }
        None => !in_base.is_empty(),
    };

    let mut nearby = Vec::new();
    if let Some(choke) = base.choke {
        for enemy in enemies.iter().filter(|e| is_threat(e, ctx.frame)) {
            let distance = enemy.position.distance(choke.center);
            if distance <= CHOKE_TARGET_RADIUS {
                targets.push(enemy.id);
            } else if distance <= CHOKE_SIM_RADIUS {
                nearby.push(enemy.id);
            }
        }
    }

    // Nothing fighting: still deal with buildings placed in the base
    if targets.is_empty() {
        targets = enemies
            .iter()
            .filter(|e| e.kind.stats().building && !e.flying())
            .filter(|e| e.position.distance(base.position) <= BASE_RADIUS)
            .map(|e| e.id)
            .collect();
        enemy_in_base = !targets.is_empty();
    }

    targets.sort();
    targets.dedup();
    nearby.retain(|id| !targets.contains(id));

    let undetected = base.choke.is_some()
        && enemies
            .iter()
            .filter(|e| targets.contains(&e.id) || nearby.contains(&e.id))
            .any(|e| !e.sighting.detected && !squad.detector_covers(ctx.world, e.position, DETECTION_RADIUS));

    BaseThreats {
        targets,
        nearby,
        enemy_in_base,
        undetected,
    }
}

pub(crate) fn execute(squad: &mut Squad, ctx: &mut FrameContext<'_>, base_id: BaseId) {
    let Some(base) = ctx.map.base(base_id).copied() else {
        warn!(squad = %squad.label, base = base_id.0, "defended base is unknown to the map");
        return;
    };
    squad.target_position = base.choke.map_or(base.mineral_line, |choke| choke.center);

    let threats = find_threats(squad, ctx, &base);
    let in_transit = base
        .choke
        .is_some_and(|choke| units::in_transit(ctx.world, &choke, |unit| squad.contains(unit)));

    let mut clusters = squad.take_clusters();
    for cluster in &mut clusters {
        defend(squad, cluster, ctx, &base, &threats, in_transit);
    }
    squad.restore_clusters(clusters);
}

/// Ground members needed to physically plug a choke of this width.
fn blockers_needed(choke: &Choke) -> usize {
    (choke.width / BLOCKER_WIDTH).ceil().max(1.0) as usize
}

fn defend(
    squad: &Squad,
    cluster: &mut UnitCluster,
    ctx: &mut FrameContext<'_>,
    base: &BaseInfo,
    threats: &BaseThreats,
    in_transit: bool,
) {
    let narrow_choke = base.choke.filter(Choke::is_narrow);
    let hold_point = base.choke.map(|choke| micro::our_end(&choke, base.position));
    let ground_members = cluster.living(ctx.world).iter().filter(|u| !u.flying()).count();
    let choke_blocked = narrow_choke
        .is_some_and(|choke| !threats.enemy_in_base && ground_members >= blockers_needed(&choke));

    let fallback = match hold_point {
        Some(point) if !in_transit => point,
        _ => base.mineral_line,
    };

    let engagement = Engagement {
        candidates: threats.targets.clone(),
        sim_enemies: threats.nearby.clone(),
        reference: squad.target_position,
        fallback,
        context: EngagementContext {
            supply_used: ctx.supply_used,
            percentage_to_enemy_main: cluster.percentage_to_enemy_main,
            undetected_threat: threats.undetected,
            choke_blocked,
            friendly_in_transit: in_transit,
        },
        choke: narrow_choke.filter(|_| !threats.enemy_in_base),
        // Defenders simulate a fight without retreat
        include_retreat: false,
    };

    let decision = match squad.evaluate(cluster, ctx, &engagement) {
        Evaluation::Repositioned => return,
        Evaluation::Decided { decision, .. } => decision,
    };

    if !decision.engage {
        cluster.set_activity(Activity::Regrouping, SubActivity::None, ctx.frame);
        let cluster = &*cluster;
        micro::defend_mineral_line(cluster, ctx, &cluster.pairing, base.mineral_line);
        return;
    }

    cluster.set_activity(Activity::Attacking, SubActivity::None, ctx.frame);
    let cluster = &*cluster;
    let static_defense: Vec<EnemyUnit> = threats
        .targets
        .iter()
        .filter_map(|id| units::enemy(ctx.world, *id))
        .filter(|e| e.kind.stats().static_defense && e.sighting.completed)
        .collect();

    if !static_defense.is_empty() {
        debug!(cluster = cluster.id, count = static_defense.len(), "containing static defense in base");
        micro::contain_static(cluster, ctx, &cluster.pairing, &static_defense);
    } else if let Some(point) =
        hold_point.filter(|_| narrow_choke.is_some() && !threats.enemy_in_base && !threats.undetected)
    {
        // Clear the choke for a friendly unit only when nothing is coming through
        let quiet = threats.targets.is_empty() && threats.nearby.is_empty();
        if quiet && decision.forced == Some(ForcedReason::FriendlyInTransit) {
            debug!(cluster = cluster.id, "stepping aside for a friendly unit in transit");
            micro::attack(cluster, ctx, &cluster.pairing, base.mineral_line);
        } else {
            micro::hold_choke(cluster, ctx, &cluster.pairing, point);
        }
    } else {
        micro::attack(cluster, ctx, &cluster.pairing, squad.target_position);
    }
}
