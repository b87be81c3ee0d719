//! Late-game cleanup: fight what is near, otherwise hunt remaining buildings.

use tracing::debug;

use skirmish_core::constants::{BASE_RADIUS, MOP_UP_ENGAGE_RADIUS};
use skirmish_core::types::Position;
use skirmish_tactics::policy::EngagementContext;

use crate::cluster::UnitCluster;
use crate::context::FrameContext;
use crate::units;

use super::rally::{rally_point, Lead};
use super::{lead_cluster, Engagement, Evaluation, Squad};

pub(crate) fn execute(squad: &mut Squad, ctx: &mut FrameContext<'_>) {
    let mut clusters = squad.take_clusters();
    let lead = lead_cluster(&clusters).map(|cluster| Lead::of(cluster, ctx));
    for cluster in &mut clusters {
        sweep(squad, cluster, ctx, lead.as_ref());
    }
    squad.restore_clusters(clusters);
}

fn sweep(squad: &Squad, cluster: &mut UnitCluster, ctx: &mut FrameContext<'_>, lead: Option<&Lead>) {
    let hunt = hunting_ground(ctx, cluster.center);
    let nearby = units::enemies_within(ctx.world, cluster.center, MOP_UP_ENGAGE_RADIUS, ctx.frame, &ctx.recency);
    let candidates = if nearby.is_empty() {
        Vec::new()
    } else {
        squad.priority_targets(cluster, ctx, Some((cluster.center, MOP_UP_ENGAGE_RADIUS)))
    };

    if candidates.is_empty() {
        match hunt {
            Some(position) => squad.reposition(cluster, ctx, position),
            None => {
                debug!(squad = %squad.label, cluster = cluster.id, "nothing left to hunt, rallying");
                let rally = rally_point(cluster, lead, ctx);
                squad.reposition(cluster, ctx, rally);
            }
        }
        return;
    }

    let engagement = Engagement {
        candidates,
        sim_enemies: nearby,
        reference: cluster.center,
        fallback: hunt.unwrap_or(cluster.center),
        context: EngagementContext {
            supply_used: ctx.supply_used,
            percentage_to_enemy_main: cluster.percentage_to_enemy_main,
            ..EngagementContext::default()
        },
        choke: None,
        include_retreat: ctx.config.include_retreat,
    };

    match squad.evaluate(cluster, ctx, &engagement) {
        Evaluation::Repositioned => {}
        Evaluation::Decided { decision, .. } if decision.engage => {
            let center = cluster.center;
            squad.press_attack(cluster, ctx, center);
        }
        Evaluation::Decided { result, .. } => {
            let rally = rally_point(cluster, lead, ctx);
            squad.regroup(cluster, ctx, &result, &engagement.sim_enemies, rally);
        }
    }
}

/// Where to look for what is left of the enemy.
///
/// The closest known enemy building wins, snapped to a base location next to
/// it when there is one. Without known buildings, the untaken expansion
/// scouted least recently.
fn hunting_ground(ctx: &FrameContext<'_>, from: Position) -> Option<Position> {
    let closest_building = units::all_enemies(ctx.world)
        .into_iter()
        .filter(|e| e.kind.stats().building && e.sighting.position_valid)
        .min_by(|a, b| {
            a.position
                .distance(from)
                .total_cmp(&b.position.distance(from))
                .then(a.id.cmp(&b.id))
        });

    if let Some(building) = closest_building {
        let base = ctx
            .map
            .enemy_bases()
            .iter()
            .chain(ctx.map.untaken_expansions())
            .filter(|base| base.position.distance(building.position) <= BASE_RADIUS)
            .min_by(|a, b| {
                a.position
                    .distance(building.position)
                    .total_cmp(&b.position.distance(building.position))
                    .then(a.id.cmp(&b.id))
            });
        return Some(base.map_or(building.position, |base| base.position));
    }

    ctx.map
        .untaken_expansions()
        .iter()
        .min_by_key(|base| (base.last_scouted, base.id))
        .map(|base| base.position)
}
