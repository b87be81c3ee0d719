//! Main army: push toward the target base and fight whatever is in the way.

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
        execute_cluster(squad, cluster, ctx, lead.as_ref());
    }
    squad.restore_clusters(clusters);
}

fn execute_cluster(squad: &Squad, cluster: &mut UnitCluster, ctx: &mut FrameContext<'_>, lead: Option<&Lead>) {
    let radius = cluster.simulation_radius(ctx.config);
    let nearby = units::enemies_within(ctx.world, cluster.center, radius, ctx.frame, &ctx.recency);
    if nearby.is_empty() {
        squad.reposition(cluster, ctx, squad.target_position);
        return;
    }

    let engagement = Engagement {
        candidates: squad.priority_targets(cluster, ctx, Some((cluster.center, radius))),
        sim_enemies: nearby,
        reference: squad.target_position,
        fallback: squad.target_position,
        context: EngagementContext {
            supply_used: ctx.supply_used,
            percentage_to_enemy_main: cluster.percentage_to_enemy_main,
            ..EngagementContext::default()
        },
        choke: None,
        include_retreat: ctx.config.include_retreat,
    };

    let (decision, result) = match squad.evaluate(cluster, ctx, &engagement) {
        Evaluation::Repositioned => return,
        Evaluation::Decided { decision, result } => (decision, result),
    };

    if decision.engage {
        squad.press_attack(cluster, ctx, squad.target_position);
        return;
    }

    if let Some(lead) = lead.filter(|lead| lead.cluster != cluster.id) {
        if should_link_up(cluster, ctx, lead) {
            squad.reposition(cluster, ctx, lead.center);
            return;
        }
    }

    let rally = rally_point(cluster, lead, ctx);
    squad.regroup(cluster, ctx, &result, &engagement.sim_enemies, rally);
}

/// Join the leading cluster when our vanguard has nothing to shoot or is
/// closer to the leaders than to its own target.
fn should_link_up(cluster: &UnitCluster, ctx: &FrameContext<'_>, lead: &Lead) -> bool {
    let Some(vanguard) = cluster.vanguard else {
        return false;
    };
    let target = cluster
        .pairing
        .iter()
        .find(|pair| pair.unit == vanguard)
        .and_then(|pair| pair.target)
        .and_then(|target| units::enemy(ctx.world, target))
        .filter(|target| target.sighting.position_valid);
    match target {
        None => true,
        Some(target) => {
            cluster.vanguard_position.distance(lead.center) < cluster.vanguard_position.distance(target.position)
        }
    }
}
