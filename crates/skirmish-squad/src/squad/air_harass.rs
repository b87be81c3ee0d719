//! Air-to-air patrol.
//!
//! Targets are picked squad-wide from one classification: flyers raiding our
//! bases first, then the least covered enemy combat flyers, then exposed
//! non-combat flyers and cocoons, and finally a single covered target. With
//! nothing to hunt the squad scouts the enemy base seen least recently.

use hecs::Entity;
use tracing::debug;

use skirmish_core::enums::{Activity, SubActivity};
use skirmish_core::types::Position;
use skirmish_tactics::classifier::ThreatBuckets;
use skirmish_tactics::policy::EngagementContext;

use crate::cluster::{micro, UnitCluster};
use crate::context::FrameContext;
use crate::units;

use super::{Engagement, Evaluation, Squad};

/// Combat flyers this close to the most exposed one are hunted together.
const COMBAT_GROUP_RADIUS: f32 = 400.0;

/// The target position is only moved when it shifts at least this far.
const RETARGET_DISTANCE: f32 = 32.0;

#[derive(Debug, Clone, PartialEq)]
struct Hunt {
    targets: Vec<Entity>,
    position: Position,
}

pub(crate) fn execute(squad: &mut Squad, ctx: &mut FrameContext<'_>) {
    let Some(first) = squad.clusters().first() else {
        return;
    };
    let buckets = squad.classify_for(first, ctx, None);
    let hunt = pick_hunt(&buckets, ctx, squad.target_position);

    if squad.target_position.distance(hunt.position) >= RETARGET_DISTANCE {
        debug!(
            squad = %squad.label,
            targets = hunt.targets.len(),
            x = hunt.position.x,
            y = hunt.position.y,
            "air patrol retargeted"
        );
        squad.target_position = hunt.position;
        squad.update_clusters(ctx);
    }

    let mut clusters = squad.take_clusters();
    for cluster in &mut clusters {
        engage(squad, cluster, ctx, &hunt.targets);
    }
    squad.restore_clusters(clusters);
}

fn pick_hunt(buckets: &ThreatBuckets<Entity>, ctx: &FrameContext<'_>, current: Position) -> Hunt {
    let home = ctx.map.my_main().map_or(current, |main| main.position);
    let enemy_home = ctx.map.enemy_main().map_or(home, |main| main.position);

    if let Some(threat) = buckets.base_threats.first() {
        return Hunt {
            targets: threat.enemies.clone(),
            position: threat.position,
        };
    }

    let leader = buckets
        .combat
        .iter()
        .find_map(|id| units::enemy(ctx.world, *id));
    if let Some(leader) = leader {
        let targets = buckets
            .combat
            .iter()
            .copied()
            .filter(|id| {
                *id == leader.id
                    || units::enemy(ctx.world, *id)
                        .is_some_and(|enemy| enemy.position.distance(leader.position) < COMBAT_GROUP_RADIUS)
            })
            .collect();
        return Hunt {
            targets,
            position: leader.position,
        };
    }

    for exposed in [&buckets.vulnerable, &buckets.dormant] {
        if !exposed.is_empty() {
            return Hunt {
                targets: exposed.clone(),
                position: enemy_home,
            };
        }
    }

    if let Some(covered) = buckets.defended.iter().find_map(|id| units::enemy(ctx.world, *id)) {
        return Hunt {
            targets: vec![covered.id],
            position: covered.position,
        };
    }

    let scout = ctx
        .map
        .enemy_bases()
        .iter()
        .min_by_key(|base| (base.last_scouted, base.id))
        .map_or(home, |base| base.position);
    Hunt {
        targets: Vec::new(),
        position: scout,
    }
}

fn engage(squad: &Squad, cluster: &mut UnitCluster, ctx: &mut FrameContext<'_>, targets: &[Entity]) {
    let radius = cluster.simulation_radius(ctx.config);
    let engagement = Engagement {
        candidates: targets.to_vec(),
        sim_enemies: units::enemies_within(ctx.world, cluster.center, radius, ctx.frame, &ctx.recency),
        reference: cluster.center,
        fallback: squad.target_position,
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
            squad.press_attack(cluster, ctx, squad.target_position);
        }
        Evaluation::Decided { .. } => {
            // Threat-aware movement keeps the patrol out of anti-air while it waits
            cluster.set_activity(Activity::Regrouping, SubActivity::None, ctx.frame);
            micro::safe_move(cluster, ctx, squad.target_position);
        }
    }
}
