//! Where a retreating cluster falls back to.

use skirmish_core::types::Position;

use crate::cluster::UnitCluster;
use crate::context::FrameContext;
use crate::units;

/// Frame-start snapshot of the squad's leading cluster.
#[derive(Debug, Clone, Copy)]
pub struct Lead {
    pub cluster: u32,
    pub center: Position,
    /// The cluster carries a unit strong enough to rally around.
    pub anchored: bool,
}

impl Lead {
    pub fn of(cluster: &UnitCluster, ctx: &FrameContext<'_>) -> Self {
        Self {
            cluster: cluster.id,
            center: cluster.center,
            anchored: cluster.has_anchor(ctx.world),
        }
    }
}

/// Pick the rally point for a cluster that is falling back.
///
/// Preference order: the leading cluster when it carries an anchor unit, our
/// nearest powered static defense, our main, and finally the cluster's own
/// center.
pub fn rally_point(cluster: &UnitCluster, lead: Option<&Lead>, ctx: &FrameContext<'_>) -> Position {
    if let Some(lead) = lead.filter(|lead| lead.cluster != cluster.id && lead.anchored) {
        return lead.center;
    }

    let nearest_defense = units::powered_static_defense(ctx.world)
        .into_iter()
        .min_by(|(a_id, a), (b_id, b)| {
            a.distance(cluster.center)
                .total_cmp(&b.distance(cluster.center))
                .then(a_id.cmp(b_id))
        });
    if let Some((_, position)) = nearest_defense {
        return position;
    }

    ctx.map
        .my_main()
        .map(|main| main.position)
        .unwrap_or(cluster.center)
}
