//! Reference combat simulator.
//!
//! A small stepwise attrition model: every step each armed unit closes on
//! its target and deals its weapon's damage rate once in range. Damage from
//! both sides is applied simultaneously. Good enough to drive the decision
//! layer in tests and replays; the real game client plugs in its own
//! simulator through `CombatSimulator`.

use hecs::Entity;

use skirmish_core::constants::{SIM_FRAMES, SIM_STEP_FRAMES};
use skirmish_core::enums::WeaponDomain;
use skirmish_core::error::Result;
use skirmish_core::result::CombatSimResult;
use skirmish_core::types::{step_toward, Position};
use skirmish_core::unit_kinds::UnitKind;

use crate::gateway::{CombatSimulator, SimSnapshot, SimUnit};

/// Deterministic attrition simulator.
#[derive(Debug, Clone, Copy)]
pub struct AttritionSimulator {
    pub frames: u32,
    pub step: u32,
}

impl Default for AttritionSimulator {
    fn default() -> Self {
        Self {
            frames: SIM_FRAMES,
            step: SIM_STEP_FRAMES,
        }
    }
}

#[derive(Debug, Clone)]
struct Fighter {
    id: Entity,
    kind: UnitKind,
    position: Position,
    hp: f32,
    shields: f32,
    target: Option<Entity>,
    detected: bool,
    passive: bool,
    /// Frames until the first shot.
    delay: u32,
}

impl Fighter {
    fn from_sim(unit: &SimUnit) -> Self {
        Self {
            id: unit.id,
            kind: unit.kind,
            position: unit.position,
            hp: unit.hp.max(0) as f32,
            shields: unit.shields.max(0) as f32,
            target: unit.target,
            detected: unit.detected,
            passive: unit.passive,
            delay: unit.cooldown_remaining,
        }
    }

    fn alive(&self) -> bool {
        self.hp > 0.0
    }

    fn flying(&self) -> bool {
        self.kind.stats().flying
    }

    fn value(&self) -> i32 {
        if !self.alive() {
            return 0;
        }
        self.kind
            .combat_value(self.hp.ceil() as i32, self.shields.ceil() as i32)
    }

    fn take(&mut self, damage: f32) {
        let absorbed = damage.min(self.shields);
        self.shields -= absorbed;
        self.hp -= damage - absorbed;
    }
}

fn total_value(side: &[Fighter]) -> i32 {
    side.iter().map(Fighter::value).sum()
}

fn sorted(units: &[SimUnit]) -> Vec<Fighter> {
    let mut fighters: Vec<Fighter> = units.iter().map(Fighter::from_sim).collect();
    fighters.sort_by_key(|f| f.id);
    fighters
}

/// Index of the enemy `attacker` shoots this step.
fn pick_target(attacker: &Fighter, foes: &[Fighter], require_detected: bool) -> Option<usize> {
    let valid = |foe: &Fighter| {
        foe.alive() && (!require_detected || foe.detected) && attacker.kind.can_attack(foe.flying())
    };
    if let Some(assigned) = attacker.target {
        if let Some(index) = foes.iter().position(|f| f.id == assigned && valid(f)) {
            return Some(index);
        }
    }
    foes.iter()
        .enumerate()
        .filter(|(_, foe)| valid(*foe))
        .min_by(|(_, a), (_, b)| {
            a.position
                .distance(attacker.position)
                .total_cmp(&b.position.distance(attacker.position))
                .then(a.id.cmp(&b.id))
        })
        .map(|(index, _)| index)
}

/// Closest living foe to `position`.
fn nearest_foe(position: Position, foes: &[Fighter]) -> Option<Position> {
    foes.iter()
        .filter(|foe| foe.alive())
        .min_by(|a, b| {
            a.position
                .distance(position)
                .total_cmp(&b.position.distance(position))
                .then(a.id.cmp(&b.id))
        })
        .map(|foe| foe.position)
}

/// Advance one side's attackers by one step and return the damage dealt to
/// each foe. With `retreat_untargeted`, attackers without an assigned target
/// back away from the closest foe instead of fighting.
fn step_side(
    attackers: &mut [Fighter],
    foes: &[Fighter],
    step: u32,
    elapsed: u32,
    require_detected: bool,
    retreat_untargeted: bool,
) -> Vec<f32> {
    let mut damage = vec![0.0; foes.len()];
    for attacker in attackers.iter_mut() {
        if !attacker.alive() || attacker.passive {
            continue;
        }
        let stats = attacker.kind.stats();
        let travel = stats.speed * step as f32;

        if retreat_untargeted && attacker.target.is_none() {
            if let Some(threat) = nearest_foe(attacker.position, foes) {
                attacker.position = step_toward(attacker.position, threat, -travel);
            }
            continue;
        }
        let Some(index) = pick_target(attacker, foes, require_detected) else {
            continue;
        };
        let foe = &foes[index];
        let range = attacker.kind.range_against(foe.flying());
        let distance = attacker.position.distance(foe.position);
        if distance > range {
            let advance = travel.min(distance - range);
            attacker.position = step_toward(attacker.position, foe.position, advance);
            continue;
        }
        if elapsed < attacker.delay {
            continue;
        }
        let per_shot = attacker.kind.damage_in(WeaponDomain::against(foe.flying()));
        damage[index] += per_shot as f32 * step as f32 / stats.cooldown.max(1) as f32;
    }
    damage
}

impl CombatSimulator for AttritionSimulator {
    fn simulate(&self, snapshot: &SimSnapshot) -> Result<CombatSimResult> {
        let mut mine = sorted(&snapshot.friendly);
        let mut theirs = sorted(&snapshot.enemy);

        let initial_mine = total_value(&mine);
        let initial_enemy = total_value(&theirs);
        let step = self.step.max(1);

        let mut elapsed = 0;
        while elapsed < self.frames {
            let to_theirs = step_side(&mut mine, &theirs, step, elapsed, true, snapshot.include_retreat);
            let to_mine = step_side(&mut theirs, &mine, step, elapsed, false, false);

            for (unit, damage) in theirs.iter_mut().zip(to_theirs) {
                unit.take(damage);
            }
            for (unit, damage) in mine.iter_mut().zip(to_mine) {
                unit.take(damage);
            }
            elapsed += step;

            let mine_fights = mine.iter().any(|f| f.alive() && !f.passive);
            let theirs_fights = theirs.iter().any(|f| f.alive() && !f.passive);
            if !mine_fights && !theirs_fights {
                break;
            }
        }

        Ok(CombatSimResult {
            frame: snapshot.frame,
            my_unit_count: snapshot.friendly.len() as u32,
            enemy_unit_count: snapshot.enemy.len() as u32,
            initial_mine,
            initial_enemy,
            final_mine: total_value(&mine),
            final_enemy: total_value(&theirs),
            enemy_has_undetected_units: snapshot.enemy.iter().any(|unit| !unit.detected),
            narrow_choke: snapshot.narrow_choke,
            aggression: 1.0,
            distance_factor: 1.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use hecs::World;

    fn unit(world: &mut World, kind: UnitKind, x: f32) -> SimUnit {
        let stats = kind.stats();
        SimUnit {
            id: world.spawn(()),
            kind,
            position: Vec2::new(x, 0.0),
            hp: stats.max_hp,
            shields: stats.max_shields,
            cooldown_remaining: 0,
            target: None,
            detected: true,
            passive: false,
        }
    }

    fn snapshot(friendly: Vec<SimUnit>, enemy: Vec<SimUnit>) -> SimSnapshot {
        SimSnapshot {
            frame: 10,
            target_position: Vec2::ZERO,
            friendly,
            enemy,
            detectors: Vec::new(),
            include_retreat: false,
            narrow_choke: None,
        }
    }

    #[test]
    fn test_overwhelming_force_loses_little() {
        let mut world = World::new();
        let friendly = (0..6).map(|_| unit(&mut world, UnitKind::Dragoon, 0.0)).collect();
        let enemy = vec![unit(&mut world, UnitKind::Zergling, 150.0)];
        let result = AttritionSimulator::default()
            .simulate(&snapshot(friendly, enemy))
            .unwrap();
        assert_eq!(result.final_enemy, 0);
        assert!(result.my_percent_lost() < 0.05);
        assert_eq!(result.my_unit_count, 6);
        assert_eq!(result.enemy_unit_count, 1);
    }

    #[test]
    fn test_passive_enemies_deal_no_damage() {
        let mut world = World::new();
        let friendly = vec![unit(&mut world, UnitKind::Zealot, 0.0)];
        let mut worker = unit(&mut world, UnitKind::Drone, 20.0);
        worker.passive = true;
        let result = AttritionSimulator::default()
            .simulate(&snapshot(friendly, vec![worker]))
            .unwrap();
        assert_eq!(result.my_percent_lost(), 0.0);
        assert!(result.enemy_percent_lost() > 0.0);
    }

    #[test]
    fn test_undetected_enemies_cannot_be_shot() {
        let mut world = World::new();
        let friendly = vec![unit(&mut world, UnitKind::Dragoon, 0.0)];
        let mut lurker = unit(&mut world, UnitKind::Lurker, 100.0);
        lurker.detected = false;
        let result = AttritionSimulator::default()
            .simulate(&snapshot(friendly, vec![lurker]))
            .unwrap();
        assert!(result.enemy_has_undetected_units);
        assert_eq!(result.final_enemy, result.initial_enemy);
        assert!(result.final_mine < result.initial_mine);
    }

    #[test]
    fn test_untargeted_units_back_away_from_enemy() {
        let mut world = World::new();
        let mut mine = vec![Fighter::from_sim(&unit(&mut world, UnitKind::Zealot, 0.0))];
        let theirs = vec![Fighter::from_sim(&unit(&mut world, UnitKind::Hydralisk, 100.0))];

        let damage = step_side(&mut mine, &theirs, 8, 0, true, true);
        assert_eq!(damage, vec![0.0]);
        assert!(mine[0].position.x < 0.0, "moved to {:?}", mine[0].position);

        // Paired units still close in
        let target = theirs[0].id;
        mine[0].position = Vec2::ZERO;
        mine[0].target = Some(target);
        step_side(&mut mine, &theirs, 8, 0, true, true);
        assert!(mine[0].position.x > 0.0);
    }

    #[test]
    fn test_identical_snapshots_give_identical_results() {
        let mut world = World::new();
        let friendly: Vec<SimUnit> = (0..3)
            .map(|i| unit(&mut world, UnitKind::Zealot, i as f32 * 10.0))
            .collect();
        let enemy: Vec<SimUnit> = (0..4)
            .map(|i| unit(&mut world, UnitKind::Hydralisk, 200.0 + i as f32 * 10.0))
            .collect();
        let snap = snapshot(friendly, enemy);
        let sim = AttritionSimulator::default();
        assert_eq!(sim.simulate(&snap).unwrap(), sim.simulate(&snap).unwrap());
    }
}
