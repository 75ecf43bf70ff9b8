//! Combat pass: beam weapons, missiles, point defense.
//!
//! Beam damage and shield regen are continuous per-tick fractions of the
//! per-day rate. Missiles are first-class tick entities carried on
//! `GameState.events`-adjacent transient state (here: a `Vec<Missile>` owned
//! by the combat module and threaded through the tick by the caller).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::content::GameContent;
use crate::id::Id;
use crate::intercept::compute_intercept_aim;
use crate::order_exec::spawn_wreck_for_destroyed_ship;
use crate::orders::Order;
use crate::state::{EventLevel, GameState};
use crate::vec2::Vec2;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Missile {
    pub launcher_faction_id: Id,
    pub target_ship_id: Id,
    pub position_mkm: Vec2,
    pub velocity_mkm_per_day: Vec2,
    pub damage: f64,
    pub range_remaining_mkm: f64,
    pub system_id: Id,
}

/// Threaded across ticks alongside `GameState` — missiles are transient
/// flight entities, not persisted to saves.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CombatState {
    pub missiles: Vec<Missile>,
}

fn opposing_pairs_in_system(state: &GameState, system_id: Id) -> Vec<(Id, Id)> {
    let ships_here: Vec<Id> = state
        .systems
        .get(&system_id)
        .map(|s| s.ships.clone())
        .unwrap_or_default();
    let mut pairs = Vec::new();
    for (i, &a) in ships_here.iter().enumerate() {
        for &b in &ships_here[i + 1..] {
            let (Some(sa), Some(sb)) = (state.ships.get(&a), state.ships.get(&b)) else {
                continue;
            };
            if sa.faction_id != sb.faction_id {
                pairs.push((a, b));
            }
        }
    }
    pairs
}

/// Runs beam, missile-launch, missile-flight, and point-defense sub-passes
/// for every system, ascending by id. Destroyed ships are removed and leave
/// a `Wreck` behind.
pub fn run_combat_tick(state: &mut GameState, content: &GameContent, combat: &mut CombatState, hours: f64, scrap_recovery_rate: f64) {
    let system_ids: Vec<Id> = state.systems.keys().copied().collect();

    for system_id in system_ids {
        for (a, b) in opposing_pairs_in_system(state, system_id) {
            beam_exchange(state, content, a, b, hours);
            beam_exchange(state, content, b, a, hours);
            maybe_launch_missile(state, content, combat, a, b, hours);
            maybe_launch_missile(state, content, combat, b, a, hours);
        }
        regen_shields(state, content, system_id, hours);
    }

    advance_missiles(state, content, combat, hours);
    point_defense_pass(state, content, combat, hours);

    cull_destroyed_ships(state, content, scrap_recovery_rate);
}

fn design_stats<'a>(state: &'a GameState, content: &'a GameContent, design_id: &crate::content::ShipDesignId) -> Option<&'a crate::content::DesignStats> {
    content
        .designs
        .get(design_id)
        .map(|d| &d.stats)
        .or_else(|| state.custom_designs.get(design_id).map(|d| &d.stats))
}

fn beam_exchange(state: &mut GameState, content: &GameContent, attacker: Id, defender: Id, hours: f64) {
    let (Some(a), Some(d)) = (state.ships.get(&attacker), state.ships.get(&defender)) else {
        return;
    };
    let separation = a.position_mkm.distance(d.position_mkm);
    let design_id = a.design_id.clone();
    let Some(stats) = design_stats(state, content, &design_id) else {
        return;
    };
    if stats.weapon_range_mkm < separation || stats.weapon_damage <= 0.0 {
        return;
    }
    let damage = stats.weapon_damage * (hours / 24.0);
    apply_damage(state, defender, damage);
}

fn apply_damage(state: &mut GameState, target: Id, damage: f64) {
    let Some(ship) = state.ships.get_mut(&target) else {
        return;
    };
    let absorbed = damage.min(ship.shields);
    ship.shields -= absorbed;
    let remainder = damage - absorbed;
    ship.hp -= remainder;
}

fn regen_shields(state: &mut GameState, content: &GameContent, system_id: Id, hours: f64) {
    let ship_ids: Vec<Id> = state.systems.get(&system_id).map(|s| s.ships.clone()).unwrap_or_default();
    for id in ship_ids {
        let Some(ship) = state.ships.get(&id) else { continue };
        let design_id = ship.design_id.clone();
        let Some(stats) = design_stats(state, content, &design_id) else { continue };
        let max_shields = stats.max_shields;
        let regen = stats.shield_regen_per_day * (hours / 24.0);
        if let Some(ship) = state.ships.get_mut(&id) {
            ship.shields = (ship.shields + regen).min(max_shields);
        }
    }
}

fn maybe_launch_missile(state: &mut GameState, content: &GameContent, combat: &mut CombatState, attacker: Id, defender: Id, hours: f64) {
    let (Some(a), Some(d)) = (state.ships.get(&attacker), state.ships.get(&defender)) else {
        return;
    };
    let design_id = a.design_id.clone();
    let Some(stats) = design_stats(state, content, &design_id) else {
        return;
    };
    if stats.missile_rack_count == 0 || stats.missile_damage <= 0.0 {
        return;
    }
    let reload_days = stats.missile_reload_days.max(0.0);
    let ship = state.ships.get_mut(&attacker).unwrap();
    if ship.missile_reload_remaining_days.len() < stats.missile_rack_count as usize {
        ship.missile_reload_remaining_days.resize(stats.missile_rack_count as usize, 0.0);
    }
    let dt_days = hours / 24.0;
    // Each rack fires once per elapsed reload interval, not just once per
    // call: a call spanning several reload periods (short racks ticked at
    // multi-hour granularity) fires that many missiles from the rack.
    let mut launches = 0u32;
    for clock in ship.missile_reload_remaining_days.iter_mut() {
        let mut remaining = *clock - dt_days;
        while remaining <= 0.0 {
            launches += 1;
            if reload_days <= 0.0 {
                remaining = 0.0;
                break;
            }
            remaining += reload_days;
        }
        *clock = remaining.max(0.0);
    }
    if launches == 0 {
        return;
    }

    let launch_pos = ship.position_mkm;
    let launcher_faction_id = a.faction_id;
    let target_system_id = a.system_id;
    let target_pos = d.position_mkm;
    let target_vel = Vec2::ZERO;
    let aim = compute_intercept_aim(launch_pos, stats.missile_speed_mkm_per_day, target_pos, target_vel, 0.0, 30.0);
    let direction = if aim.has_solution {
        aim.aim_position.sub(launch_pos).normalize()
    } else {
        target_pos.sub(launch_pos).normalize()
    };
    for _ in 0..launches {
        combat.missiles.push(Missile {
            launcher_faction_id,
            target_ship_id: defender,
            position_mkm: launch_pos,
            velocity_mkm_per_day: direction.scale(stats.missile_speed_mkm_per_day),
            damage: stats.missile_damage,
            range_remaining_mkm: stats.missile_range_mkm,
            system_id: target_system_id,
        });
    }
}

const MISSILE_ARRIVAL_EPS_MKM: f64 = 0.25;

fn advance_missiles(state: &mut GameState, _content: &GameContent, combat: &mut CombatState, hours: f64) {
    let dt_days = hours / 24.0;
    let mut still_flying = Vec::new();
    let mut impacts: HashMap<Id, f64> = HashMap::new();

    for mut missile in std::mem::take(&mut combat.missiles) {
        let Some(target) = state.ships.get(&missile.target_ship_id) else {
            continue;
        };
        let step = missile.velocity_mkm_per_day.scale(dt_days);
        missile.position_mkm = missile.position_mkm.add(step);
        missile.range_remaining_mkm -= step.length();

        if missile.position_mkm.distance(target.position_mkm) <= MISSILE_ARRIVAL_EPS_MKM {
            *impacts.entry(missile.target_ship_id).or_insert(0.0) += missile.damage;
            continue;
        }
        if missile.range_remaining_mkm <= 0.0 {
            continue;
        }
        still_flying.push(missile);
    }
    combat.missiles = still_flying;

    for (target, damage) in impacts {
        apply_damage(state, target, damage);
    }
}

fn point_defense_pass(state: &mut GameState, content: &GameContent, combat: &mut CombatState, hours: f64) {
    let dt_days = hours / 24.0;
    let mut destroyed_indices: Vec<usize> = Vec::new();

    for (faction_id, ship) in state.ships.iter().map(|(_, s)| (s.faction_id, s)) {
        let design_id = ship.design_id.clone();
        let Some(stats) = design_stats(state, content, &design_id) else { continue };
        if stats.point_defense_damage <= 0.0 {
            continue;
        }
        let shots = (stats.point_defense_damage * dt_days).max(0.0);
        for (idx, missile) in combat.missiles.iter().enumerate() {
            if missile.launcher_faction_id == faction_id {
                continue;
            }
            if ship.position_mkm.distance(missile.position_mkm) > stats.point_defense_range_mkm {
                continue;
            }
            if shots > 0.0 && !destroyed_indices.contains(&idx) {
                destroyed_indices.push(idx);
            }
        }
    }
    destroyed_indices.sort_unstable();
    destroyed_indices.dedup();
    for idx in destroyed_indices.into_iter().rev() {
        combat.missiles.remove(idx);
    }
}

fn cull_destroyed_ships(state: &mut GameState, content: &GameContent, scrap_recovery_rate: f64) {
    let destroyed: Vec<Id> = state.ships.iter().filter(|(_, s)| s.hp <= 0.0).map(|(&id, _)| id).collect();
    for id in destroyed {
        let system_id = state.ships.get(&id).map(|s| s.system_id);
        spawn_wreck_for_destroyed_ship(state, content, id, scrap_recovery_rate);
        if let Some(system_id) = system_id {
            if let Some(sys) = state.systems.get_mut(&system_id) {
                sys.ships.retain(|&s| s != id);
            }
        }
        for fleet in state.fleets.values_mut() {
            fleet.ship_ids.remove(&id);
            if fleet.leader_ship_id == Some(id) {
                fleet.leader_ship_id = None;
            }
        }
        state.emit(EventLevel::Info, "combat", format!("Ship {id} destroyed"));
    }
}

/// Ships with an `AttackShip` order head pursue their target using the
/// intercept solver, falling back to the faction's last-known position if
/// direct sensor contact is lost.
pub fn pursue_attack_targets(state: &mut GameState, content: &GameContent, hours: f64) {
    let ship_ids: Vec<Id> = state.ships.keys().copied().collect();
    for ship_id in ship_ids {
        let Some(Order::AttackShip { ship_id: target_id }) = state.ship_orders.get(&ship_id).and_then(|o| o.queue.front()).cloned() else {
            continue;
        };
        let target_pos = state
            .ships
            .get(&target_id)
            .map(|t| t.position_mkm)
            .or_else(|| {
                let faction_id = state.ships.get(&ship_id)?.faction_id;
                state.factions.get(&faction_id)?.ship_contacts.get(&target_id).map(|c| c.last_known_position_mkm)
            });
        let Some(target_pos) = target_pos else { continue };
        crate::order_exec::move_ship_toward_for_combat(state, content, ship_id, target_pos, hours);
    }
}
